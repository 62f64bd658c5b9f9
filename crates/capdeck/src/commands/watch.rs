//! `watch`: run both pollers and print what changes until Ctrl-C.

use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset};
use tracing::debug;

use capdeck_core::{Event, Session};

use crate::cli::{OutputFormat, WatchArgs};
use crate::config::Ctx;
use crate::error::CliError;

use super::{events, util};

/// Printing state carried across notifications.
#[derive(Default)]
struct Watcher {
    running: Option<BTreeSet<String>>,
    last_event: Option<DateTime<FixedOffset>>,
    last_error: Option<String>,
}

impl Watcher {
    /// Lines for a new session: a summary on the first one (or every one
    /// when asked), then module state changes.
    fn session_lines(&mut self, session: &Session, every: bool) -> Vec<String> {
        let now: BTreeSet<String> = session
            .modules
            .values()
            .filter(|m| m.running)
            .map(|m| m.name.clone())
            .collect();

        let mut lines = Vec::new();
        if self.running.is_none() || every {
            lines.push(format!(
                "session: agent v{}, {} modules, {} running",
                session.version,
                session.modules.len(),
                now.len()
            ));
        }
        if let Some(ref before) = self.running {
            lines.extend(now.difference(before).map(|m| format!("module {m} started")));
            lines.extend(before.difference(&now).map(|m| format!("module {m} stopped")));
        }

        self.running = Some(now);
        self.last_error = None;
        lines
    }

    /// Events newer than the last one printed, oldest first.
    fn fresh_events<'a>(&mut self, batch: &'a [Event]) -> Vec<&'a Event> {
        let mut fresh: Vec<&Event> = batch
            .iter()
            .filter(|e| self.last_event.is_none_or(|t| e.time > t))
            .collect();
        fresh.sort_by_key(|e| e.time);
        if let Some(newest) = fresh.last() {
            self.last_event = Some(newest.time);
        }
        fresh
    }

    /// `true` when this error differs from the last one reported.
    fn is_new_error(&mut self, message: &str) -> bool {
        if self.last_error.as_deref() == Some(message) {
            return false;
        }
        self.last_error = Some(message.to_string());
        true
    }
}

fn event_line(e: &Event, format: OutputFormat, color: bool) -> Result<String, CliError> {
    match format {
        OutputFormat::Json | OutputFormat::JsonCompact => Ok(serde_json::to_string(e)?),
        _ => {
            let row = events::EventRow::new(e, color);
            Ok(format!("{} {}  {}", e.time.format("%H:%M:%S"), row.tag, row.data))
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Ctx, args: WatchArgs) -> Result<(), CliError> {
    let conn = util::restored(ctx)?;

    // Subscribe before starting so the first cycle is not missed
    let mut logged_out = conn.on_logged_out();
    let mut sessions = conn.on_new_session();
    let mut batches = conn.on_new_events();
    let mut errors = conn.on_session_error();

    if !args.no_events {
        conn.start_event_poller();
    }
    conn.start_session_poller();
    if !ctx.quiet {
        eprintln!("Watching {} (Ctrl-C to stop)", conn.endpoint().base());
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut watcher = Watcher::default();
    let result = loop {
        tokio::select! {
            biased;

            _ = &mut ctrl_c => {
                debug!("interrupted");
                break Ok(());
            }

            reason = logged_out.recv() => match reason {
                Some(Some(err)) => break Err(CliError::from(err)),
                Some(None) | None => break Ok(()),
            },

            Some(err) = errors.recv() => {
                let message = err.to_string();
                if watcher.is_new_error(&message) {
                    eprintln!("agent unreachable: {message}");
                }
            }

            Some(session) = sessions.recv() => {
                for line in watcher.session_lines(&session, args.every_session) {
                    println!("{line}");
                }
            }

            Some(batch) = batches.recv() => {
                print_events(&mut watcher, &batch, ctx)?;
            }
        }
    };

    conn.stop().await;
    result
}

fn print_events(watcher: &mut Watcher, batch: &[Event], ctx: &Ctx) -> Result<(), CliError> {
    for e in watcher.fresh_events(batch) {
        println!("{}", event_line(e, ctx.output, ctx.color)?);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session(running: &[&str]) -> Session {
        let modules: Vec<_> = ["net.recon", "wifi", "events.stream"]
            .iter()
            .map(|name| json!({ "name": name, "running": running.contains(name) }))
            .collect();
        serde_json::from_value(json!({ "version": "2.32.0", "modules": modules })).unwrap()
    }

    fn event(tag: &str, time: &str) -> Event {
        serde_json::from_value(json!({ "tag": tag, "time": time })).unwrap()
    }

    #[test]
    fn first_session_prints_summary_then_only_changes() {
        let mut w = Watcher::default();
        let first = w.session_lines(&session(&["events.stream"]), false);
        assert_eq!(first, ["session: agent v2.32.0, 3 modules, 1 running"]);

        let same = w.session_lines(&session(&["events.stream"]), false);
        assert!(same.is_empty());

        let changed = w.session_lines(&session(&["net.recon"]), false);
        assert_eq!(
            changed,
            ["module net.recon started", "module events.stream stopped"]
        );
    }

    #[test]
    fn events_are_printed_once_in_time_order() {
        let mut w = Watcher::default();
        let batch = vec![
            event("b", "2024-05-01T10:00:02Z"),
            event("a", "2024-05-01T10:00:01Z"),
        ];
        let tags: Vec<_> = w.fresh_events(&batch).iter().map(|e| e.tag.clone()).collect();
        assert_eq!(tags, ["a", "b"]);

        let mut next = batch.clone();
        next.push(event("c", "2024-05-01T10:00:03Z"));
        let tags: Vec<_> = w.fresh_events(&next).iter().map(|e| e.tag.clone()).collect();
        assert_eq!(tags, ["c"]);
    }

    #[test]
    fn repeated_errors_are_reported_once() {
        let mut w = Watcher::default();
        assert!(w.is_new_error("refused"));
        assert!(!w.is_new_error("refused"));
        w.session_lines(&session(&[]), false);
        assert!(w.is_new_error("refused"));
    }
}
