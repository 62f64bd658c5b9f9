//! Event log handlers.

use tabled::Tabled;

use capdeck_core::{Event, PartialSettings};

use crate::cli::{EventsArgs, EventsCommand};
use crate::config::Ctx;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub(super) struct EventRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Tag")]
    pub(super) tag: String,
    #[tabled(rename = "Data")]
    pub(super) data: String,
}

impl EventRow {
    pub(super) fn new(e: &Event, color: bool) -> Self {
        Self {
            time: e.time.format("%Y-%m-%d %H:%M:%S").to_string(),
            tag: output::paint_tag(&e.tag, color),
            data: util::ellipsize(&summary(e), 80),
        }
    }
}

/// One-line rendering of an event's payload.
pub(super) fn summary(e: &Event) -> String {
    match e.data {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(ref s) => s.clone(),
        ref other => other.to_string(),
    }
}

/// Events whose tag starts with `prefix`, all of them without one.
pub(super) fn filter_by_tag<'a>(events: &'a [Event], prefix: Option<&str>) -> Vec<&'a Event> {
    events
        .iter()
        .filter(|e| prefix.is_none_or(|p| e.tag.starts_with(p)))
        .collect()
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Ctx, args: EventsArgs) -> Result<(), CliError> {
    let conn = util::restored(ctx)?;

    match args.command {
        EventsCommand::List { limit, tag } => {
            if limit.is_some() {
                conn.apply_settings(&PartialSettings {
                    events: limit,
                    ..PartialSettings::default()
                });
            }
            let events = conn.fetch_events().await?;
            let shown = filter_by_tag(&events, tag.as_deref());
            let out = output::render_list(
                ctx.output,
                &shown,
                |e| EventRow::new(e, ctx.color),
                |e| format!("{} {}", e.time.to_rfc3339(), e.tag),
            )?;
            output::print_output(&out, ctx.quiet);
            Ok(())
        }

        EventsCommand::Clear => {
            conn.clear_events().await?;
            if !ctx.quiet {
                eprintln!("Event log cleared");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn events() -> Vec<Event> {
        serde_json::from_value(json!([
            { "tag": "wifi.ap.new", "time": "2024-05-01T10:00:00Z", "data": { "mac": "aa" } },
            { "tag": "sys.log", "time": "2024-05-01T10:00:01Z", "data": "started" },
            { "tag": "wifi.client.probe", "time": "2024-05-01T10:00:02Z" }
        ]))
        .unwrap()
    }

    #[test]
    fn tag_prefix_filters() {
        let all = events();
        assert_eq!(filter_by_tag(&all, None).len(), 3);
        let wifi = filter_by_tag(&all, Some("wifi."));
        assert_eq!(wifi.len(), 2);
        assert!(wifi.iter().all(|e| e.tag.starts_with("wifi.")));
    }

    #[test]
    fn summary_unquotes_strings_and_skips_null() {
        let all = events();
        assert_eq!(summary(&all[0]), r#"{"mac":"aa"}"#);
        assert_eq!(summary(&all[1]), "started");
        assert_eq!(summary(&all[2]), "");
    }
}
