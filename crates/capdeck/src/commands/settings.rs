//! Saved connection settings: show, set, path.

use serde::Serialize;

use capdeck_core::{ConnectionSettings, PartialSettings};

use crate::cli::{SettingKey, SettingsArgs, SettingsCommand};
use crate::config::Ctx;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct SettingsView<'a> {
    url: String,
    #[serde(flatten)]
    settings: &'a ConnectionSettings,
}

pub fn handle(ctx: &Ctx, args: SettingsArgs) -> Result<(), CliError> {
    match args.command {
        SettingsCommand::Show => {
            let conn = ctx.connect()?;
            let settings = conn.settings();
            let view = SettingsView {
                url: settings.url(),
                settings: &settings,
            };
            let out = output::render_single(
                ctx.output,
                &view,
                |v| {
                    output::detail_lines(&[
                        ("url", v.url.clone()),
                        ("schema", v.settings.schema.clone()),
                        ("host", v.settings.host.clone()),
                        ("port", v.settings.port.to_string()),
                        ("path", v.settings.path.clone()),
                        ("interval", format!("{} ms", v.settings.interval_ms)),
                        ("events", v.settings.event_page_size.to_string()),
                    ])
                },
                |v| v.url.clone(),
            )?;
            output::print_output(&out, ctx.quiet);
            Ok(())
        }

        SettingsCommand::Set { key, value } => {
            let partial = parse_setting(key, &value)?;
            let conn = ctx.connect()?;
            let settings = conn.update_settings(&partial);
            if !ctx.quiet {
                eprintln!("Saved. Agent URL is now {}", settings.url());
            }
            Ok(())
        }

        SettingsCommand::Path => {
            output::print_output(&ctx.dir.display().to_string(), ctx.quiet);
            Ok(())
        }
    }
}

/// Turn `key value` into a one-field settings patch.
fn parse_setting(key: SettingKey, value: &str) -> Result<PartialSettings, CliError> {
    let value = value.trim();
    let field = format!("{key:?}").to_lowercase();
    if value.is_empty() {
        return Err(CliError::Validation {
            field,
            reason: "must not be empty".into(),
        });
    }
    let invalid = |reason: String| CliError::Validation {
        field: field.clone(),
        reason,
    };

    let mut partial = PartialSettings::default();
    match key {
        SettingKey::Schema => {
            let schema = value.trim_end_matches("//");
            partial.schema = Some(if schema.ends_with(':') {
                schema.to_string()
            } else {
                format!("{schema}:")
            });
        }
        SettingKey::Host => partial.host = Some(value.to_string()),
        SettingKey::Path => {
            partial.path = Some(if value.starts_with('/') {
                value.to_string()
            } else {
                format!("/{value}")
            });
        }
        SettingKey::Port => {
            let port: u16 = value
                .parse()
                .map_err(|e| invalid(format!("'{value}': {e}")))?;
            if port == 0 {
                return Err(invalid("port 0 is not usable".into()));
            }
            partial.port = Some(port);
        }
        SettingKey::Interval => {
            let ms: u64 = value
                .parse()
                .map_err(|e| invalid(format!("'{value}': {e}")))?;
            if ms == 0 {
                return Err(invalid("interval must be positive".into()));
            }
            partial.interval = Some(ms);
        }
        SettingKey::Events => {
            let n: u32 = value
                .parse()
                .map_err(|e| invalid(format!("'{value}': {e}")))?;
            if n == 0 {
                return Err(invalid("event count must be positive".into()));
            }
            partial.events = Some(n);
        }
    }
    Ok(partial)
}
