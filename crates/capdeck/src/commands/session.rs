//! Session inspection handlers: modules, environment, caplets.

use serde::Serialize;
use tabled::Tabled;

use capdeck_core::{Caplet, Module, Session};

use crate::cli::{SessionArgs, SessionCommand};
use crate::config::Ctx;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct ModuleRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl ModuleRow {
    fn new(m: &Module, color: bool) -> Self {
        Self {
            name: m.name.clone(),
            state: output::paint_running(m.running, color),
            description: util::ellipsize(&m.description, 60),
        }
    }
}

#[derive(Serialize, Tabled)]
struct EnvVar {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct CapletRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Size")]
    size: u64,
    #[tabled(rename = "Lines")]
    lines: usize,
}

impl From<&Caplet> for CapletRow {
    fn from(c: &Caplet) -> Self {
        Self {
            name: c.name.clone(),
            path: c.path.clone(),
            size: c.size,
            lines: c.code.len(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Ctx, args: SessionArgs) -> Result<(), CliError> {
    let (_conn, session) = util::logged_in(ctx).await?;

    let out = match args.command {
        SessionCommand::Show => output::render_single(
            ctx.output,
            session.as_ref(),
            session_detail,
            |s| s.version.clone(),
        )?,

        SessionCommand::Modules { name: None } => {
            let modules: Vec<&Module> = session.modules.values().collect();
            output::render_list(
                ctx.output,
                &modules,
                |m| ModuleRow::new(m, ctx.color),
                |m| m.name.clone(),
            )?
        }

        SessionCommand::Modules { name: Some(name) } => {
            let module = session.module(&name).ok_or_else(|| CliError::NotFound {
                name: name.clone(),
                list_command: "modules",
            })?;
            output::render_single(
                ctx.output,
                module,
                |m| module_detail(m, ctx.color),
                |m| m.name.clone(),
            )?
        }

        SessionCommand::Env { name: None } => {
            let vars: Vec<EnvVar> = session
                .env
                .data
                .iter()
                .map(|(name, value)| EnvVar {
                    name: name.clone(),
                    value: value.clone(),
                })
                .collect();
            output::render_list(
                ctx.output,
                &vars,
                |v| EnvVar {
                    name: v.name.clone(),
                    value: util::ellipsize(&v.value, 80),
                },
                |v| format!("{}={}", v.name, v.value),
            )?
        }

        SessionCommand::Env { name: Some(name) } => {
            if !session.env.data.contains_key(&name) {
                return Err(CliError::NotFound {
                    name,
                    list_command: "env",
                });
            }
            let value = session.env(&name).to_string();
            output::render_single(ctx.output, &value, Clone::clone, Clone::clone)?
        }

        SessionCommand::Caplets { name: None } => output::render_list(
            ctx.output,
            &session.caplets,
            |c| CapletRow::from(c),
            |c| c.name.clone(),
        )?,

        SessionCommand::Caplets { name: Some(name) } => {
            let caplet = session.caplet(&name).ok_or_else(|| CliError::NotFound {
                name: name.clone(),
                list_command: "caplets",
            })?;
            output::render_single(
                ctx.output,
                caplet,
                |c| c.code.join("\n"),
                |c| c.code.join("\n"),
            )?
        }
    };

    output::print_output(&out, ctx.quiet);
    Ok(())
}

fn session_detail(s: &Session) -> String {
    let running = s.modules.values().filter(|m| m.running).count();
    output::detail_lines(&[
        ("Version", s.version.clone()),
        ("Modules", format!("{} ({running} running)", s.modules.len())),
        ("Env", s.env.data.len().to_string()),
        ("Caplets", s.caplets.len().to_string()),
        ("Other fields", s.extra.keys().cloned().collect::<Vec<_>>().join(", ")),
    ])
}

fn module_detail(m: &Module, color: bool) -> String {
    let mut pairs = vec![
        ("Name", m.name.clone()),
        ("State", output::paint_running(m.running, color)),
        ("Author", m.author.clone()),
        ("Description", m.description.clone()),
    ];
    if let Some(params) = m.extra.get("parameters").and_then(|p| p.as_object()) {
        pairs.push((
            "Parameters",
            params.keys().cloned().collect::<Vec<_>>().join(", "),
        ));
    }
    output::detail_lines(&pairs)
}
