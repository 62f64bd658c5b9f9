// Agent API wire types
//
// The session object is large and its shape drifts between agent
// releases, so only the fields the client reasons about are typed.
// Everything else is kept verbatim in `extra` maps and survives a
// serialize round trip untouched.

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Full agent state as returned by `GET /session`.
///
/// Immutable once fetched: a newer fetch replaces the whole value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Agent API version, semver-like (`2.32.0`, `v2.31`, ...).
    pub version: String,

    /// Modules keyed by name. The wire format is an array; it is indexed
    /// on decode so lookups do not scan.
    #[serde(default, with = "modules_by_name")]
    pub modules: IndexMap<String, Module>,

    #[serde(default)]
    pub env: Environment,

    #[serde(default)]
    pub caplets: Vec<Caplet>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Session {
    /// Look up a module by name.
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    /// Value of an agent environment variable, `""` when unset.
    pub fn env(&self, name: &str) -> &str {
        self.env.data.get(name).map_or("", String::as_str)
    }

    /// Look up a caplet by name.
    pub fn caplet(&self, name: &str) -> Option<&Caplet> {
        self.caplets.iter().find(|c| c.name == name)
    }

    /// A session is usable once the agent reports at least one module.
    pub fn has_modules(&self) -> bool {
        !self.modules.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub running: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub data: IndexMap<String, String>,
}

/// A script stored on the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caplet {
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub code: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of the agent's event log (`GET /events`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub tag: String,
    pub time: DateTime<FixedOffset>,
    #[serde(default)]
    pub data: Value,
}

/// Body of `POST /session`.
#[derive(Debug, Clone, Serialize)]
pub struct CommandRequest<'a> {
    pub cmd: &'a str,
}

/// Successful answer to `POST /session`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub msg: String,
}

mod modules_by_name {
    use indexmap::IndexMap;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Module;

    pub fn serialize<S: Serializer>(
        modules: &IndexMap<String, Module>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(modules.values())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<IndexMap<String, Module>, D::Error> {
        let list = Vec::<Module>::deserialize(deserializer)?;
        Ok(list.into_iter().map(|m| (m.name.clone(), m)).collect())
    }
}
