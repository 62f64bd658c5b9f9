// ── Compatibility gate ──
//
// Decides whether a freshly fetched session may become visible. Pure:
// the connection applies the consequences (logout, cache, notifications).

use std::cmp::Ordering;

use capdeck_api::Session;

use crate::version::compare_versions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Session is compatible.
    Accept,
    /// Session is older than required but accepted because the gate is
    /// not running in production mode.
    AcceptOutdated { required: String, found: String },
    /// Session must not reach consumers.
    Reject { required: String, found: String },
}

impl GateDecision {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Reject { .. })
    }
}

#[derive(Debug, Clone)]
pub struct CompatibilityGate {
    required: String,
    production: bool,
}

impl CompatibilityGate {
    pub fn new(required: impl Into<String>, production: bool) -> Self {
        Self {
            required: required.into(),
            production,
        }
    }

    pub fn required(&self) -> &str {
        &self.required
    }

    pub fn is_production(&self) -> bool {
        self.production
    }

    /// An unparseable agent version counts as outdated: compatibility can
    /// not be shown, so production refuses it.
    pub fn check(&self, session: &Session) -> GateDecision {
        let outdated = !matches!(
            compare_versions(&session.version, &self.required),
            Ok(Ordering::Greater | Ordering::Equal)
        );

        if !outdated {
            return GateDecision::Accept;
        }

        let required = self.required.clone();
        let found = session.version.clone();
        if self.production {
            GateDecision::Reject { required, found }
        } else {
            GateDecision::AcceptOutdated { required, found }
        }
    }
}
