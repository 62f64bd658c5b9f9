// ── Agent version comparison ──
//
// Semver-style ordering that tolerates the loose version strings agents
// actually report: a leading `v`, fewer than three components
// (`2.31` == `2.31.0`), and build metadata.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    core: Vec<u64>,
    pre: Vec<PreRelease>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum PreRelease {
    // Declared first: numeric identifiers sort below alphanumeric ones.
    Numeric(u64),
    Alpha(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseVersionError(String);

impl fmt::Display for ParseVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid version string '{}'", self.0)
    }
}

impl std::error::Error for ParseVersionError {}

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let err = || ParseVersionError(raw.to_owned());

        let s = raw.trim();
        let s = s.strip_prefix(['v', 'V']).unwrap_or(s);
        let s = s.split_once('+').map_or(s, |(v, _build)| v);
        let (core, pre) = match s.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (s, None),
        };

        let core = core
            .split('.')
            .map(|part| part.parse::<u64>().map_err(|_| err()))
            .collect::<Result<Vec<_>, _>>()?;
        if core.is_empty() || core.len() > 4 {
            return Err(err());
        }

        let pre = match pre {
            None => Vec::new(),
            Some("") => return Err(err()),
            Some(pre) => pre
                .split('.')
                .map(|id| {
                    if id.is_empty() {
                        Err(err())
                    } else if let Ok(n) = id.parse::<u64>() {
                        Ok(PreRelease::Numeric(n))
                    } else {
                        Ok(PreRelease::Alpha(id.to_owned()))
                    }
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(Self { core, pre })
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let width = self.core.len().max(other.core.len());
        for i in 0..width {
            let a = self.core.get(i).copied().unwrap_or(0);
            let b = other.core.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }

        // A release outranks any of its pre-releases.
        match (self.pre.is_empty(), other.pre.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.pre.cmp(&other.pre),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare two version strings.
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering, ParseVersionError> {
    Ok(a.parse::<Version>()?.cmp(&b.parse::<Version>()?))
}
