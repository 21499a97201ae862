use serde::{Deserialize, Serialize};
use std::fmt;

/// How a source set is written into a destination.
///
/// `Merge` only adds or updates same-name entries. `Override` clears the
/// destination's whole server set first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    #[default]
    Merge,
    Override,
}

impl SyncMode {
    /// Maps the UI's "override all" checkbox onto a mode.
    pub fn from_override_flag(override_all: bool) -> Self {
        if override_all {
            SyncMode::Override
        } else {
            SyncMode::Merge
        }
    }

    pub fn is_override(self) -> bool {
        self == SyncMode::Override
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Merge => write!(f, "merge"),
            SyncMode::Override => write!(f, "override"),
        }
    }
}
