use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static FORM_REF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<plugin>[^|]+?)\s*\|\s*(?:0[xX])?(?P<id>[0-9A-Fa-f]{1,8})\s*$")
        .expect("Invalid form reference regex")
});

/// Errors raised while building or editing the data model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid form reference: {0}")]
    InvalidFormRef(String),

    #[error("Category {0} not found")]
    UnknownCategory(String),

    #[error("Stance index {0} out of range")]
    StanceOutOfRange(usize),

    #[error("Rule {0} already declared")]
    DuplicateRule(String),

    #[error("Rule index {0} out of range")]
    UnknownRule(usize),
}

/// A plugin-qualified form reference, e.g. `Skyrim.esm|0x00013BBF`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FormRef {
    pub plugin: String,
    pub local_id: u32,
}

impl FormRef {
    pub fn new(plugin: impl Into<String>, local_id: u32) -> Self {
        Self {
            plugin: plugin.into(),
            local_id,
        }
    }

    /// Base form of the player character
    pub fn player_base() -> Self {
        Self::new("Skyrim.esm", 0x7)
    }

    pub fn is_player_base(&self) -> bool {
        *self == Self::player_base()
    }
}

impl FromStr for FormRef {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = FORM_REF_PATTERN
            .captures(s)
            .ok_or_else(|| ModelError::InvalidFormRef(s.to_string()))?;

        let local_id = u32::from_str_radix(&caps["id"], 16)
            .map_err(|_| ModelError::InvalidFormRef(s.to_string()))?;

        Ok(Self::new(&caps["plugin"], local_id))
    }
}

impl TryFrom<String> for FormRef {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FormRef> for String {
    fn from(value: FormRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for FormRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|0x{:08X}", self.plugin, self.local_id)
    }
}
