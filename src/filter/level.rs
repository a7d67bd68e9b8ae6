use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How much of the merged tree a view shows.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum FilterLevel {
    /// Every node, inherited or not.
    #[default]
    All,
    /// Structure and documentation nodes plus every override; inherited
    /// variables are hidden.
    Overrides,
    /// Only what the open document defines itself.
    Local,
}

impl FilterLevel {
    pub fn shows_everything(self) -> bool {
        self == FilterLevel::All
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterLevel::All => "all",
            FilterLevel::Overrides => "overrides",
            FilterLevel::Local => "local",
        }
    }
}

impl fmt::Display for FilterLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(FilterLevel::All),
            "overrides" => Ok(FilterLevel::Overrides),
            "local" => Ok(FilterLevel::Local),
            other => Err(format!("unknown filter level: {}", other)),
        }
    }
}
