use std::fmt;

use serde::{Deserialize, Serialize};

/// Per-recipe lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstallStatus {
    Available,
    Recommended,
    Installing,
    Installed,
    Failed,
    Skipped,
    Canceled,
}

impl InstallStatus {
    /// Terminal states never transition again within a run.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Installed | Self::Failed | Self::Skipped | Self::Canceled
        )
    }

    fn rank(self) -> u8 {
        match self {
            Self::Available => 0,
            Self::Recommended => 1,
            Self::Installing => 2,
            Self::Installed | Self::Failed | Self::Skipped | Self::Canceled => 3,
        }
    }

    /// Whether moving from `self` to `next` is a forward transition.
    pub fn can_transition_to(self, next: InstallStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Recommended => "RECOMMENDED",
            Self::Installing => "INSTALLING",
            Self::Installed => "INSTALLED",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
            Self::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for InstallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
