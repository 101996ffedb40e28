//! Bootstrap state machine.

use std::fmt;

/// Where the channel bootstrap stands.
///
/// `Ready` and `Failed` are final; there is no retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BootstrapState {
    #[default]
    Unstarted,
    Fetching,
    Verifying,
    Ready,
    Failed,
}

impl BootstrapState {
    pub fn is_terminal(self) -> bool {
        matches!(self, BootstrapState::Ready | BootstrapState::Failed)
    }
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BootstrapState::Unstarted => "UNSTARTED",
            BootstrapState::Fetching => "FETCHING",
            BootstrapState::Verifying => "VERIFYING",
            BootstrapState::Ready => "READY",
            BootstrapState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}
