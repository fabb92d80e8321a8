use std::fmt;

/// Controller lifecycle. Watching is the steady state; Confirmed, Failed and
/// Aborted never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Watching,
    Submitting,
    AwaitingConfirmation,
    Confirmed,
    Failed,
    Aborted,
}

impl ControllerState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ControllerState::Confirmed | ControllerState::Failed | ControllerState::Aborted
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ControllerState::Idle => "idle",
            ControllerState::Watching => "watching",
            ControllerState::Submitting => "submitting",
            ControllerState::AwaitingConfirmation => "awaiting_confirmation",
            ControllerState::Confirmed => "confirmed",
            ControllerState::Failed => "failed",
            ControllerState::Aborted => "aborted",
        }
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
