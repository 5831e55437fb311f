//! Supervisor lifecycle state
//!
//! The supervisor only ever moves forward through these states; a run ends
//! in `Terminated` exactly once.

use std::fmt;

/// Lifecycle state of a single supervised run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupervisorState {
    /// Constructed, child not spawned yet
    #[default]
    NotStarted,

    /// Child spawned, output being consumed
    Running,

    /// Child closed its output streams
    StreamEnded,

    /// A stop was requested or reading the output failed
    Cancelled,

    /// Child reaped with the given exit value
    Terminated(i32),
}

impl SupervisorState {
    fn rank(&self) -> u8 {
        match self {
            SupervisorState::NotStarted => 0,
            SupervisorState::Running => 1,
            SupervisorState::StreamEnded | SupervisorState::Cancelled => 2,
            SupervisorState::Terminated(_) => 3,
        }
    }

    /// Whether moving to `next` goes strictly forward
    pub fn can_advance_to(&self, next: &SupervisorState) -> bool {
        next.rank() > self.rank()
    }

    /// Move to `next`, refusing backwards or repeated transitions
    ///
    /// Returns `false` and leaves the state untouched if the transition is
    /// not allowed.
    pub fn advance(&mut self, next: SupervisorState) -> bool {
        if !self.can_advance_to(&next) {
            return false;
        }
        *self = next;
        true
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, SupervisorState::Terminated(_))
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorState::NotStarted => write!(f, "not started"),
            SupervisorState::Running => write!(f, "running"),
            SupervisorState::StreamEnded => write!(f, "stream ended"),
            SupervisorState::Cancelled => write!(f, "cancelled"),
            SupervisorState::Terminated(code) => write!(f, "terminated ({})", code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        let mut state = SupervisorState::default();
        assert_eq!(state, SupervisorState::NotStarted);

        assert!(state.advance(SupervisorState::Running));
        assert!(state.advance(SupervisorState::StreamEnded));
        assert!(state.advance(SupervisorState::Terminated(0)));
        assert!(state.is_terminated());
    }

    #[test]
    fn test_no_state_is_revisited() {
        let mut state = SupervisorState::Running;
        assert!(!state.advance(SupervisorState::Running));
        assert!(!state.advance(SupervisorState::NotStarted));

        assert!(state.advance(SupervisorState::Cancelled));
        assert!(!state.advance(SupervisorState::StreamEnded));

        assert!(state.advance(SupervisorState::Terminated(143)));
        assert!(!state.advance(SupervisorState::Terminated(0)));
        assert_eq!(state, SupervisorState::Terminated(143));
    }

    #[test]
    fn test_display() {
        assert_eq!(SupervisorState::NotStarted.to_string(), "not started");
        assert_eq!(SupervisorState::StreamEnded.to_string(), "stream ended");
        assert_eq!(SupervisorState::Terminated(1).to_string(), "terminated (1)");
    }
}
