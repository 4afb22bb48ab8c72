use super::error::{StateError, StateResult};
use super::{event::StateTransition, PopupEvent, PopupState};

/// Created -> Showing -> Disposed, with Disposed reachable from either live state.
#[derive(Debug)]
pub struct StateMachine {
    state: PopupState,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: PopupState::default(),
        }
    }

    pub fn state(&self) -> PopupState {
        self.state
    }

    pub fn can_transition(&self, event: PopupEvent) -> bool {
        self.next_state(event).is_some()
    }

    pub fn next_state(&self, event: PopupEvent) -> Option<PopupState> {
        use PopupEvent::*;
        match (self.state, event) {
            (PopupState::Created, Show) => Some(PopupState::Showing),
            (PopupState::Created, Dispose) => Some(PopupState::Disposed),
            (PopupState::Showing, Dispose) => Some(PopupState::Disposed),
            _ => None,
        }
    }

    /// Applies `event` and returns the step taken.
    pub fn transition(&mut self, event: PopupEvent) -> StateResult<StateTransition> {
        tracing::debug!(from = ?self.state, event = ?event, "request popup transition");
        let next = self.next_state(event).ok_or_else(|| {
            let from = self.state;
            tracing::debug!(from = ?from, event = ?event, "popup transition rejected");
            StateError::InvalidStateTransition { from, event }
        })?;

        let step = StateTransition::new(Some(self.state), event, next);
        self.state = next;
        tracing::debug!(from = ?step.from, to = ?step.to, "popup transition applied");

        Ok(step)
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PopupState::{:?}", self.state)
    }
}
