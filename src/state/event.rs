use super::model::PopupState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupEvent {
    Show,
    Dispose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: Option<PopupState>,
    pub event: PopupEvent,
    pub to: PopupState,
}

impl StateTransition {
    pub const fn new(from: Option<PopupState>, event: PopupEvent, to: PopupState) -> Self {
        Self { from, event, to }
    }
}
