use super::event::PopupEvent;
use super::model::PopupState;
use thiserror::Error;

pub type StateResult<T> = std::result::Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid popup transition: from {from:?} using event {event:?}")]
    InvalidStateTransition { from: PopupState, event: PopupEvent },
}
