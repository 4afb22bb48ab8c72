#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopupState {
    #[default]
    Created,
    Showing,
    Disposed,
}

impl PopupState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Disposed)
    }
}
