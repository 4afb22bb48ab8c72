use std::cell::Cell;
use std::fmt;

/// Which card the overlay displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CardState {
    #[default]
    Processing,
    Result,
    Error,
}

/// Correlates one translate call with the controller state it was issued against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Mints strictly increasing tokens and remembers the latest one.
#[derive(Debug, Default)]
pub(crate) struct TokenSource {
    next: Cell<u64>,
    latest: Cell<Option<RequestToken>>,
}

impl TokenSource {
    pub(crate) fn mint(&self) -> RequestToken {
        let value = self.next.get() + 1;
        self.next.set(value);
        let token = RequestToken(value);
        self.latest.set(Some(token));
        token
    }

    pub(crate) fn latest(&self) -> Option<RequestToken> {
        self.latest.get()
    }

    pub(crate) fn is_latest(&self, token: RequestToken) -> bool {
        self.latest.get() == Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_newest_token_is_latest() {
        let tokens = TokenSource::default();
        assert_eq!(tokens.latest(), None);

        let first = tokens.mint();
        let second = tokens.mint();

        assert_ne!(first, second);
        assert!(!tokens.is_latest(first));
        assert!(tokens.is_latest(second));
        assert_eq!(second.to_string(), "#2");
    }
}
