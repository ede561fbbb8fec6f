use thiserror::Error;

/// Coarse classification of [`TickerError`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NetworkUnavailable,
    Transport,
    Cancelled,
    Parse,
    Configuration,
    Lifecycle,
    Io,
}

#[derive(Error, Debug)]
pub enum TickerError {
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{status} {reason}")]
    Status { status: u16, reason: String },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Id list parsing error: {0}")]
    IdList(String),

    #[error("Item parsing error: {0}")]
    ItemParse(#[from] serde_json::Error),

    #[error("No items returned")]
    NoItems,

    #[error("Refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Source index {index} out of range (max {max})")]
    SourceOutOfRange { index: usize, max: usize },

    #[error("Category {category} out of range (max {max})")]
    CategoryOutOfRange { category: usize, max: usize },

    #[error("Invalid refresh interval: {0}s")]
    InvalidInterval(u64),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Refresh already in progress")]
    AlreadyStarted,

    #[error("Refresh not started")]
    NotStarted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TickerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TickerError::NetworkUnavailable(_) => ErrorKind::NetworkUnavailable,
            TickerError::Http(_) | TickerError::Status { .. } | TickerError::RefreshFailed(_) => {
                ErrorKind::Transport
            }
            TickerError::Cancelled => ErrorKind::Cancelled,
            TickerError::FeedParse(_)
            | TickerError::IdList(_)
            | TickerError::ItemParse(_)
            | TickerError::NoItems => ErrorKind::Parse,
            TickerError::SourceOutOfRange { .. }
            | TickerError::CategoryOutOfRange { .. }
            | TickerError::InvalidInterval(_)
            | TickerError::InvalidUrl(_)
            | TickerError::Config(_) => ErrorKind::Configuration,
            TickerError::AlreadyStarted | TickerError::NotStarted => ErrorKind::Lifecycle,
            TickerError::Io(_) => ErrorKind::Io,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }
}

pub type Result<T> = std::result::Result<T, TickerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(TickerError::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(TickerError::NoItems.kind(), ErrorKind::Parse);
        assert_eq!(
            TickerError::SourceOutOfRange { index: 9, max: 3 }.kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            TickerError::Status {
                status: 503,
                reason: "Service Unavailable".into()
            }
            .kind(),
            ErrorKind::Transport
        );
        assert!(TickerError::Cancelled.is_cancelled());
        assert!(!TickerError::AlreadyStarted.is_cancelled());
    }

    #[test]
    fn test_status_message_carries_reason() {
        let err = TickerError::Status {
            status: 404,
            reason: "Not Found".into(),
        };
        assert_eq!(err.to_string(), "404 Not Found");
    }
}
