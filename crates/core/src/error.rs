use thiserror::Error;

pub type DispatchResult<T> = Result<T, DispatchError>;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Campaign not found")]
    NotFound,

    #[error("Campaign has already been sent")]
    InvalidState,

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Campaign has no target contacts")]
    NoRecipients,

    #[error("No eligible recipients after filtering")]
    NoEligibleRecipients,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl DispatchError {
    /// True for precondition failures that abort before any state mutation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NotFound
                | Self::InvalidState
                | Self::InvalidTemplate(_)
                | Self::NoRecipients
                | Self::NoEligibleRecipients
                | Self::Config(_)
        )
    }
}
