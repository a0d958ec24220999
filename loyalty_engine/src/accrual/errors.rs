use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AccrualClientError {
    #[error("Could not initialise the accrual client. {0}")]
    Initialization(String),
    #[error("Could not reach the accrual service. {0}")]
    Transport(String),
}

impl From<reqwest::Error> for AccrualClientError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
