use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CallControlError {
    /// No credentials were configured
    #[error("Call control is not configured")]
    NotConfigured,

    #[error("Invalid call id: {0}")]
    InvalidCallId(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Provider error ({status}): {message}")]
    ProviderError { status: u16, message: String },
}

#[async_trait]
pub trait CallControl: Send + Sync {
    /// Speak `announcement` to the caller and end the call.
    async fn escalate(&self, call_id: &str, announcement: &str) -> Result<(), CallControlError>;
}

/// Used when telephony credentials are absent. Every command fails with
/// [`CallControlError::NotConfigured`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCallControl;

#[async_trait]
impl CallControl for DisabledCallControl {
    async fn escalate(&self, _call_id: &str, _announcement: &str) -> Result<(), CallControlError> {
        Err(CallControlError::NotConfigured)
    }
}
