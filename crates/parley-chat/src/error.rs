use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// Self-messaging, a payload that does not match its type, or an unknown user/emoji.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The conversation or message does not exist or the caller is not a
    /// participant. The two cases are deliberately indistinguishable.
    #[error("Conversation not found or access denied")]
    NotFoundOrForbidden,

    #[error("Daily limit of {limit} messages reached; follow each other to chat freely")]
    RateLimited { limit: u32 },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ChatError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ChatError::InvalidArgument(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
