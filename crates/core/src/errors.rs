use thiserror::Error;

/// Login failed; fatal to the whole session.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthenticationError {
    #[error("login rejected by service with status {status}")]
    Rejected { status: u16 },
    #[error("login response did not carry a ticket")]
    MissingTicket,
    #[error("transport failure during login: {0}")]
    Transport(String),
}

/// Precondition violations raised to the caller. Business-rule rejections and
/// retry exhaustion are never represented here; they travel inside a failed
/// `NegotiationResult`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session not started; call start() before issuing requests")]
    NotStarted,
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),
    #[error("malformed proposal: {0}")]
    MalformedProposal(String),
    #[error("internal failure: {0}")]
    Internal(String),
}
