/// Failure of a single responder round-trip. The event that triggered it is dropped.
#[derive(Debug, thiserror::Error)]
pub enum ResponderError {
    #[error("responder request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("responder request timed out")]
    Timeout,

    #[error("responder returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

impl From<reqwest::Error> for ResponderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ResponderError::Timeout
        } else {
            ResponderError::Request(err)
        }
    }
}

/// Startup failures of the session lifecycle. All of them end the process.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("device store error: {0:#}")]
    Store(anyhow::Error),

    #[error("connect failed: {0:#}")]
    Connect(anyhow::Error),

    #[error("pairing stream closed before the device was paired")]
    PairingAborted,

    #[error("interrupted before the session was established")]
    Interrupted,
}
