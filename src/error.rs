use thiserror::Error;

/// Failures on the path from a submitted draft to an assistant reply
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("rate limit exceeded")]
    RateLimited,

    #[error("request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no content returned from API")]
    NoCandidates,

    #[error("request task ended without a reply")]
    Interrupted,

    #[error("no API key configured (set `api_key` in the config file or ${0})")]
    MissingApiKey(String),
}
