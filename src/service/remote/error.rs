use snafu::Snafu;

use crate::error::ErrorKind;

pub type Result<T, E = RemoteError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RemoteError {
    #[snafu(display("`{endpoint}` rejected the bearer token"))]
    AuthRequired { endpoint: String },

    #[snafu(display("failed to reach `{endpoint}`: {source}"))]
    Transport {
        endpoint: String,
        source: reqwest::Error,
    },

    #[snafu(display("`{endpoint}` responded with status {status}"))]
    Status { endpoint: String, status: u16 },

    #[snafu(display("malformed response from `{endpoint}`: {source}"))]
    Decode {
        endpoint: String,
        source: reqwest::Error,
    },

    #[snafu(display("`{endpoint}` reported a failure: {message}"))]
    Rejected { endpoint: String, message: String },

    #[snafu(display("cannot build the url for `{path}`: {source}"))]
    Endpoint {
        path: String,
        source: url::ParseError,
    },
}

impl RemoteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthRequired { .. } => ErrorKind::AuthRequired,
            _ => ErrorKind::NetworkFailure,
        }
    }
}
