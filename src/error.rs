pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No token could be resolved from the settings or the environment.
    #[error(
        "no GitHub token configured: set `token` in the settings file \
        or the GIST_TOKEN environment variable"
    )]
    MissingCredentials,

    /// The request was rejected before anything was sent.
    #[error("{0}")]
    Validation(String),

    /// The API answered with a status outside of 2xx.
    #[error("github returned {code}: {}", http_message(.code, .body))]
    Http { code: u16, body: String },

    /// Connection, TLS, DNS or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("cannot decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A 204 where a JSON document was required.
    #[error("expected a response body but the server sent none")]
    EmptyResponse,

    #[error("invalid settings: {0}")]
    Settings(String),
}

impl Error {
    pub(crate) fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    /// The status code of an [`Error::Http`]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The human readable part of an [`Error::Http`].
    ///
    /// GitHub puts a `message` field in most error bodies. When the body isn't
    /// JSON, or has no message, this falls back to the status' reason phrase.
    pub fn http_message(&self) -> Option<String> {
        match self {
            Self::Http { code, body } => Some(http_message(code, body)),
            _ => None,
        }
    }

    /// Whether the user can fix this by editing their configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingCredentials | Self::Settings(..))
    }
}

fn http_message(code: &u16, body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct Body {
        message: String,
    }

    if let Ok(Body { message }) = serde_json::from_str(body) {
        return message;
    }

    reqwest::StatusCode::from_u16(*code)
        .ok()
        .and_then(|status| status.canonical_reason())
        .map(ToString::to_string)
        .unwrap_or_else(|| code.to_string())
}
