use thiserror::Error;

/// Everything that stops a send with a nonzero exit code.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Error: {path} file not found.")]
    ConfigNotFound { path: String },

    #[error("Error: can't read {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Error: can't parse {path}: {detail}")]
    ConfigSyntax { path: String, detail: String },

    #[error("Error: section [{section}] not found in {path}")]
    ConfigSection { path: String, section: String },

    #[error("Error: Can't find valid Authorization in {path}")]
    MissingAuthorization { path: String },

    #[error("Error: can't read {path}: {source}")]
    MessageRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Error: can't parse {path}: {source}")]
    MessageParse {
        path: String,
        #[source]
        source: mailparse::MailParseError,
    },

    #[error("Error: no usable address in forced recipient {0:?}")]
    ForcedRecipient(String),

    #[error("Error: can't create HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Error: can't encode transmission: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Message rejected by SparkPost\n{0}")]
    Rejected(String),
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ConfigNotFound { .. }
            | Error::ConfigRead { .. }
            | Error::ConfigSyntax { .. }
            | Error::ConfigSection { .. }
            | Error::MissingAuthorization { .. }
            | Error::MessageRead { .. }
            | Error::MessageParse { .. }
            | Error::ForcedRecipient(_)
            | Error::Client(_)
            | Error::Encode(_)
            | Error::Rejected(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
