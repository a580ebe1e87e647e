use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tokio::time::Duration;

#[derive(Error, Debug)]
pub enum StdError {
    #[error("Kube Error: {0}")]
    KubeError(#[source] kube::Error),

    #[error("ManifestParse: {0}")]
    ManifestParse(#[source] serde_yaml::Error),

    #[error("ManifestRead: {}: {source}", path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("InvalidTemplate: {0}")]
    InvalidTemplate(String),

    #[error("MetadataMissing: {0}")]
    MetadataMissing(String),

    #[error("OwnershipConflict: {0}")]
    OwnershipConflict(String),

    #[error("Timeout: reconcile did not finish within {0:?}")]
    Timeout(Duration),

    #[error("InvalidConfig: {0}")]
    InvalidConfig(String),
}

impl StdError {
    pub fn metric_label(&self) -> String {
        match self {
            StdError::KubeError(kube::Error::Api(resp)) => format!("kube_{}", resp.code),
            StdError::KubeError(_) => "kube".to_string(),
            StdError::ManifestParse(_) => "manifest_parse".to_string(),
            StdError::ManifestRead { .. } => "manifest_read".to_string(),
            StdError::InvalidTemplate(_) => "invalid_template".to_string(),
            StdError::MetadataMissing(_) => "metadata_missing".to_string(),
            StdError::OwnershipConflict(_) => "ownership_conflict".to_string(),
            StdError::Timeout(_) => "timeout".to_string(),
            StdError::InvalidConfig(_) => "invalid_config".to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub struct ErrorWithRequeue {
    pub duration: Duration,
    pub error: StdError,
}

impl ErrorWithRequeue {
    pub fn new(error: StdError, duration: Duration) -> ErrorWithRequeue {
        ErrorWithRequeue { error, duration }
    }

    pub fn metric_label(&self) -> String {
        self.error.metric_label()
    }
}

impl fmt::Display for ErrorWithRequeue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (requeue in {:?})", self.error, self.duration)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Standard Error: {0}")]
    StdError(#[source] StdError),

    #[error("Error With Requeue: {0}")]
    ErrorWithRequeue(#[source] ErrorWithRequeue),
}

impl Error {
    pub fn metric_label(&self) -> String {
        match self {
            Error::StdError(e) => e.metric_label(),
            Error::ErrorWithRequeue(e) => e.metric_label(),
        }
    }

    /// The underlying error kind, whether or not a requeue delay is attached.
    pub fn kind(&self) -> &StdError {
        match self {
            Error::StdError(e) => e,
            Error::ErrorWithRequeue(e) => &e.error,
        }
    }
}

impl From<StdError> for Error {
    fn from(e: StdError) -> Self {
        Error::StdError(e)
    }
}

impl From<kube::Error> for Error {
    fn from(e: kube::Error) -> Self {
        Error::StdError(StdError::KubeError(e))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// True when the API server answered with the given HTTP status code.
pub fn is_api_status(err: &kube::Error, code: u16) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == code)
}
