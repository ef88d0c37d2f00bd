//! Domain error types.

/// Top-level error type for igtrader.
#[derive(Debug, thiserror::Error)]
pub enum IgTraderError {
    #[error("authentication failed: {reason}")]
    Auth { reason: String },

    #[error("network error: {reason}")]
    Network { reason: String },

    #[error("venue rejected request ({status}): {reason}")]
    Venue { status: u16, reason: String },

    #[error("storage error: {reason}")]
    Storage { reason: String },

    #[error("storage query error: {reason}")]
    StorageQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no historical data in store; run capture-data first")]
    NoHistory,

    #[error("insufficient history: have {points} close prices, need at least {minimum}")]
    InsufficientHistory { points: usize, minimum: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&IgTraderError> for std::process::ExitCode {
    fn from(err: &IgTraderError) -> Self {
        let code: u8 = match err {
            IgTraderError::Io(_) => 1,
            IgTraderError::ConfigParse { .. }
            | IgTraderError::ConfigMissing { .. }
            | IgTraderError::ConfigInvalid { .. } => 2,
            IgTraderError::Storage { .. } | IgTraderError::StorageQuery { .. } => 3,
            IgTraderError::Auth { .. } => 4,
            IgTraderError::Network { .. } | IgTraderError::Venue { .. } => 5,
            IgTraderError::NoHistory | IgTraderError::InsufficientHistory { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
