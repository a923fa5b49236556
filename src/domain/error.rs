//! Domain error types.

/// Top-level error type for moneybin.
#[derive(Debug, thiserror::Error)]
pub enum MoneybinError {
    #[error("invalid amount: {amount}")]
    InvalidAmount { amount: f64 },

    #[error("insufficient funds: need {required}, have {available}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("insufficient position in {asset}: requested {requested}, held {held}")]
    InsufficientPosition {
        asset: String,
        requested: f64,
        held: f64,
    },

    #[error("no price for asset {asset}")]
    AssetNotFound { asset: String },

    #[error("unknown wallet {wallet_id}")]
    WalletNotFound { wallet_id: u32 },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

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

    #[error("feed error: {reason}")]
    Feed { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&MoneybinError> for std::process::ExitCode {
    fn from(err: &MoneybinError) -> Self {
        let code: u8 = match err {
            MoneybinError::Io(_) => 1,
            MoneybinError::ConfigParse { .. }
            | MoneybinError::ConfigMissing { .. }
            | MoneybinError::ConfigInvalid { .. } => 2,
            MoneybinError::Feed { .. } => 3,
            MoneybinError::InvalidAmount { .. }
            | MoneybinError::InsufficientFunds { .. }
            | MoneybinError::InsufficientPosition { .. }
            | MoneybinError::AssetNotFound { .. }
            | MoneybinError::WalletNotFound { .. }
            | MoneybinError::InvalidInput { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
