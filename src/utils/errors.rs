use thiserror::Error;

pub type Result<T> = std::result::Result<T, GovernanceError>;

#[derive(Error, Debug)]
pub enum GovernanceError {
    #[error("Blockchain error: {0}")]
    Blockchain(#[from] ethers::providers::ProviderError),

    #[error("Contract error: {message}")]
    Contract { message: String },

    #[error("No RPC provider configured for chain {chain_id}")]
    ProviderUnavailable { chain_id: u64 },

    #[error("Invalid RPC url: {0}")]
    InvalidRpcUrl(#[from] url::ParseError),

    #[error("No active account")]
    NoActiveAccount,

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid decimal value: {0}")]
    InvalidDecimal(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GovernanceError {
    pub fn contract<T: Into<String>>(message: T) -> Self {
        Self::Contract {
            message: message.into(),
        }
    }

    pub fn invalid_request<T: Into<String>>(message: T) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn unexpected_response<T: Into<String>>(message: T) -> Self {
        Self::UnexpectedResponse(message.into())
    }

    /// Errors the caller can fix by changing its input or session.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NoActiveAccount
                | Self::InvalidRequest(_)
                | Self::InvalidDecimal(_)
                | Self::Validation(_)
                | Self::Serialization(_)
        )
    }

    /// Errors raised by the chain or the RPC endpoint.
    pub fn is_upstream_error(&self) -> bool {
        matches!(
            self,
            Self::Blockchain(_)
                | Self::Contract { .. }
                | Self::ProviderUnavailable { .. }
                | Self::InvalidRpcUrl(_)
                | Self::UnexpectedResponse(_)
        )
    }
}
