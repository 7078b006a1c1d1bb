use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Registry error: {0}")]
    Registry(#[from] registry_client::RegistryError),

    #[error("Invalid input: {0}")]
    Input(#[from] core_types::CoreError),

    #[error("Connection test failed: {0}")]
    ConnectionTest(String),

    #[error("Connection '{0}' not found in this session.")]
    ConnectionNotFound(String),

    #[error("No open position for '{symbol}' on connection '{connection_id}'.")]
    PositionNotFound {
        connection_id: String,
        symbol: String,
    },

    #[error("The credential vault rejected the write; nothing was persisted.")]
    VaultRejected,
}
