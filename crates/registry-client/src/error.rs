use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to reach the registry: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("The registry rejected the request: {0}")]
    Rejected(String),

    #[error("Failed to deserialize the registry response: {0}")]
    Deserialization(String),
}
