use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventsError {
    #[error("Failed to encode or decode event message: {0}")]
    Serialization(String),
}
