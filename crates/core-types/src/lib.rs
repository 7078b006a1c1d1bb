pub mod credentials;
pub mod display;
pub mod enums;
pub mod error;
pub mod identity;
pub mod live;

// Re-export the core types to provide a clean public API.
pub use credentials::{
    AiCredential, ConnectionCredential, CredentialSet, MarketSelection, StoredSecret,
};
pub use display::{MASK_TOKEN, mask_secret};
pub use enums::{ConnectionStatus, OrderSide, PositionDirection, PositionStatus};
pub use error::CoreError;
pub use identity::UserIdentity;
pub use live::{AccountBalance, CoinBalance, LiveConnection, MarketTicker, Position};
