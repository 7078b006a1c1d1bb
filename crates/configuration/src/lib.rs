use crate::error::ConfigError;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{Config, DEFAULT_PASSPHRASE, Intervals, Registry, Security, Storage};

/// Loads the application configuration.
///
/// This function is the primary entry point for this crate. It layers an
/// optional `config.toml` under `VANTAGE__*` environment variables,
/// deserializes the result into our strongly-typed `Config` struct, and
/// validates it. Every setting has a default, so running without a config
/// file is supported.
pub fn load_config() -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        // Tells the builder to look for a file named `config.toml`
        .add_source(config::File::with_name("config.toml").required(false))
        .add_source(config::Environment::with_prefix("VANTAGE").separator("__"))
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}
