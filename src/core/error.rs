use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Ship not found: {0:?}")]
    ShipNotFound(crate::core::types::ShipId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Scenario error: {0}")]
    ScenarioError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
