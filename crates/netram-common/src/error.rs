use thiserror::Error;

use crate::validation::ValidationErrors;

#[derive(Debug, Error)]
pub enum NetramError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ValidationErrors> for NetramError {
    fn from(errors: ValidationErrors) -> Self {
        NetramError::Validation(errors)
    }
}

pub type Result<T> = std::result::Result<T, NetramError>;
