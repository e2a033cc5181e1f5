use thiserror::Error;

#[derive(Error, Debug)]
pub enum AmlError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid transaction context: {0}")]
    Validation(String),

    #[error("Invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("STR report '{report_id}' is submitted and can no longer change")]
    ImmutableState { report_id: String },

    #[error("Alert already exists for transaction '{transaction_id}'")]
    DuplicateAlert { transaction_id: String },

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Model '{name}' is not loaded")]
    ModelUnavailable { name: &'static str },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type AmlResult<T> = Result<T, AmlError>;
