use thiserror::Error;

use crate::domain::{ClientId, EntryKind, TaxRateError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{field} {message}")]
    Validation { field: &'static str, message: String },

    #[error("Client already exists: {0}")]
    DuplicateClient(String),

    #[error("Client not found: {0}")]
    ClientNotFound(ClientId),

    #[error("No {kind} with id {id}")]
    RecordNotFound { kind: EntryKind, id: i64 },

    #[error("Tax rate {rate}% is outside the allowed range 0-{max}%")]
    TaxRateOutOfRange { rate: u8, max: u8 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field,
            message: message.into(),
        }
    }
}

impl From<TaxRateError> for AppError {
    fn from(err: TaxRateError) -> Self {
        match err {
            TaxRateError::OutOfRange { rate, max } => AppError::TaxRateOutOfRange { rate, max },
        }
    }
}
