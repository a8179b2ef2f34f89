//! The module contains the error the engine can throw.
//!
//! The errors fall in three families:
//!
//! - validation: [`InvalidSchedule`], [`InvalidAmount`], [`InvalidName`],
//!   [`InvalidScope`]. Inside a batch run these are reported per item.
//! - [`ConcurrencyConflict`] thrown when an optimistic write found the row
//!   changed since it was read.
//! - persistence: [`Database`].
//!
//!  [`InvalidSchedule`]: EngineError::InvalidSchedule
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidName`]: EngineError::InvalidName
//!  [`InvalidScope`]: EngineError::InvalidScope
//!  [`ConcurrencyConflict`]: EngineError::ConcurrencyConflict
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Invalid budget scope: {0}")]
    InvalidScope(String),
    #[error("Concurrent update: {0}")]
    ConcurrencyConflict(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Whether the error comes from input validation rather than storage.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidSchedule(_)
                | Self::InvalidAmount(_)
                | Self::InvalidName(_)
                | Self::InvalidScope(_)
        )
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidSchedule(a), Self::InvalidSchedule(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidName(a), Self::InvalidName(b)) => a == b,
            (Self::InvalidScope(a), Self::InvalidScope(b)) => a == b,
            (Self::ConcurrencyConflict(a), Self::ConcurrencyConflict(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
