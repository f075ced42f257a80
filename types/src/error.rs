//! Errors raised while parsing fundamental types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid holder id: {0}")]
    InvalidHolder(String),

    #[error("invalid rate: {0}")]
    InvalidRate(String),
}
