//! Core error types for the valuation engine.
//!
//! This module defines database-agnostic error types. Storage-specific
//! errors (from whatever backend implements the repository traits) are
//! converted to these types by the storage layer.

use chrono::{NaiveDate, ParseError as ChronoParseError};
use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the valuation engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Ledger calculation failed: {0}")]
    Calculation(#[from] CalculatorError),

    #[error("Aggregation failed: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Errors that occur while replaying transactions into lots and cash.
#[derive(Error, Debug)]
pub enum CalculatorError {
    #[error("Invalid transaction data: {0}")]
    InvalidTransaction(String),

    /// SELL or TRANSFER_OUT exceeding open lot quantity. This is a data
    /// inconsistency and fails the rebuild for the portfolio; it is never
    /// clamped to the available quantity.
    #[error(
        "Insufficient lot quantity for {symbol} in portfolio {portfolio_id} on {date} \
         (transaction {transaction_id}): requested {requested}, available {available}"
    )]
    InsufficientQuantity {
        portfolio_id: String,
        symbol: String,
        date: NaiveDate,
        transaction_id: String,
        requested: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    #[error("Position not found for symbol {symbol} in portfolio {portfolio_id}")]
    PositionNotFound {
        portfolio_id: String,
        symbol: String,
    },

    #[error("Calculation failed: {0}")]
    Calculation(String),
}

/// Errors raised when composing aggregate portfolios from member snapshots.
#[derive(Error, Debug)]
pub enum AggregationError {
    /// A member portfolio has no snapshot for a date the aggregate covers.
    /// The aggregate must not substitute zero for the missing member.
    #[error("Member portfolio {portfolio_id} has no snapshot for {date}")]
    MissingMemberSnapshot {
        portfolio_id: String,
        date: NaiveDate,
    },

    #[error("Aggregate portfolio {0} has no members")]
    NoMembers(String),

    #[error("No date range is covered by all members of aggregate {0}")]
    NoCoveredRange(String),
}

/// Validation errors for user input and data parsing.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] ChronoParseError),
}

// === From implementations for common error types ===

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::DateTimeParse(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
