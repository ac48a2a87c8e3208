//! Ledgerfolio Core - valuation and lot-accounting engine.
//!
//! Turns an append-only ledger of brokerage transactions into per-symbol
//! tax-lot positions and one valuation snapshot per calendar day (total
//! value, cash, net deposits, external cash flow, cumulative TWR) per
//! portfolio. Storage, price fetching and import are external
//! collaborators behind repository traits.

pub mod constants;
pub mod errors;
pub mod portfolio;
pub mod portfolios;
pub mod quotes;
pub mod settings;
pub mod transactions;
pub mod utils;

// Re-export common types from the portfolio modules
pub use portfolio::*;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
