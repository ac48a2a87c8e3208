pub mod aggregate;
pub mod lots;
pub mod performance;
pub mod snapshot;
