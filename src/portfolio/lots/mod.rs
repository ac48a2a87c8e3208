//! Lot accounting: FIFO tax lots, settlement cash, transaction replay.

pub mod lot_engine;
mod positions_model;

pub use lot_engine::*;
pub use positions_model::*;
