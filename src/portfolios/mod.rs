mod portfolios_model;
mod portfolios_traits;

pub use portfolios_model::*;
pub use portfolios_traits::*;
