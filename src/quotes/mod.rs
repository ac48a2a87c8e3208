//! Price collaborator boundary: daily close quotes, read-only.

mod quotes_model;
mod quotes_traits;

pub use quotes_model::*;
pub use quotes_traits::*;
