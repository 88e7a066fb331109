//! XML utilities for querying QTI documents.

mod utils;

pub use utils::*;
