//! Database access.
//!
//! Plain `sqlx::query_as` calls with runtime-checked SQL; tables and columns
//! are snake_case and map onto the row structs in `crate::models`.

pub mod audit;
pub mod catalog;
pub mod quotes;

pub use audit::*;
pub use catalog::*;
pub use quotes::*;
