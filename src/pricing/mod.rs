//! Pricing engine.
//!
//! `rules`, `expr`, `calculators` and `configure` are pure and carry the
//! pricing semantics; `services` loads catalog rows and delegates to them.

pub mod calculators;
pub mod configure;
pub mod expr;
pub mod requests;
pub mod responses;
pub mod rules;
pub mod services;

// Re-export commonly used items
pub use calculators::round_money;
pub use configure::ConfigSnapshot;
