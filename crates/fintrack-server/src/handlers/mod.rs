//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod audit;
pub mod categories;
pub mod config;
pub mod mappings;
pub mod merchant_rules;
pub mod recurring;
pub mod transactions;

// Re-export all handlers for use in router
pub use audit::*;
pub use categories::*;
pub use config::*;
pub use mappings::*;
pub use merchant_rules::*;
pub use recurring::*;
pub use transactions::*;
