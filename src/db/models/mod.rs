// Sub-modules organized by functional domain
pub mod api;
pub mod workflow_scheme;

// API response structures
pub use api::*;

// Row models for the scheme tables
pub use workflow_scheme::*;
