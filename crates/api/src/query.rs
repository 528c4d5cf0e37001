//! Shared query parameter types for API handlers.
//!
//! Common query structs that appear across multiple handler modules are
//! extracted here to avoid duplication.

use serde::Deserialize;

/// Query parameters for endpoints scoped to one master-data parent type
/// (`?parent_type=`).
#[derive(Debug, Deserialize)]
pub struct ParentTypeParams {
    pub parent_type: Option<String>,
}
