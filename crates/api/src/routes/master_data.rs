//! Route definitions for canonical master data.
//!
//! Mounted at `/master-data`.

use axum::routing::get;
use axum::Router;

use crate::handlers::master_data;
use crate::state::AppState;

/// Routes mounted at `/master-data`.
///
/// ```text
/// GET    /    -> list_master_data
/// POST   /    -> create_master_data
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/",
        get(master_data::list_master_data).post(master_data::create_master_data),
    )
}
