pub mod health;
pub mod import;
pub mod master_data;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /import         import sessions (upload, checks, corrections, advance)
/// /master-data    canonical reference records
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/import", import::router())
        .nest("/master-data", master_data::router())
}
