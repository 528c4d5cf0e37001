//! Route definitions for the staged import wizard.
//!
//! Mounted at `/import`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{import, master_data};
use crate::state::AppState;

/// Routes mounted at `/import`.
///
/// ```text
/// POST   /file                          -> upload_file   (multipart)
/// GET    /{id}                          -> get_import_session
/// POST   /{id}/stage-data               -> stage_data    (legacy envelope)
/// POST   /{id}/mapping                  -> commit_mapping
/// POST   /{id}/checks                   -> run_checks
/// POST   /{id}/correction               -> apply_correction
/// GET    /{id}/master-data/sections     -> list_sections
/// GET    /{id}/master-data/candidates   -> list_candidates
/// POST   /{id}/master-data/resolutions  -> submit_resolutions
/// POST   /{id}/advance                  -> advance_stage
/// POST   /{id}/cancel                   -> cancel_import
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/file", post(import::upload_file))
        .route("/{id}", get(import::get_import_session))
        .route("/{id}/stage-data", post(import::stage_data))
        .route("/{id}/mapping", post(import::commit_mapping))
        .route("/{id}/checks", post(import::run_checks))
        .route("/{id}/correction", post(import::apply_correction))
        .route(
            "/{id}/master-data/sections",
            get(master_data::list_sections),
        )
        .route(
            "/{id}/master-data/candidates",
            get(master_data::list_candidates),
        )
        .route(
            "/{id}/master-data/resolutions",
            post(master_data::submit_resolutions),
        )
        .route("/{id}/advance", post(import::advance_stage))
        .route("/{id}/cancel", post(import::cancel_import))
}
