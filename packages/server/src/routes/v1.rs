use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers::session::*;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/sessions", session_routes(config))
}

fn session_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let forms = OpenApiRouter::new()
        .routes(routes!(open_session))
        .routes(routes!(get_session, close_session))
        .routes(routes!(set_dirty))
        .routes(routes!(adopt_upload))
        .routes(routes!(stage_removal))
        .routes(routes!(save_session))
        .routes(routes!(discard_session))
        .routes(routes!(navigate))
        .routes(routes!(confirm_navigation))
        .routes(routes!(cancel_navigation))
        .routes(routes!(history_navigation));

    let uploads = OpenApiRouter::new()
        .routes(routes!(upload_image))
        .layer(upload_body_limit(config.storage.max_object_size));

    forms.merge(uploads)
}
