use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::storage::BoxReader;
use editor::report::delete_best_effort;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::session::*;
use crate::registry::SharedSession;
use crate::state::AppState;

/// Multipart framing allowance on top of the configured object size.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn upload_body_limit(max_object_size: u64) -> DefaultBodyLimit {
    let limit = usize::try_from(max_object_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);
    DefaultBodyLimit::max(limit)
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Sessions",
    operation_id = "openSession",
    summary = "Open an edit session",
    description = "Starts tracking uploads and unsaved changes for one edit form.",
    request_body = OpenSessionRequest,
    responses(
        (status = 201, description = "Session opened", body = SessionView),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn open_session(
    State(state): State<AppState>,
    AppJson(payload): AppJson<OpenSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let location = payload.location.unwrap_or_else(|| "/".to_string());
    validate_location("location", &location)?;

    let (id, session) = state.sessions.open(&location);
    let view = SessionView::from(&*session.lock().await);
    info!(session_id = %id, %location, "Opened edit session");

    Ok((StatusCode::CREATED, Json(view)))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Sessions",
    operation_id = "getSession",
    summary = "Get an edit session",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session snapshot", body = SessionView),
        (status = 400, description = "Malformed session ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Session not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    let session = find_session(&state, &id)?;
    let session = session.lock().await;
    Ok(Json(SessionView::from(&*session)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Sessions",
    operation_id = "closeSession",
    summary = "Close an edit session",
    description = "Ends the session. Uploads of an unsaved session are deleted before responding.",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session closed", body = CloseResponse),
        (status = 404, description = "Session not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CloseResponse>, AppError> {
    let id = parse_session_id(&id)?;
    let report = state
        .sessions
        .close(id)
        .await
        .ok_or_else(|| session_not_found(id))?;

    Ok(Json(CloseResponse {
        report: report.into(),
    }))
}

#[utoipa::path(
    put,
    path = "/{id}/dirty",
    tag = "Sessions",
    operation_id = "setDirty",
    summary = "Set the unsaved-changes flag",
    description = "Reports edits to plain form fields. Uploads and removals set the flag themselves.",
    params(("id" = String, Path, description = "Session ID")),
    request_body = DirtyRequest,
    responses(
        (status = 200, description = "Flag updated", body = SessionView),
        (status = 404, description = "Session not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(dirty = payload.dirty))]
pub async fn set_dirty(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<DirtyRequest>,
) -> Result<Json<SessionView>, AppError> {
    let session = find_session(&state, &id)?;
    let mut session = session.lock().await;
    session.touch();
    session.changes_mut().set_has_unsaved_changes(payload.dirty);
    Ok(Json(SessionView::from(&*session)))
}

#[utoipa::path(
    post,
    path = "/{id}/uploads",
    tag = "Sessions",
    operation_id = "uploadImage",
    summary = "Upload an image for the form",
    description = "Stores the `file` multipart field and tracks it until the session is saved or \
        discarded. An optional `folder` field sent before `file` selects the storage folder.",
    params(("id" = String, Path, description = "Session ID")),
    request_body(content_type = "multipart/form-data", description = "File upload with optional folder"),
    responses(
        (status = 201, description = "Image stored and tracked", body = UploadResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Session not found (NOT_FOUND)", body = ErrorBody),
        (status = 413, description = "File too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn upload_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let session = find_session(&state, &id)?;

    let mut stored: Option<String> = None;
    let parsed = read_upload_fields(&state, &mut multipart, &mut stored).await;

    if let Err(e) = parsed {
        // The stored object is not tracked yet; nothing else would delete it.
        if let Some(url) = stored {
            delete_best_effort(state.store.as_ref(), vec![url]).await;
        }
        return Err(e);
    }

    let url = stored.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;

    let mut session = session.lock().await;
    session.touch();
    session.record_upload(&url);
    info!(session_id = %session.id(), %url, "Stored upload");

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            url,
            session: SessionView::from(&*session),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/{id}/uploads/adopt",
    tag = "Sessions",
    operation_id = "adoptUpload",
    summary = "Stop tracking one upload",
    description = "The upload became part of a saved record and must survive a later discard.",
    params(("id" = String, Path, description = "Session ID")),
    request_body = ImageRequest,
    responses(
        (status = 200, description = "Upload adopted", body = SessionView),
        (status = 404, description = "Session not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(url = %payload.url))]
pub async fn adopt_upload(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<ImageRequest>,
) -> Result<Json<SessionView>, AppError> {
    let session = find_session(&state, &id)?;
    let mut session = session.lock().await;
    session.touch();
    session.adopt_upload(&payload.url);
    Ok(Json(SessionView::from(&*session)))
}

#[utoipa::path(
    post,
    path = "/{id}/removals",
    tag = "Sessions",
    operation_id = "stageRemoval",
    summary = "Stage removal of a saved image",
    description = "The image is deleted from storage only when the session is saved.",
    params(("id" = String, Path, description = "Session ID")),
    request_body = ImageRequest,
    responses(
        (status = 200, description = "Removal staged", body = SessionView),
        (status = 404, description = "Session not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(url = %payload.url))]
pub async fn stage_removal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<ImageRequest>,
) -> Result<Json<SessionView>, AppError> {
    let session = find_session(&state, &id)?;
    let mut session = session.lock().await;
    session.touch();
    session.record_removal(&payload.url);
    Ok(Json(SessionView::from(&*session)))
}

#[utoipa::path(
    post,
    path = "/{id}/save",
    tag = "Sessions",
    operation_id = "saveSession",
    summary = "Commit a successful save",
    description = "Call after the record was persisted. Deletes staged removals, adopts all uploads \
        and clears the unsaved-changes flag.",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Save committed", body = ReportResponse),
        (status = 404, description = "Session not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn save_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReportResponse>, AppError> {
    let session = find_session(&state, &id)?;
    let mut session = session.lock().await;
    session.touch();
    let report = session.commit_saved().await;
    Ok(Json(ReportResponse {
        report: report.into(),
        session: SessionView::from(&*session),
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/discard",
    tag = "Sessions",
    operation_id = "discardSession",
    summary = "Discard unsaved edits",
    description = "Deletes this session's uploads, keeps the saved record's images and clears the \
        unsaved-changes flag.",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Edits discarded", body = ReportResponse),
        (status = 404, description = "Session not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn discard_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReportResponse>, AppError> {
    let session = find_session(&state, &id)?;
    let mut session = session.lock().await;
    session.touch();
    let report = session.discard().await;
    Ok(Json(ReportResponse {
        report: report.into(),
        session: SessionView::from(&*session),
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/navigate",
    tag = "Sessions",
    operation_id = "navigate",
    summary = "Request navigation away from the form",
    description = "Navigates immediately when the form is clean. Otherwise the target is held \
        and the leave prompt is shown.",
    params(("id" = String, Path, description = "Session ID")),
    request_body = NavigateRequest,
    responses(
        (status = 200, description = "Navigation outcome", body = NavigateResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Session not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(target = %payload.target))]
pub async fn navigate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<NavigateRequest>,
) -> Result<Json<NavigateResponse>, AppError> {
    validate_location("target", &payload.target)?;

    let session = find_session(&state, &id)?;
    let mut session = session.lock().await;
    session.touch();
    let outcome = session.changes_mut().safe_navigate(&payload.target);
    Ok(Json(NavigateResponse::new(
        outcome,
        SessionView::from(&*session),
    )))
}

#[utoipa::path(
    post,
    path = "/{id}/navigate/confirm",
    tag = "Sessions",
    operation_id = "confirmNavigation",
    summary = "Leave and discard",
    description = "Deletes this session's uploads, then navigates to the pending target.",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Navigated", body = ConfirmResponse),
        (status = 404, description = "Session not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "No navigation is pending (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn confirm_navigation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConfirmResponse>, AppError> {
    let session = find_session(&state, &id)?;
    let mut session = session.lock().await;
    session.touch();
    let (target, report) = session
        .confirm_discard_and_navigate()
        .await
        .ok_or_else(|| AppError::Conflict("No navigation is pending".into()))?;

    Ok(Json(ConfirmResponse {
        target,
        report: report.into(),
        session: SessionView::from(&*session),
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/navigate/cancel",
    tag = "Sessions",
    operation_id = "cancelNavigation",
    summary = "Stay on the form",
    description = "Dismisses the leave prompt. Tracked uploads and the unsaved-changes flag are kept.",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Prompt dismissed", body = SessionView),
        (status = 404, description = "Session not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn cancel_navigation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    let session = find_session(&state, &id)?;
    let mut session = session.lock().await;
    session.touch();
    session.changes_mut().cancel_navigation();
    Ok(Json(SessionView::from(&*session)))
}

#[utoipa::path(
    post,
    path = "/{id}/history",
    tag = "Sessions",
    operation_id = "historyNavigation",
    summary = "Report a back/forward action",
    description = "Moves the session's location to `destination`. When the form is dirty and \
        `confirmed` is false, the location is pinned back to `leaving` instead.",
    params(("id" = String, Path, description = "Session ID")),
    request_body = HistoryRequest,
    responses(
        (status = 200, description = "History decision", body = HistoryResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Session not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(
    skip(state, payload),
    fields(leaving = %payload.leaving, destination = %payload.destination, confirmed = payload.confirmed)
)]
pub async fn history_navigation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<HistoryRequest>,
) -> Result<Json<HistoryResponse>, AppError> {
    validate_location("leaving", &payload.leaving)?;
    validate_location("destination", &payload.destination)?;

    let session = find_session(&state, &id)?;
    let mut session = session.lock().await;
    session.touch();
    let confirmed = payload.confirmed;
    let decision = session
        .changes_mut()
        .on_history_navigation(&payload.leaving, &payload.destination, || confirmed);
    Ok(Json(HistoryResponse::new(
        decision,
        SessionView::from(&*session),
    )))
}

/// Walk the multipart body, storing the `file` field into `stored` as soon as
/// it has been written.
async fn read_upload_fields(
    state: &AppState,
    multipart: &mut Multipart,
    stored: &mut Option<String>,
) -> Result<(), AppError> {
    let mut folder: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("folder") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read folder: {e}")))?;
                folder = Some(text);
            }
            Some("file") => {
                if stored.is_some() {
                    return Err(AppError::Validation("Only one 'file' field is allowed".into()));
                }
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;
                let folder = match folder.as_deref().map(str::trim) {
                    Some(f) if !f.is_empty() => f.to_string(),
                    _ => state.config.sessions.default_folder.clone(),
                };
                *stored = Some(stream_field_to_store(field, state, &folder, &file_name).await?);
            }
            _ => {}
        }
    }

    Ok(())
}

fn parse_session_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::Validation(format!("Invalid session ID '{raw}'")))
}

fn session_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Edit session {id} not found"))
}

fn find_session(state: &AppState, raw_id: &str) -> Result<SharedSession, AppError> {
    let id = parse_session_id(raw_id)?;
    state.sessions.get(id).ok_or_else(|| session_not_found(id))
}

/// Stream a multipart field to object storage via a temp file.
async fn stream_field_to_store(
    mut field: axum::extract::multipart::Field<'_>,
    state: &AppState,
    folder: &str,
    file_name: &str,
) -> Result<String, AppError> {
    let max_size = state.config.storage.max_object_size;
    let temp_path = std::env::temp_dir().join(format!("cms-upload-{}", Uuid::new_v4()));

    let result = async {
        let mut temp_file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create temp file: {e}")))?;

        let mut total_size: u64 = 0;

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
        {
            total_size += chunk.len() as u64;
            if total_size > max_size {
                return Err(AppError::PayloadTooLarge {
                    actual: total_size,
                    limit: max_size,
                });
            }
            temp_file
                .write_all(&chunk)
                .await
                .map_err(|e| AppError::Internal(format!("Temp file write failed: {e}")))?;
        }

        if total_size == 0 {
            return Err(AppError::Validation("Uploaded file is empty".into()));
        }

        temp_file
            .flush()
            .await
            .map_err(|e| AppError::Internal(format!("Temp file flush failed: {e}")))?;
        drop(temp_file);

        let file = tokio::fs::File::open(&temp_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to reopen temp file: {e}")))?;
        let reader: BoxReader = Box::new(file);
        let url = state.store.put_stream(folder, file_name, reader).await?;

        Ok(url)
    }
    .await;

    if let Err(e) = tokio::fs::remove_file(&temp_path).await {
        warn!(path = %temp_path.display(), error = %e, "Failed to remove upload temp file");
    }

    result
}
