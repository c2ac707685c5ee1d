//! HTTP handlers

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Query, Request, State};
use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use minijinja::context;
use tracing::{info, warn, Instrument};

use crate::{
    config::ReportsConfig,
    database::Database,
    errors::TrawlTrackerError,
    models::{CollectionKey, ReportView, Submission, SubmissionForm, REPORT_LIST_LIMIT},
    templates::{Templates, ENTRY_TEMPLATE, INDEX_TEMPLATE},
};

/// State shared by all handlers
#[derive(Debug, Clone)]
pub struct AppState {
    db: Database,
    templates: Arc<Templates>,
    reports: ReportsConfig,
}

impl AppState {
    pub fn new(db: Database, templates: Templates, reports: ReportsConfig) -> Self {
        Self {
            db,
            templates: Arc::new(templates),
            reports,
        }
    }
}

pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(reports_view_handler))
        .route("/entry", get(entry_handler))
        .route("/getreports", get(get_reports_handler))
        .route("/img", get(image_handler))
        .route("/submit", post(submit_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(middleware::from_fn(request_tracing_middleware))
        .with_state(state)
}

async fn request_tracing_middleware(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let span = tracing::info_span!(
        "http.request",
        method = %request.method(),
        route = %request.uri().path(),
    );

    async move {
        let response = next.run(request).await;
        info!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request complete"
        );
        response
    }
    .instrument(span)
    .await
}

/// Reports of the default collection, projected for output
async fn list_views(state: &AppState) -> Result<Vec<ReportView>, TrawlTrackerError> {
    let reports = state
        .db
        .list_reports(&CollectionKey::default(), REPORT_LIST_LIMIT)
        .await?;

    Ok(reports
        .iter()
        .map(|r| ReportView::project(r, state.reports.timezone))
        .collect())
}

async fn reports_view_handler(
    State(state): State<AppState>,
) -> Result<Html<String>, TrawlTrackerError> {
    let reports = list_views(&state).await?;
    let html = state
        .templates
        .render(INDEX_TEMPLATE, context! { reports => reports })?;
    Ok(Html(html))
}

async fn entry_handler(State(state): State<AppState>) -> Result<Html<String>, TrawlTrackerError> {
    let html = state.templates.render(ENTRY_TEMPLATE, context! {})?;
    Ok(Html(html))
}

async fn get_reports_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, TrawlTrackerError> {
    let reports = list_views(&state).await?;
    Ok(([(ACCESS_CONTROL_ALLOW_ORIGIN, "*")], Json(reports)))
}

async fn image_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, TrawlTrackerError> {
    let raw_id = params.get("img_id").map(String::as_str).unwrap_or_default();
    let id = raw_id
        .trim()
        .parse::<i64>()
        .map_err(|_| TrawlTrackerError::MalformedField {
            field: "img_id",
            value: raw_id.to_string(),
        })?;

    let report = state
        .db
        .get_report(&CollectionKey::default(), id)
        .await?
        .ok_or(TrawlTrackerError::ReportNotFound(id))?;

    match report.report.photo {
        Some(photo) if !photo.is_empty() => Ok((
            [
                (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
                (CONTENT_TYPE, image_content_type(&photo)),
            ],
            photo,
        )),
        _ => {
            warn!("Report {} has no photo", id);
            Err(TrawlTrackerError::PhotoNotFound(id))
        }
    }
}

async fn submit_handler(
    State(state): State<AppState>,
    form: SubmissionForm,
) -> Result<Redirect, TrawlTrackerError> {
    let submission = Submission::parse(&form, state.reports.malformed_input)
        .inspect_err(|e| warn!("Rejected submission: {}", e))?;

    let id = state
        .db
        .put_report(&submission.collection, &submission.report)
        .await?;
    info!("Stored report {} in {}", id, submission.collection);

    Ok(Redirect::to("/"))
}

/// Image MIME type from the leading bytes, PNG when unrecognised
fn image_content_type(bytes: &[u8]) -> &'static str {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "image/png",
    }
}

/// Accepts both urlencoded and multipart submissions
impl<S> FromRequest<S> for SubmissionForm
where
    S: Send + Sync,
{
    type Rejection = TrawlTrackerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| TrawlTrackerError::InvalidForm(e.body_text()))?;
            return Ok(pairs.into_iter().collect());
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| TrawlTrackerError::InvalidForm(e.body_text()))?;
        let mut form = SubmissionForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| TrawlTrackerError::InvalidForm(e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            let value = field
                .bytes()
                .await
                .map_err(|e| TrawlTrackerError::InvalidForm(e.body_text()))?;
            form.insert(name, value.to_vec());
        }
        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_image_types() {
        assert_eq!(image_content_type(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(image_content_type(b"GIF89a..."), "image/gif");
        assert_eq!(image_content_type(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(image_content_type(b"\x89PNG\r\n\x1a\n"), "image/png");
        assert_eq!(image_content_type(b"xyz"), "image/png");
    }
}
