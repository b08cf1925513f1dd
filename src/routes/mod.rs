pub mod advert;
pub mod associations;
pub mod calendar;
pub mod feed;
pub mod groups;
pub mod users;

#[cfg(test)]
mod test_support;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use hyperion_core::Error;
use hyperion_core::files::MAX_IMAGE_SIZE;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Uploads may carry some multipart overhead on top of the largest accepted image.
const BODY_LIMIT: usize = 2 * MAX_IMAGE_SIZE;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(calendar::router())
        .merge(advert::router())
        .merge(feed::router())
        .merge(associations::router())
        .merge(users::router())
        .merge(groups::router())
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Standard API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Convert anyhow errors to HTTP responses
pub struct AppError(anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<Error>() {
            Some(Error::NotFound(_)) => StatusCode::NOT_FOUND,
            Some(Error::Forbidden(_)) => StatusCode::FORBIDDEN,
            Some(Error::Unauthorized(_)) => StatusCode::UNAUTHORIZED,
            Some(Error::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Some(Error::BadRequest(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.0);
        }

        let mut response = (
            status,
            Json(ErrorResponse {
                detail: self.0.to_string(),
            }),
        )
            .into_response();

        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, header::HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// An image read from the `image` field of a multipart body.
pub struct Upload {
    pub content_type: Option<String>,
    pub data: axum::body::Bytes,
}

impl Upload {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| Error::BadRequest(e.body_text()))?
        {
            if field.name() != Some("image") {
                continue;
            }

            let content_type = field.content_type().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| Error::BadRequest(e.body_text()))?;
            return Ok(Upload { content_type, data });
        }

        Err(Error::BadRequest("Missing image field".into()).into())
    }
}

/// Serve a stored image with its content type.
pub fn serve_image(
    state: &AppState,
    directory: &str,
    id: uuid::Uuid,
) -> Result<Response, AppError> {
    let (content_type, data) = state.files.read_image(directory, id)?;
    Ok(([(header::CONTENT_TYPE, content_type.mime())], data).into_response())
}

/// Store an uploaded image for `id`.
pub async fn store_image(
    state: &AppState,
    directory: &str,
    id: uuid::Uuid,
    multipart: Multipart,
) -> Result<StatusCode, AppError> {
    let upload = Upload::from_multipart(multipart).await?;
    state
        .files
        .save_image(directory, id, upload.content_type.as_deref(), &upload.data)?;
    Ok(StatusCode::CREATED)
}
