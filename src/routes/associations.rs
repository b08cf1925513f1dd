//! Association endpoints

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Response,
    routing::{get, patch},
};
use hyperion_core::associations::{self, Association, AssociationBase, AssociationUpdate};
use hyperion_core::groups::GroupType;
use uuid::Uuid;

use crate::auth::{AuthUser, require_group};
use crate::routes::{AppError, serve_image, store_image};
use crate::state::AppState;

const LOGO_DIRECTORY: &str = "associations";

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/associations/",
            get(list_associations).post(create_association),
        )
        .route("/associations/me", get(list_my_associations))
        .route("/associations/{association_id}", patch(update_association))
        .route(
            "/associations/{association_id}/logo",
            get(get_logo).post(upload_logo),
        )
}

/// GET /associations/
async fn list_associations(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
) -> Result<Json<Vec<Association>>, AppError> {
    Ok(Json(state.db.read(associations::get_associations)?))
}

/// GET /associations/me - Associations whose group the user belongs to
async fn list_my_associations(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Association>>, AppError> {
    let mine = state
        .db
        .read(|conn| associations::get_associations_for_user(conn, &user))?;
    Ok(Json(mine))
}

/// POST /associations/
async fn create_association(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<AssociationBase>,
) -> Result<(StatusCode, Json<Association>), AppError> {
    require_group(&user, GroupType::Admin)?;

    let created = state
        .db
        .transaction(|tx| associations::create_association(tx, &body))?;
    tracing::info!(association = %created.name, "Association created");

    Ok((StatusCode::CREATED, Json(created)))
}

/// PATCH /associations/:id
async fn update_association(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(association_id): Path<Uuid>,
    Json(update): Json<AssociationUpdate>,
) -> Result<StatusCode, AppError> {
    require_group(&user, GroupType::Admin)?;

    state
        .db
        .transaction(|tx| associations::update_association(tx, association_id, &update))?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /associations/:id/logo
async fn get_logo(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(association_id): Path<Uuid>,
) -> Result<Response, AppError> {
    serve_image(&state, LOGO_DIRECTORY, association_id)
}

/// POST /associations/:id/logo
async fn upload_logo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(association_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<StatusCode, AppError> {
    require_group(&user, GroupType::Admin)?;

    state
        .db
        .read(|conn| associations::get_association_by_id(conn, association_id))?
        .ok_or_else(|| hyperion_core::Error::not_found("Association not found"))?;
    store_image(&state, LOGO_DIRECTORY, association_id, multipart).await
}
