//! Calendar endpoints

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use chrono::Utc;
use hyperion_core::Error;
use hyperion_core::calendar::{
    Decision, EventBase, EventComplete, EventEdit, EventTicketUrl, IMAGE_DIRECTORY, cruds, service,
};
use hyperion_core::groups::GroupType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{AuthUser, SchoolMember, require_group};
use crate::routes::{AppError, serve_image, store_image};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/calendar/events/", get(list_events).post(add_event))
        .route("/calendar/events/confirmed", get(list_confirmed_events))
        .route(
            "/calendar/events/associations/{association_id}",
            get(list_association_events),
        )
        .route(
            "/calendar/events/{event_id}",
            get(get_event).patch(edit_event).delete(delete_event),
        )
        .route("/calendar/events/{event_id}/ticket-url", get(get_ticket_url))
        .route(
            "/calendar/events/{event_id}/image",
            get(get_event_image).post(upload_event_image),
        )
        .route(
            "/calendar/events/{event_id}/reply/{decision}",
            patch(reply_to_event),
        )
        .route("/calendar/ical-url", get(get_ical_url))
        .route("/calendar/ical/create", post(recreate_ical))
        .route("/calendar/ical", get(get_ical))
}

/// GET /calendar/events/ - Every event, for calendar moderators
async fn list_events(
    State(state): State<AppState>,
    SchoolMember(user): SchoolMember,
) -> Result<Json<Vec<EventComplete>>, AppError> {
    let events = state.db.read(|conn| service::list_all_events(conn, &user))?;
    Ok(Json(events))
}

/// GET /calendar/events/confirmed
async fn list_confirmed_events(
    State(state): State<AppState>,
    SchoolMember(_user): SchoolMember,
) -> Result<Json<Vec<EventComplete>>, AppError> {
    let events = state.db.read(cruds::get_confirmed_events)?;
    Ok(Json(events))
}

/// GET /calendar/events/associations/:id
async fn list_association_events(
    State(state): State<AppState>,
    SchoolMember(user): SchoolMember,
    Path(association_id): Path<Uuid>,
) -> Result<Json<Vec<EventComplete>>, AppError> {
    let events = state
        .db
        .read(|conn| service::list_association_events(conn, &user, association_id))?;
    Ok(Json(events))
}

/// GET /calendar/events/:id
async fn get_event(
    State(state): State<AppState>,
    SchoolMember(user): SchoolMember,
    Path(event_id): Path<Uuid>,
) -> Result<Json<EventComplete>, AppError> {
    let event = state
        .db
        .read(|conn| service::get_event_for(conn, &user, event_id))?;
    Ok(Json(event))
}

/// GET /calendar/events/:id/ticket-url
async fn get_ticket_url(
    State(state): State<AppState>,
    SchoolMember(user): SchoolMember,
    Path(event_id): Path<Uuid>,
) -> Result<Json<EventTicketUrl>, AppError> {
    let ticket_url = state
        .db
        .read(|conn| service::get_ticket_url(conn, &user, event_id, Utc::now()))?;
    Ok(Json(EventTicketUrl { ticket_url }))
}

/// POST /calendar/events/
async fn add_event(
    State(state): State<AppState>,
    SchoolMember(user): SchoolMember,
    Json(event): Json<EventBase>,
) -> Result<(StatusCode, Json<EventComplete>), AppError> {
    let require_confirmation = state.settings.school.require_event_confirmation;

    let (created, effects) = state
        .db
        .transaction(|tx| service::add_event(tx, &user, event, require_confirmation))?;
    state.apply(effects).await;

    Ok((StatusCode::CREATED, Json(created)))
}

/// PATCH /calendar/events/:id
async fn edit_event(
    State(state): State<AppState>,
    SchoolMember(user): SchoolMember,
    Path(event_id): Path<Uuid>,
    Json(edit): Json<EventEdit>,
) -> Result<StatusCode, AppError> {
    let effects = state
        .db
        .transaction(|tx| service::edit_event(tx, &user, event_id, &edit))?;
    state.apply(effects).await;

    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /calendar/events/:id/reply/:decision
async fn reply_to_event(
    State(state): State<AppState>,
    SchoolMember(user): SchoolMember,
    Path((event_id, decision)): Path<(Uuid, Decision)>,
) -> Result<StatusCode, AppError> {
    let effects = state
        .db
        .transaction(|tx| service::reply(tx, &user, event_id, decision))?;
    state.apply(effects).await;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /calendar/events/:id
async fn delete_event(
    State(state): State<AppState>,
    SchoolMember(user): SchoolMember,
    Path(event_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let effects = state
        .db
        .transaction(|tx| service::delete_event(tx, &user, event_id))?;
    state.apply(effects).await;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /calendar/events/:id/image
async fn get_event_image(
    State(state): State<AppState>,
    SchoolMember(_user): SchoolMember,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    serve_image(&state, IMAGE_DIRECTORY, event_id)
}

/// POST /calendar/events/:id/image
async fn upload_event_image(
    State(state): State<AppState>,
    SchoolMember(user): SchoolMember,
    Path(event_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<StatusCode, AppError> {
    state
        .db
        .read(|conn| service::check_can_manage_event(conn, &user, event_id))?;
    store_image(&state, IMAGE_DIRECTORY, event_id, multipart).await
}

#[derive(Serialize)]
struct IcalUrl {
    secret: String,
}

/// GET /calendar/ical-url - The user's personal link to the calendar file
async fn get_ical_url(
    State(state): State<AppState>,
    SchoolMember(user): SchoolMember,
) -> Result<Json<IcalUrl>, AppError> {
    let secret = state
        .db
        .transaction(|tx| service::get_or_create_ical_secret(tx, &user))?;

    Ok(Json(IcalUrl {
        secret: format!(
            "{}calendar/ical?secret={}",
            state.settings.client_url, secret
        ),
    }))
}

/// POST /calendar/ical/create - Force a rebuild of the calendar file
async fn recreate_ical(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<StatusCode, AppError> {
    require_group(&user, GroupType::Admin)?;
    state.rebuild_ics().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct IcalQuery {
    secret: String,
}

/// GET /calendar/ical?secret=... - Authorised by the secret alone
async fn get_ical(
    State(state): State<AppState>,
    Query(query): Query<IcalQuery>,
) -> Result<Response, AppError> {
    if !state
        .db
        .read(|conn| service::is_valid_ical_secret(conn, &query.secret))?
    {
        return Err(Error::forbidden("Invalid secret").into());
    }

    let content = state.read_ics().await?;
    Ok(([(header::CONTENT_TYPE, "text/calendar")], content).into_response())
}
