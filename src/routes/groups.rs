//! Group endpoints

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use hyperion_core::groups::GroupType;
use hyperion_core::users::{self, Group, GroupCreate, Membership};

use crate::auth::{AuthUser, require_group};
use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/groups/", get(list_groups).post(create_group))
        .route(
            "/groups/membership",
            post(add_membership).delete(delete_membership),
        )
}

/// GET /groups/
async fn list_groups(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
) -> Result<Json<Vec<Group>>, AppError> {
    Ok(Json(state.db.read(users::get_groups)?))
}

/// POST /groups/
async fn create_group(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<GroupCreate>,
) -> Result<(StatusCode, Json<Group>), AppError> {
    require_group(&user, GroupType::Admin)?;

    let group = state.db.transaction(|tx| users::create_group(tx, &body))?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// POST /groups/membership
async fn add_membership(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(membership): Json<Membership>,
) -> Result<StatusCode, AppError> {
    require_group(&user, GroupType::Admin)?;

    state
        .db
        .transaction(|tx| users::add_membership(tx, &membership))?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /groups/membership
async fn delete_membership(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(membership): Json<Membership>,
) -> Result<StatusCode, AppError> {
    require_group(&user, GroupType::Admin)?;

    state
        .db
        .transaction(|tx| users::delete_membership(tx, &membership))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::TestApp;
    use axum::http::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_membership_grants_calendar_privilege() {
        let app = TestApp::new();
        let (_, admin) = app.student("admin@etu.ec-lyon.fr", &[GroupType::Admin.id()]);
        let (student, token) = app.student("student@etu.ec-lyon.fr", &[]);
        let membership = json!({
            "user_id": student.id,
            "group_id": GroupType::AdminCalendar.id(),
        });

        assert_eq!(
            app.get("/calendar/events/", &token).await.status,
            StatusCode::FORBIDDEN
        );

        let response = app.post("/groups/membership", &admin, membership.clone()).await;
        assert_eq!(response.status, StatusCode::NO_CONTENT);
        assert_eq!(app.get("/calendar/events/", &token).await.status, StatusCode::OK);

        let response = app
            .request(Method::DELETE, "/groups/membership", Some(&admin), Some(membership))
            .await;
        assert_eq!(response.status, StatusCode::NO_CONTENT);
        assert_eq!(
            app.get("/calendar/events/", &token).await.status,
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn test_create_group_and_list() {
        let app = TestApp::new();
        let (_, admin) = app.student("admin@etu.ec-lyon.fr", &[GroupType::Admin.id()]);

        let response = app
            .post("/groups/", &admin, json!({ "name": "eclair", "description": "Club photo" }))
            .await;
        assert_eq!(response.status, StatusCode::CREATED);

        let groups = app.get("/groups/", &admin).await.json();
        // Static groups are seeded by the migrations
        assert_eq!(groups.as_array().unwrap().len(), GroupType::ALL.len() + 1);
    }

    #[tokio::test]
    async fn test_membership_to_unknown_group_is_not_found() {
        let app = TestApp::new();
        let (_, admin) = app.student("admin@etu.ec-lyon.fr", &[GroupType::Admin.id()]);
        let (student, _) = app.student("student@etu.ec-lyon.fr", &[]);

        let response = app
            .post(
                "/groups/membership",
                &admin,
                json!({ "user_id": student.id, "group_id": "nope" }),
            )
            .await;

        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }
}
