//! User endpoints

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use hyperion_core::groups::GroupType;
use hyperion_core::users::{self, CoreUser, UserCreate};
use serde::Serialize;

use crate::auth::{AuthUser, require_group};
use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(read_current_user))
        .route("/users/", post(create_user))
}

/// A new account and the token it authenticates with.
#[derive(Serialize)]
pub struct UserCreated {
    pub user: CoreUser,
    pub access_token: String,
}

/// GET /users/me
async fn read_current_user(AuthUser(user): AuthUser) -> Json<CoreUser> {
    Json(user)
}

/// POST /users/
async fn create_user(
    State(state): State<AppState>,
    AuthUser(admin): AuthUser,
    Json(body): Json<UserCreate>,
) -> Result<(StatusCode, Json<UserCreated>), AppError> {
    require_group(&admin, GroupType::Admin)?;

    let created = state.db.transaction(|tx| {
        let user = users::create_user(tx, &body)?;
        let access_token = users::create_access_token(tx, user.id)?;
        Ok(UserCreated { user, access_token })
    })?;
    tracing::info!(user_id = %created.user.id, "User created");

    Ok((StatusCode::CREATED, Json(created)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::TestApp;
    use axum::http::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_me_returns_groups() {
        let app = TestApp::new();
        let (_, token) = app.student("bde@etu.ec-lyon.fr", &[GroupType::Bde.id()]);

        let me = app.get("/users/me", &token).await.json();

        assert_eq!(me["email"], "bde@etu.ec-lyon.fr");
        assert_eq!(me["account_type"], "student");
        assert_eq!(me["group_ids"][0], GroupType::Bde.id());
    }

    #[tokio::test]
    async fn test_invalid_token_is_unauthorized() {
        let app = TestApp::new();

        let response = app.get("/users/me", "not-a-token").await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);

        let response = app.request(Method::GET, "/users/me", None, None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_creates_user_with_working_token() {
        let app = TestApp::new();
        let (_, admin) = app.student("admin@etu.ec-lyon.fr", &[GroupType::Admin.id()]);

        let response = app
            .post(
                "/users/",
                &admin,
                json!({
                    "email": "new@etu.ec-lyon.fr",
                    "name": "New",
                    "firstname": "User",
                    "account_type": "staff",
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);

        let token = response.json()["access_token"].as_str().unwrap().to_string();
        let me = app.get("/users/me", &token).await.json();
        assert_eq!(me["email"], "new@etu.ec-lyon.fr");

        let duplicate = app
            .post(
                "/users/",
                &admin,
                json!({
                    "email": "new@etu.ec-lyon.fr",
                    "name": "New",
                    "firstname": "User",
                    "account_type": "staff",
                }),
            )
            .await;
        assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    }
}
