//! Request authentication.
//!
//! Clients send `Authorization: Bearer <token>`; the token is resolved to its
//! user, memberships included.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use hyperion_core::Error;
use hyperion_core::groups::GroupType;
use hyperion_core::users::{CoreUser, get_user_by_token};

use crate::routes::AppError;
use crate::state::AppState;

/// Any authenticated user.
pub struct AuthUser(pub CoreUser);

/// An authenticated user whose account belongs to the school.
pub struct SchoolMember(pub CoreUser);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| Error::Unauthorized("Not authenticated".into()))?;

        let user = state
            .db
            .read(|conn| get_user_by_token(conn, token))?
            .ok_or_else(|| Error::Unauthorized("Could not validate credentials".into()))?;

        Ok(AuthUser(user))
    }
}

impl FromRequestParts<AppState> for SchoolMember {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;

        if !user.is_school_member() {
            return Err(Error::forbidden(format!(
                "Unauthorized, user account type {} is not allowed",
                user.account_type.as_str()
            ))
            .into());
        }

        Ok(SchoolMember(user))
    }
}

/// Fail with 403 unless `user` belongs to `group`.
pub fn require_group(user: &CoreUser, group: GroupType) -> Result<(), Error> {
    if user.is_member_of(group.id()) {
        Ok(())
    } else {
        Err(Error::forbidden(format!(
            "Unauthorized, user is not a member of the group {}",
            group.name()
        )))
    }
}
