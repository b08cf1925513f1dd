//! Feed endpoints

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};
use hyperion_core::Error;
use hyperion_core::feed::{self, News, NewsStatus};
use hyperion_core::groups::GroupType;
use uuid::Uuid;

use crate::auth::{SchoolMember, require_group};
use crate::routes::{AppError, serve_image, store_image};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/feed/news", get(list_published_news))
        .route(
            "/feed/news/{news_id}/image",
            get(get_news_image).post(upload_news_image),
        )
        .route("/feed/admin/news", get(list_all_news))
        .route("/feed/admin/news/{news_id}/approve", post(approve_news))
        .route("/feed/admin/news/{news_id}/reject", post(reject_news))
}

fn find_news(state: &AppState, news_id: Uuid) -> Result<News, AppError> {
    let news = state
        .db
        .read(|conn| feed::get_news_by_id(conn, news_id))?
        .ok_or_else(|| Error::not_found("The news does not exist"))?;
    Ok(news)
}

/// GET /feed/news - Published news
async fn list_published_news(
    State(state): State<AppState>,
    SchoolMember(_user): SchoolMember,
) -> Result<Json<Vec<News>>, AppError> {
    let news = state
        .db
        .read(|conn| feed::get_news(conn, &[NewsStatus::Published]))?;
    Ok(Json(news))
}

/// GET /feed/admin/news - Every news, whatever its status
async fn list_all_news(
    State(state): State<AppState>,
    SchoolMember(user): SchoolMember,
) -> Result<Json<Vec<News>>, AppError> {
    require_group(&user, GroupType::AdminFeed)?;
    let news = state.db.read(feed::get_all_news)?;
    Ok(Json(news))
}

fn change_status(
    state: &AppState,
    user: &hyperion_core::users::CoreUser,
    news_id: Uuid,
    status: NewsStatus,
) -> Result<StatusCode, AppError> {
    require_group(user, GroupType::AdminFeed)?;
    state
        .db
        .transaction(|tx| feed::change_news_status(tx, news_id, status))?;
    tracing::info!(%news_id, %status, "News moderated");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /feed/admin/news/:id/approve
async fn approve_news(
    State(state): State<AppState>,
    SchoolMember(user): SchoolMember,
    Path(news_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    change_status(&state, &user, news_id, NewsStatus::Published)
}

/// POST /feed/admin/news/:id/reject
async fn reject_news(
    State(state): State<AppState>,
    SchoolMember(user): SchoolMember,
    Path(news_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    change_status(&state, &user, news_id, NewsStatus::Rejected)
}

/// GET /feed/news/:id/image - The image of the object the news points to
async fn get_news_image(
    State(state): State<AppState>,
    SchoolMember(_user): SchoolMember,
    Path(news_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let news = find_news(&state, news_id)?;
    serve_image(&state, &news.image_directory, news.image_id)
}

/// POST /feed/news/:id/image
async fn upload_news_image(
    State(state): State<AppState>,
    SchoolMember(user): SchoolMember,
    Path(news_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<StatusCode, AppError> {
    require_group(&user, GroupType::AdminFeed)?;
    let news = find_news(&state, news_id)?;
    store_image(&state, &news.image_directory, news.image_id, multipart).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::TestApp;
    use axum::http::Method;
    use serde_json::json;

    struct Feed {
        app: TestApp,
        member: String,
        feed_admin: String,
        news_id: Uuid,
        advert_id: Uuid,
    }

    /// An advert posted to the feed, waiting for moderation.
    async fn feed() -> Feed {
        let app = TestApp::new();
        let association = app.association("Eclair");
        let (_, member) = app.student("member@etu.ec-lyon.fr", &[association.group_id.as_str()]);
        let (_, feed_admin) = app.student("feed@etu.ec-lyon.fr", &[GroupType::AdminFeed.id()]);

        let advert = app
            .post(
                "/advert/adverts",
                &member,
                json!({
                    "title": "Les 24h du code",
                    "content": "Inscriptions ouvertes",
                    "advertiser_id": association.id,
                    "post_to_feed": true,
                }),
            )
            .await
            .json();
        let advert_id: Uuid = advert["id"].as_str().unwrap().parse().unwrap();

        let all = app.get("/feed/admin/news", &feed_admin).await.json();
        let news_id = all[0]["id"].as_str().unwrap().parse().unwrap();

        Feed {
            app,
            member,
            feed_admin,
            news_id,
            advert_id,
        }
    }

    #[tokio::test]
    async fn test_pending_news_is_hidden_until_approved() {
        let f = feed().await;

        let published = f.app.get("/feed/news", &f.member).await.json();
        assert!(published.as_array().unwrap().is_empty());

        let response = f
            .app
            .request(
                Method::POST,
                &format!("/feed/admin/news/{}/approve", f.news_id),
                Some(&f.feed_admin),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::NO_CONTENT);

        let published = f.app.get("/feed/news", &f.member).await.json();
        assert_eq!(published.as_array().unwrap().len(), 1);
        assert_eq!(published[0]["status"], "published");
        assert_eq!(published[0]["entity"], "Eclair");
    }

    #[tokio::test]
    async fn test_reject_news() {
        let f = feed().await;

        let response = f
            .app
            .request(
                Method::POST,
                &format!("/feed/admin/news/{}/reject", f.news_id),
                Some(&f.feed_admin),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::NO_CONTENT);

        let all = f.app.get("/feed/admin/news", &f.feed_admin).await.json();
        assert_eq!(all[0]["status"], "rejected");
    }

    #[tokio::test]
    async fn test_moderation_requires_feed_admin() {
        let f = feed().await;

        assert_eq!(
            f.app.get("/feed/admin/news", &f.member).await.status,
            StatusCode::FORBIDDEN
        );
        let response = f
            .app
            .request(
                Method::POST,
                &format!("/feed/admin/news/{}/approve", f.news_id),
                Some(&f.member),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unknown_news_is_not_found() {
        let f = feed().await;

        let response = f
            .app
            .request(
                Method::POST,
                &format!("/feed/admin/news/{}/approve", Uuid::new_v4()),
                Some(&f.feed_admin),
                None,
            )
            .await;

        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_news_image_is_the_advert_picture() {
        let f = feed().await;
        f.app
            .upload(
                &format!("/advert/adverts/{}/picture", f.advert_id),
                &f.member,
                "image/jpeg",
                b"jpeg",
            )
            .await;

        let response = f
            .app
            .get(&format!("/feed/news/{}/image", f.news_id), &f.member)
            .await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(&response.body[..], b"jpeg");
    }
}
