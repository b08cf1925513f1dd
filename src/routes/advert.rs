//! Advert endpoints

use axum::{
    Json, Router,
    extract::{Multipart, Path, RawQuery, State},
    http::StatusCode,
    response::Response,
    routing::get,
};
use hyperion_core::Error;
use hyperion_core::advert::{self, Advert, AdvertBase, AdvertUpdate, IMAGE_DIRECTORY};
use uuid::Uuid;

use crate::auth::SchoolMember;
use crate::routes::{AppError, serve_image, store_image};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/advert/adverts", get(list_adverts).post(create_advert))
        .route(
            "/advert/adverts/{advert_id}",
            get(get_advert).patch(update_advert).delete(delete_advert),
        )
        .route(
            "/advert/adverts/{advert_id}/picture",
            get(get_advert_image).post(upload_advert_image),
        )
}

/// Collect the repeated `advertisers` query parameter.
fn advertisers_filter(query: Option<&str>) -> Result<Vec<Uuid>, Error> {
    let Some(query) = query else {
        return Ok(Vec::new());
    };

    url::form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| key == "advertisers")
        .map(|(_, value)| {
            value
                .parse::<Uuid>()
                .map_err(|_| Error::BadRequest(format!("Invalid advertiser id: {value}")))
        })
        .collect()
}

/// GET /advert/adverts[?advertisers=<id>...]
async fn list_adverts(
    State(state): State<AppState>,
    SchoolMember(_user): SchoolMember,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<Advert>>, AppError> {
    let advertisers = advertisers_filter(query.as_deref())?;

    let adverts = state.db.read(|conn| {
        if advertisers.is_empty() {
            advert::get_adverts(conn)
        } else {
            advert::get_adverts_by_advertisers(conn, &advertisers)
        }
    })?;
    Ok(Json(adverts))
}

/// GET /advert/adverts/:id
async fn get_advert(
    State(state): State<AppState>,
    SchoolMember(_user): SchoolMember,
    Path(advert_id): Path<Uuid>,
) -> Result<Json<Advert>, AppError> {
    let advert = state
        .db
        .read(|conn| advert::get_advert_by_id(conn, advert_id))?
        .ok_or_else(|| Error::not_found("The advert does not exist"))?;
    Ok(Json(advert))
}

/// POST /advert/adverts
async fn create_advert(
    State(state): State<AppState>,
    SchoolMember(user): SchoolMember,
    Json(body): Json<AdvertBase>,
) -> Result<(StatusCode, Json<Advert>), AppError> {
    let (created, effects) = state
        .db
        .transaction(|tx| advert::create_advert(tx, &user, body))?;
    state.apply(effects).await;

    Ok((StatusCode::CREATED, Json(created)))
}

/// PATCH /advert/adverts/:id
async fn update_advert(
    State(state): State<AppState>,
    SchoolMember(user): SchoolMember,
    Path(advert_id): Path<Uuid>,
    Json(update): Json<AdvertUpdate>,
) -> Result<StatusCode, AppError> {
    state
        .db
        .transaction(|tx| advert::update_advert(tx, &user, advert_id, &update))?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /advert/adverts/:id
async fn delete_advert(
    State(state): State<AppState>,
    SchoolMember(user): SchoolMember,
    Path(advert_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let effects = state
        .db
        .transaction(|tx| advert::delete_advert(tx, &user, advert_id))?;
    state.apply(effects).await;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /advert/adverts/:id/picture
async fn get_advert_image(
    State(state): State<AppState>,
    SchoolMember(_user): SchoolMember,
    Path(advert_id): Path<Uuid>,
) -> Result<Response, AppError> {
    serve_image(&state, IMAGE_DIRECTORY, advert_id)
}

/// POST /advert/adverts/:id/picture
async fn upload_advert_image(
    State(state): State<AppState>,
    SchoolMember(user): SchoolMember,
    Path(advert_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<StatusCode, AppError> {
    state
        .db
        .read(|conn| advert::get_managed_advert(conn, &user, advert_id))?;
    store_image(&state, IMAGE_DIRECTORY, advert_id, multipart).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::TestApp;
    use hyperion_core::associations::Association;
    use hyperion_core::feed::{NewsStatus, get_news_by_module_object};
    use hyperion_core::groups::GroupType;
    use hyperion_core::notification::Recipient;
    use serde_json::json;

    struct Adverts {
        app: TestApp,
        association: Association,
        member: String,
        outsider: String,
    }

    fn adverts() -> Adverts {
        let app = TestApp::new();
        let association = app.association("Eclair");
        let (_, member) = app.student("member@etu.ec-lyon.fr", &[association.group_id.as_str()]);
        let (_, outsider) = app.student("outsider@etu.ec-lyon.fr", &[]);
        Adverts {
            app,
            association,
            member,
            outsider,
        }
    }

    impl Adverts {
        async fn create(&self, post_to_feed: bool) -> Uuid {
            let response = self
                .app
                .post(
                    "/advert/adverts",
                    &self.member,
                    json!({
                        "title": "Les 24h du code",
                        "content": "Inscriptions ouvertes",
                        "advertiser_id": self.association.id,
                        "post_to_feed": post_to_feed,
                    }),
                )
                .await;
            assert_eq!(response.status, StatusCode::CREATED);
            response.json()["id"].as_str().unwrap().parse().unwrap()
        }
    }

    #[test]
    fn test_advertisers_filter_reads_repeated_keys() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let query = format!("advertisers={a}&advertisers={b}&x=1");
        let filter = advertisers_filter(Some(&query)).unwrap();

        assert_eq!(filter, vec![a, b]);
        assert!(advertisers_filter(None).unwrap().is_empty());
        assert!(matches!(
            advertisers_filter(Some("advertisers=nope")),
            Err(Error::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_create_advert_notifies_association_topic() {
        let a = adverts();

        a.create(false).await;

        let sent = a.app.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(matches!(sent[0].recipient, Recipient::Topic(_)));
        assert_eq!(sent[0].message.title, "📣 Annonce - Les 24h du code");
        assert_eq!(sent[0].message.action_module, "advert");
    }

    #[tokio::test]
    async fn test_post_to_feed_waits_for_feed_admin() {
        let a = adverts();

        let id = a.create(true).await;

        let news = a
            .app
            .state
            .db
            .read(|conn| get_news_by_module_object(conn, "advert", id))
            .unwrap();
        assert_eq!(news.len(), 1);
        assert_eq!(news[0].status, NewsStatus::WaitingApproval);
        assert!(a.app.notifier.sent().iter().any(|n| n.recipient
            == Recipient::Group(GroupType::AdminFeed.id().to_string())));
    }

    #[tokio::test]
    async fn test_outsider_cannot_create_advert() {
        let a = adverts();

        let response = a
            .app
            .post(
                "/advert/adverts",
                &a.outsider,
                json!({
                    "title": "Spam",
                    "content": "Spam",
                    "advertiser_id": a.association.id,
                }),
            )
            .await;

        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert!(a.app.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_advertiser_is_not_found() {
        let a = adverts();

        let response = a
            .app
            .post(
                "/advert/adverts",
                &a.member,
                json!({
                    "title": "Lost",
                    "content": "Lost",
                    "advertiser_id": Uuid::new_v4(),
                }),
            )
            .await;

        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_filters_by_advertiser() {
        let a = adverts();
        a.create(false).await;
        let other = a.app.association("Bazar");

        let all = a.app.get("/advert/adverts", &a.outsider).await;
        assert_eq!(all.json().as_array().unwrap().len(), 1);

        let filtered = a
            .app
            .get(&format!("/advert/adverts?advertisers={}", other.id), &a.outsider)
            .await;
        assert!(filtered.json().as_array().unwrap().is_empty());

        let filtered = a
            .app
            .get(
                &format!(
                    "/advert/adverts?advertisers={}&advertisers={}",
                    other.id, a.association.id
                ),
                &a.outsider,
            )
            .await;
        assert_eq!(filtered.json().as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_advert() {
        let a = adverts();
        let id = a.create(true).await;
        let uri = format!("/advert/adverts/{id}");

        let response = a.app.patch(&uri, &a.outsider, json!({ "title": "Hack" })).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);

        let response = a.app.patch(&uri, &a.member, json!({ "title": "Edition 2" })).await;
        assert_eq!(response.status, StatusCode::NO_CONTENT);
        let advert = a.app.get(&uri, &a.outsider).await.json();
        assert_eq!(advert["title"], "Edition 2");
        assert_eq!(advert["content"], "Inscriptions ouvertes");

        let picture = format!("{uri}/picture");
        a.app.upload(&picture, &a.member, "image/png", b"png").await;

        let response = a.app.delete(&uri, &a.member).await;
        assert_eq!(response.status, StatusCode::NO_CONTENT);
        assert_eq!(a.app.get(&uri, &a.outsider).await.status, StatusCode::NOT_FOUND);
        assert_eq!(a.app.get(&picture, &a.outsider).await.status, StatusCode::NOT_FOUND);
        assert!(
            a.app
                .state
                .db
                .read(|conn| get_news_by_module_object(conn, "advert", id))
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_advert_picture() {
        let a = adverts();
        let id = a.create(false).await;
        let uri = format!("/advert/adverts/{id}/picture");

        assert_eq!(a.app.get(&uri, &a.member).await.status, StatusCode::NOT_FOUND);

        let response = a.app.upload(&uri, &a.member, "image/webp", b"webp").await;
        assert_eq!(response.status, StatusCode::CREATED);

        let response = a.app.get(&uri, &a.outsider).await;
        assert_eq!(response.content_type.as_deref(), Some("image/webp"));
        assert_eq!(&response.body[..], b"webp");
    }
}
