//! Helpers for route tests: an app on a temporary directory and a notifier
//! that records what it is asked to send.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{Method, Request, StatusCode, header};
use axum::Router;
use hyperion_core::associations::{Association, AssociationBase, create_association};
use hyperion_core::groups::AccountType;
use hyperion_core::notification::{Message, Notification, NotificationTool, Recipient};
use hyperion_core::users::{
    CoreUser, GroupCreate, Membership, UserCreate, add_membership, create_access_token,
    create_group, create_user, get_user_by_id,
};
use hyperion_core::{Database, Settings};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use crate::state::AppState;

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationTool for RecordingNotifier {
    async fn send_notification_to_topic(
        &self,
        topic_id: Uuid,
        message: &Message,
    ) -> hyperion_core::Result<()> {
        self.sent.lock().unwrap().push(Notification {
            recipient: Recipient::Topic(topic_id),
            message: message.clone(),
        });
        Ok(())
    }

    async fn send_notification_to_group(
        &self,
        group_id: &str,
        message: &Message,
    ) -> hyperion_core::Result<()> {
        self.sent.lock().unwrap().push(Notification {
            recipient: Recipient::Group(group_id.to_string()),
            message: message.clone(),
        });
        Ok(())
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).unwrap()
    }
}

pub struct TestApp {
    pub state: AppState,
    pub notifier: Arc<RecordingNotifier>,
    pub dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(|_| {})
    }

    pub fn with_settings(configure: impl FnOnce(&mut Settings)) -> Self {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings {
            data_dir: dir.path().join("data"),
            ics_path: dir.path().join("ics/calendar.ics"),
            database_path: dir.path().join("hyperion.db"),
            ..Settings::default()
        };
        configure(&mut settings);

        let notifier = Arc::new(RecordingNotifier::default());
        let db = Database::open_in_memory().unwrap();
        let state = AppState::with_database(db, settings, notifier.clone());

        TestApp {
            state,
            notifier,
            dir,
        }
    }

    pub fn router(&self) -> Router {
        super::router(self.state.clone())
    }

    /// Create a user in `groups` and return it with a bearer token.
    pub fn user(
        &self,
        email: &str,
        account_type: AccountType,
        groups: &[&str],
    ) -> (CoreUser, String) {
        self.state
            .db
            .transaction(|tx| {
                let user = create_user(
                    tx,
                    &UserCreate {
                        email: email.to_string(),
                        name: "Name".to_string(),
                        firstname: "Firstname".to_string(),
                        account_type,
                    },
                )?;
                for group in groups {
                    add_membership(
                        tx,
                        &Membership {
                            user_id: user.id,
                            group_id: group.to_string(),
                        },
                    )?;
                }
                let token = create_access_token(tx, user.id)?;
                let user = get_user_by_id(tx, user.id)?
                    .ok_or(hyperion_core::Error::NewlyAddedObjectNotFound("user"))?;
                Ok((user, token))
            })
            .unwrap()
    }

    pub fn student(&self, email: &str, groups: &[&str]) -> (CoreUser, String) {
        self.user(email, AccountType::Student, groups)
    }

    /// Create an association managed by a new group.
    pub fn association(&self, name: &str) -> Association {
        self.state
            .db
            .transaction(|tx| {
                let group = create_group(
                    tx,
                    &GroupCreate {
                        name: format!("{name} group"),
                        description: None,
                    },
                )?;
                create_association(
                    tx,
                    &AssociationBase {
                        name: name.to_string(),
                        group_id: group.id,
                    },
                )
            })
            .unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            content_type,
            body,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Upload `data` as the `image` field of a multipart body.
    pub async fn upload(&self, uri: &str, token: &str, mime: &str, data: &[u8]) -> TestResponse {
        let boundary = "hyperion-test-boundary";
        let mut body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"image\"; filename=\"image\"\r\n\
             Content-Type: {mime}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }
}
