#![allow(dead_code)]

use std::{net::TcpListener, path::PathBuf, sync::Arc, time::Duration};

use artgallery::{init_db, make_app, run_app, AppState, Config, MemoryMediaStore};
use reqwest::{multipart, Client, Response, StatusCode};
use serde_json::{json, Value};

pub struct TestApp {
    pub address: String,
    pub media: Arc<MemoryMediaStore>,
    pub upload_dir: PathBuf,
    pub client: Client,
}

/// A registered and logged-in user, authenticating with a bearer token.
pub struct Session {
    pub id: i64,
    pub username: String,
    pub access_token: String,
    pub refresh_token: String,
}

pub fn test_config(database_url: &str, upload_dir: PathBuf) -> Config {
    Config {
        database_url: database_url.to_owned(),
        host: "127.0.0.1".to_owned(),
        port: 0,
        access_token_secret: "test-access-secret".to_owned(),
        access_token_expiry: Duration::from_secs(15 * 60),
        refresh_token_secret: "test-refresh-secret".to_owned(),
        refresh_token_expiry: Duration::from_secs(24 * 60 * 60),
        cors_origin: None,
        upload_dir,
        cookie_secure: false,
        cloudinary: None,
        media_timeout: Duration::from_secs(5),
    }
}

/// Runs against an in-memory database, which the pool serves through a
/// single connection.
pub async fn spawn_app() -> TestApp {
    spawn_with_database("sqlite::memory:", scratch_path("")).await
}

/// Runs against a fresh database file, so the pool hands out several
/// connections and requests really overlap.
pub async fn spawn_file_app() -> TestApp {
    let database = scratch_path(".db");
    let url = format!("sqlite://{}", database.display());
    spawn_with_database(&url, scratch_path("")).await
}

fn scratch_path(suffix: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "artgallery-test-{}{suffix}",
        uuid::Uuid::new_v4()
    ))
}

async fn spawn_with_database(database_url: &str, upload_dir: PathBuf) -> TestApp {
    let config = test_config(database_url, upload_dir.clone());
    let pool = init_db(&config).await.expect("database should initialise");
    let media = Arc::new(MemoryMediaStore::new());
    let app = make_app(AppState {
        pool,
        config,
        media: media.clone(),
    })
    .expect("app should build");

    let listener = TcpListener::bind("127.0.0.1:0").expect("should bind an ephemeral port");
    let address = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(run_app(app, listener));

    TestApp {
        address,
        media,
        upload_dir,
        client: Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn register(&self, username: &str, password: &str) -> Response {
        self.client
            .post(self.url("/user/register"))
            .json(&json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": password,
                "fullname": format!("{username} tester"),
            }))
            .send()
            .await
            .unwrap()
    }

    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.client
            .post(self.url("/user/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap()
    }

    pub async fn signed_up(&self, username: &str) -> Session {
        let response = self.register(username, "password123").await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let response = self.login(username, "password123").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        Session {
            id: body["data"]["user"]["id"].as_i64().unwrap(),
            username: username.to_owned(),
            access_token: body["data"]["accessToken"].as_str().unwrap().to_owned(),
            refresh_token: body["data"]["refreshToken"].as_str().unwrap().to_owned(),
        }
    }

    /// Publishes an art with a small fake image and returns its JSON.
    pub async fn publish(&self, session: &Session, name: &str) -> Value {
        let response = self.publish_raw(session, name).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.unwrap();
        body["data"].clone()
    }

    pub async fn publish_raw(&self, session: &Session, name: &str) -> Response {
        let form = multipart::Form::new()
            .text("name", name.to_owned())
            .text("caption", format!("caption of {name}"))
            .part("artFile", image_part());
        self.client
            .post(self.url("/art"))
            .bearer_auth(&session.access_token)
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    pub async fn toggle_art_like(&self, session: &Session, art_id: i64) -> Value {
        let response = self
            .client
            .post(self.url(&format!("/like/art/{art_id}/toggle")))
            .bearer_auth(&session.access_token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        body["data"].clone()
    }

    pub async fn get_art(&self, session: Option<&Session>, art_id: i64) -> Response {
        let mut request = self.client.get(self.url(&format!("/art/{art_id}")));
        if let Some(session) = session {
            request = request.bearer_auth(&session.access_token);
        }
        request.send().await.unwrap()
    }

    /// Number of files still sitting in the staging directory.
    pub fn staged_files(&self) -> usize {
        match std::fs::read_dir(&self.upload_dir) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}

pub fn image_part() -> multipart::Part {
    multipart::Part::bytes(vec![0x89, b'P', b'N', b'G', 1, 2, 3, 4])
        .file_name("art.png")
        .mime_str("image/png")
        .unwrap()
}

pub fn auth_cookie(response: &Response, name: &str) -> Option<String> {
    response
        .cookies()
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_owned())
}
