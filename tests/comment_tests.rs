mod common;

use common::{spawn_app, Session, TestApp};
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn comment(app: &TestApp, session: &Session, art_id: i64, content: &str) -> Value {
    let response = app
        .client
        .post(app.url(&format!("/comment/{art_id}")))
        .bearer_auth(&session.access_token)
        .json(&json!({ "content": content }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    body["data"].clone()
}

#[tokio::test]
async fn comments_are_listed_newest_first() {
    let app = spawn_app().await;
    let artist = app.signed_up("rembrandt").await;
    let critic = app.signed_up("vasari").await;
    let art_id = app.publish(&artist, "Night Watch").await["id"].as_i64().unwrap();

    let first = comment(&app, &critic, art_id, "Too dark").await;
    let second = comment(&app, &artist, art_id, "It is night").await;
    assert_eq!(first["art"], art_id);
    assert_eq!(first["owner"]["username"], "vasari");

    let response = app
        .client
        .get(app.url(&format!("/comment/{art_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["comments"][0]["id"], second["id"]);
    assert_eq!(body["data"]["comments"][1]["id"], first["id"]);
}

#[tokio::test]
async fn blank_comment_is_rejected() {
    let app = spawn_app().await;
    let artist = app.signed_up("rembrandt").await;
    let art_id = app.publish(&artist, "Night Watch").await["id"].as_i64().unwrap();

    let response = app
        .client
        .post(app.url(&format!("/comment/{art_id}")))
        .bearer_auth(&artist.access_token)
        .json(&json!({ "content": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn commenting_on_missing_art_is_not_found() {
    let app = spawn_app().await;
    let critic = app.signed_up("vasari").await;
    let response = app
        .client
        .post(app.url("/comment/999"))
        .bearer_auth(&critic.access_token)
        .json(&json!({ "content": "Where is it?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_author_can_edit_or_delete_comment() {
    let app = spawn_app().await;
    let artist = app.signed_up("rembrandt").await;
    let critic = app.signed_up("vasari").await;
    let art_id = app.publish(&artist, "Night Watch").await["id"].as_i64().unwrap();
    let comment_id = comment(&app, &critic, art_id, "Too dark").await["id"]
        .as_i64()
        .unwrap();

    let response = app
        .client
        .patch(app.url(&format!("/comment/c/{comment_id}")))
        .bearer_auth(&artist.access_token)
        .json(&json!({ "content": "Perfectly lit" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .client
        .delete(app.url(&format!("/comment/c/{comment_id}")))
        .bearer_auth(&artist.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .client
        .patch(app.url(&format!("/comment/c/{comment_id}")))
        .bearer_auth(&critic.access_token)
        .json(&json!({ "content": "Dark, but fine" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["content"], "Dark, but fine");

    let response = app
        .client
        .delete(app.url(&format!("/comment/c/{comment_id}")))
        .bearer_auth(&critic.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = app
        .client
        .get(app.url(&format!("/comment/{art_id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn deleting_art_removes_its_comments() {
    let app = spawn_app().await;
    let artist = app.signed_up("rembrandt").await;
    let critic = app.signed_up("vasari").await;
    let art_id = app.publish(&artist, "Night Watch").await["id"].as_i64().unwrap();
    let comment_id = comment(&app, &critic, art_id, "Too dark").await["id"]
        .as_i64()
        .unwrap();

    let response = app
        .client
        .delete(app.url(&format!("/art/{art_id}")))
        .bearer_auth(&artist.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .client
        .patch(app.url(&format!("/comment/c/{comment_id}")))
        .bearer_auth(&critic.access_token)
        .json(&json!({ "content": "still here?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
