//! Integration tests for the wizard session endpoints.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{
    build_test_app, delete, expect_json, get, open_wizard, post, put_json, wizard_uri,
};
use storyboard_db::store::ProjectStore;

fn story() -> serde_json::Value {
    json!({
        "title": "Dawn",
        "synopsis": "A city wakes up.",
        "genre": "Drama",
        "duration": "5 min",
        "characters": "Ana",
        "setting": "Lisbon",
        "tone": "Quiet"
    })
}

// ---------------------------------------------------------------------------
// Open / close
// ---------------------------------------------------------------------------

#[tokio::test]
async fn open_starts_on_step_one_with_stored_blobs() {
    let app = build_test_app();
    let id = open_wizard(&app.router).await;

    let json = expect_json(get(&app.router, &wizard_uri(id, "")).await, StatusCode::OK).await;
    let data = &json["data"];
    assert_eq!(data["current_step"], 1);
    assert_eq!(data["project_name"], "Test");
    assert_eq!(data["draft"]["step1_data"], json!({}));
    assert_eq!(data["steps"][0]["title"], "Story Details");
    assert_eq!(data["steps"][0]["active"], true);
    assert_eq!(data["steps"][2]["reachable"], false);
    assert_eq!(
        data["missing_required"],
        json!(["title", "genre", "synopsis"])
    );
}

#[tokio::test]
async fn reopening_resumes_the_session() {
    let app = build_test_app();
    let id = open_wizard(&app.router).await;
    post(&app.router, &wizard_uri(id, "/next")).await;

    let json = expect_json(post(&app.router, &wizard_uri(id, "")).await, StatusCode::OK).await;
    assert_eq!(json["data"]["current_step"], 2);
}

#[tokio::test]
async fn open_unknown_project_is_404() {
    let app = build_test_app();
    let response = post(&app.router, &wizard_uri(uuid::Uuid::new_v4(), "")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn close_discards_the_draft() {
    let app = build_test_app();
    let id = open_wizard(&app.router).await;
    put_json(&app.router, &wizard_uri(id, "/story"), story()).await;

    let response = delete(&app.router, &wizard_uri(id, "")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let project = app.store.find_project(id).await.unwrap().unwrap();
    assert_eq!(project.step1_data, json!({}));
    let response = get(&app.router, &wizard_uri(id, "")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn next_and_previous_respect_the_ends() {
    let app = build_test_app();
    let id = open_wizard(&app.router).await;

    let response = post(&app.router, &wizard_uri(id, "/previous")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    for expected in [2, 3] {
        let json =
            expect_json(post(&app.router, &wizard_uri(id, "/next")).await, StatusCode::OK).await;
        assert_eq!(json["data"]["current_step"], expected);
    }

    let json = expect_json(
        post(&app.router, &wizard_uri(id, "/next")).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let json = expect_json(
        post(&app.router, &wizard_uri(id, "/previous")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["current_step"], 2);
}

#[tokio::test]
async fn step_indicator_allows_back_and_one_ahead() {
    let app = build_test_app();
    let id = open_wizard(&app.router).await;

    let response = post(&app.router, &wizard_uri(id, "/steps/3")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post(&app.router, &wizard_uri(id, "/steps/0")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = expect_json(
        post(&app.router, &wizard_uri(id, "/steps/2")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["current_step"], 2);

    let json = expect_json(
        post(&app.router, &wizard_uri(id, "/steps/3")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["current_step"], 3);

    let json = expect_json(
        post(&app.router, &wizard_uri(id, "/steps/1")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["current_step"], 1);
    assert_eq!(json["data"]["steps"][1]["reachable"], true);
}

#[tokio::test]
async fn navigation_without_session_is_404() {
    let app = build_test_app();
    let id = common::create_project(&app.router, "Closed").await;
    let response = post(&app.router, &wizard_uri(id, "/next")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Step data
// ---------------------------------------------------------------------------

#[tokio::test]
async fn story_update_replaces_step_one_blob() {
    let app = build_test_app();
    let id = open_wizard(&app.router).await;

    let json = expect_json(
        put_json(&app.router, &wizard_uri(id, "/story"), json!({ "title": "Dawn" })).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["story"]["genre"], "");
    assert_eq!(json["data"]["missing_required"], json!(["genre", "synopsis"]));

    let json = expect_json(get(&app.router, &wizard_uri(id, "")).await, StatusCode::OK).await;
    let step1 = &json["data"]["draft"]["step1_data"];
    assert_eq!(step1["title"], "Dawn");
    assert_eq!(step1.as_object().unwrap().len(), 7);
    assert_eq!(json["data"]["draft"]["step2_data"], json!({}));
}

#[tokio::test]
async fn story_update_off_step_one_is_rejected() {
    let app = build_test_app();
    let id = open_wizard(&app.router).await;
    post(&app.router, &wizard_uri(id, "/next")).await;

    let response = put_json(&app.router, &wizard_uri(id, "/story"), story()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn step_three_blob_must_be_an_object() {
    let app = build_test_app();
    let id = open_wizard(&app.router).await;
    post(&app.router, &wizard_uri(id, "/steps/2")).await;
    post(&app.router, &wizard_uri(id, "/steps/3")).await;

    let response = put_json(&app.router, &wizard_uri(id, "/step3"), json!([1, 2])).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = expect_json(
        put_json(&app.router, &wizard_uri(id, "/step3"), json!({ "viewed": true })).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["draft"]["step3_data"], json!({ "viewed": true }));
}

// ---------------------------------------------------------------------------
// Finalize
// ---------------------------------------------------------------------------

#[tokio::test]
async fn finalize_only_from_last_step() {
    let app = build_test_app();
    let id = open_wizard(&app.router).await;

    let response = post(&app.router, &wizard_uri(id, "/finalize")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let project = app.store.find_project(id).await.unwrap().unwrap();
    assert_eq!(project.step1_data, json!({}));
}

#[tokio::test]
async fn finalize_writes_all_three_blobs_and_closes() {
    let app = build_test_app();
    let id = open_wizard(&app.router).await;
    let before = app.store.find_project(id).await.unwrap().unwrap();

    put_json(&app.router, &wizard_uri(id, "/story"), story()).await;
    post(&app.router, &wizard_uri(id, "/next")).await;
    post(&app.router, &wizard_uri(id, "/next")).await;
    put_json(&app.router, &wizard_uri(id, "/step3"), json!({ "viewed": true })).await;

    let json = expect_json(
        post(&app.router, &wizard_uri(id, "/finalize")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["step1_data"]["title"], "Dawn");
    assert_eq!(json["data"]["step2_data"]["scenes"][0]["scene_number"], 1);
    assert_eq!(json["data"]["step3_data"], json!({ "viewed": true }));

    let after = app.store.find_project(id).await.unwrap().unwrap();
    assert_eq!(after.step1_data["genre"], "Drama");
    assert!(after.updated_at > before.updated_at);

    let response = get(&app.router, &wizard_uri(id, "")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_finalize_keeps_session_on_last_step() {
    let app = build_test_app();
    let id = open_wizard(&app.router).await;
    put_json(&app.router, &wizard_uri(id, "/story"), story()).await;
    post(&app.router, &wizard_uri(id, "/next")).await;
    post(&app.router, &wizard_uri(id, "/next")).await;

    app.store.set_failing_project_updates(true).await;
    let response = post(&app.router, &wizard_uri(id, "/finalize")).await;
    assert!(response.status().is_server_error());

    let json = expect_json(get(&app.router, &wizard_uri(id, "")).await, StatusCode::OK).await;
    assert_eq!(json["data"]["current_step"], 3);
    assert_eq!(json["data"]["draft"]["step1_data"]["title"], "Dawn");

    app.store.set_failing_project_updates(false).await;
    let response = post(&app.router, &wizard_uri(id, "/finalize")).await;
    assert_eq!(response.status(), StatusCode::OK);
}
