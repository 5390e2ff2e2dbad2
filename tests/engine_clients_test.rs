//! Engine clients against fake detection and LLM services served locally.

mod helpers;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use helpers::*;
use serde_json::{json, Value};
use std::time::Duration;

use recipe_suggester::services::{
    ingredient_detector::{DetectionError, HttpDetectionClient, IngredientDetector},
    recipe_generator::{GenerationError, OpenAiRecipeClient, RecipeGenerator},
};

async fn detection_service(reply: (StatusCode, Value)) -> String {
    let router = Router::new().route(
        "/predict",
        post(move |Json(body): Json<Value>| async move {
            if body["image_path"] != "uploads/fridge.jpg" {
                return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": "bad path" })));
            }
            (reply.0, Json(reply.1))
        }),
    );
    serve(router).await
}

fn detector(base_url: &str) -> HttpDetectionClient {
    HttpDetectionClient::new(base_url, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn detection_client_returns_ingredients() {
    let base_url = detection_service((
        StatusCode::OK,
        json!({
            "ingredients": [
                { "name": "Tomato", "confidence": 0.95 },
                { "name": "Lettuce", "confidence": 0.87 }
            ],
            "count": 2
        }),
    ))
    .await;

    let ingredients = detector(&base_url).detect("uploads/fridge.jpg").await.unwrap();
    let names: Vec<&str> = ingredients.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Tomato", "Lettuce"]);
}

#[tokio::test]
async fn detection_client_maps_service_errors() {
    let base_url = detection_service((StatusCode::NOT_FOUND, json!({ "detail": "Image not found" }))).await;
    let err = detector(&base_url).detect("uploads/fridge.jpg").await.unwrap_err();
    assert!(matches!(err, DetectionError::NotFound(_)));

    let base_url = detection_service((StatusCode::INTERNAL_SERVER_ERROR, json!({ "detail": "boom" }))).await;
    let err = detector(&base_url).detect("uploads/fridge.jpg").await.unwrap_err();
    assert!(matches!(err, DetectionError::Status(500, _)));

    let base_url = detection_service((
        StatusCode::OK,
        json!({ "ingredients": [{ "name": "Tomato", "confidence": 0.9 }], "count": 3 }),
    ))
    .await;
    let err = detector(&base_url).detect("uploads/fridge.jpg").await.unwrap_err();
    assert!(matches!(err, DetectionError::Parse(_)));
}

#[tokio::test]
async fn detection_client_times_out() {
    let router = Router::new().route(
        "/predict",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({ "ingredients": [], "count": 0 }))
        }),
    );
    let base_url = serve(router).await;

    let client = HttpDetectionClient::new(&base_url, Duration::from_millis(200)).unwrap();
    let err = client.detect("uploads/fridge.jpg").await.unwrap_err();
    assert!(matches!(err, DetectionError::Timeout));
}

async fn llm_service(status: StatusCode, reply: Value) -> String {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(move |headers: HeaderMap, Json(body): Json<Value>| async move {
            let authorized = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                == Some("Bearer test-key");
            if !authorized || body["model"] != "test-model" {
                return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" })));
            }
            (status, Json(reply))
        }),
    );
    serve(router).await
}

fn chat_reply(content: &str) -> Value {
    json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
}

fn generator(base_url: &str) -> OpenAiRecipeClient {
    OpenAiRecipeClient::new(
        &format!("{}/v1", base_url),
        "test-key",
        "test-model",
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn generation_client_parses_fenced_documents() {
    let document = recipe_document("Tomato Bruschetta", &["Tomato", "Bread"]);
    let base_url = llm_service(StatusCode::OK, chat_reply(&format!("```json\n{}\n```", document))).await;

    let recipe = generator(&base_url)
        .generate(&strings(&["Tomato", "Bread"]))
        .await
        .unwrap();
    assert_eq!(recipe.title(), "Tomato Bruschetta");
    assert_eq!(recipe.step_count(), 2);
    assert_eq!(serde_json::to_string(&recipe).unwrap(), document);
}

#[tokio::test]
async fn generation_client_accepts_loosely_typed_lines() {
    let content = r#"{"title":"Garlic Bread","difficulty":"Easy","preparation_time":"5","cooking_time":10,"ingredients":[{"name":"Bread","quantity_needed":1,"unit":"loaf"},{"name":"Garlic","quantity_needed":"to taste","unit":null}],"procedure":["Rub","Toast"]}"#;
    let base_url = llm_service(StatusCode::OK, chat_reply(content)).await;

    let recipe = generator(&base_url)
        .generate(&strings(&["Bread", "Garlic"]))
        .await
        .unwrap();
    assert!(recipe.missing_ingredients(&strings(&["Bread", "Garlic"])).is_empty());
    assert_eq!(serde_json::to_string(&recipe).unwrap(), content);
}

#[tokio::test]
async fn generation_client_rejects_incomplete_documents() {
    let content = json!({
        "title": "Soup",
        "difficulty": "Easy",
        "preparation_time": 5,
        "cooking_time": 20,
        "ingredients": []
    })
    .to_string();
    let base_url = llm_service(StatusCode::OK, chat_reply(&content)).await;

    let err = generator(&base_url)
        .generate(&strings(&["Carrot"]))
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::MissingField("procedure")));
}

#[tokio::test]
async fn generation_client_maps_api_errors() {
    let base_url = llm_service(StatusCode::TOO_MANY_REQUESTS, json!({ "error": "rate limited" })).await;
    let err = generator(&base_url)
        .generate(&strings(&["Carrot"]))
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Status(429, _)));

    let base_url = llm_service(StatusCode::OK, json!({ "choices": [] })).await;
    let err = generator(&base_url)
        .generate(&strings(&["Carrot"]))
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::EmptyResponse));

    let err = generator(&base_url).generate(&[]).await.unwrap_err();
    assert!(matches!(err, GenerationError::EmptyIngredients));
}
