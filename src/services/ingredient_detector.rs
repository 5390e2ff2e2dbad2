use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::ingredient::DetectedIngredient;

/// Ingredient-detection engine. Given an image reference, returns what it saw.
#[async_trait]
pub trait IngredientDetector: Send + Sync {
    async fn detect(&self, image_reference: &str) -> Result<Vec<DetectedIngredient>, DetectionError>;
}

/// Client for the detection microservice (`POST /predict`).
pub struct HttpDetectionClient {
    http: Client,
    predict_url: String,
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    image_path: &'a str,
}

#[derive(Deserialize)]
struct PredictResponse {
    ingredients: Vec<DetectedIngredient>,
    count: usize,
}

impl HttpDetectionClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DetectionError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DetectionError::Http)?;

        Ok(Self {
            http,
            predict_url: format!("{}/predict", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl IngredientDetector for HttpDetectionClient {
    async fn detect(&self, image_reference: &str) -> Result<Vec<DetectedIngredient>, DetectionError> {
        let response = self
            .http
            .post(&self.predict_url)
            .json(&PredictRequest {
                image_path: image_reference,
            })
            .send()
            .await
            .map_err(DetectionError::from_transport)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(DetectionError::from_transport)?;

        match status {
            s if s.is_success() => parse_detection_response(&body),
            StatusCode::NOT_FOUND => Err(DetectionError::NotFound(body)),
            s => Err(DetectionError::Status(s.as_u16(), body)),
        }
    }
}

/// Parse and sanity-check a `/predict` response body.
pub fn parse_detection_response(body: &str) -> Result<Vec<DetectedIngredient>, DetectionError> {
    let response: PredictResponse =
        serde_json::from_str(body).map_err(|e| DetectionError::Parse(e.to_string()))?;

    if response.count != response.ingredients.len() {
        return Err(DetectionError::Parse(format!(
            "count {} does not match {} ingredients",
            response.count,
            response.ingredients.len()
        )));
    }

    for ingredient in &response.ingredients {
        if ingredient.name.trim().is_empty() {
            return Err(DetectionError::Parse("ingredient with empty name".to_string()));
        }
        if !(0.0..=1.0).contains(&ingredient.confidence) {
            return Err(DetectionError::Parse(format!(
                "confidence {} for '{}' outside [0, 1]",
                ingredient.confidence, ingredient.name
            )));
        }
    }

    Ok(response.ingredients)
}

#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("Image not found by detection service: {0}")]
    NotFound(String),

    #[error("Detection request timed out")]
    Timeout,

    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Detection service returned {0}: {1}")]
    Status(u16, String),

    #[error("Malformed detection response: {0}")]
    Parse(String),
}

impl DetectionError {
    fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DetectionError::Timeout
        } else {
            DetectionError::Http(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_predict_response() {
        let body = r#"{"ingredients":[{"name":"Tomato","confidence":0.95},{"name":"Lettuce","confidence":0.87}],"count":2}"#;
        let ingredients = parse_detection_response(body).unwrap();
        assert_eq!(ingredients.len(), 2);
        assert_eq!(ingredients[0], DetectedIngredient::new("Tomato", 0.95));
    }

    #[test]
    fn rejects_count_mismatch() {
        let body = r#"{"ingredients":[{"name":"Tomato","confidence":0.95}],"count":3}"#;
        assert!(matches!(
            parse_detection_response(body),
            Err(DetectionError::Parse(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let body = r#"{"ingredients":[{"name":"Tomato","confidence":1.5}],"count":1}"#;
        assert!(matches!(
            parse_detection_response(body),
            Err(DetectionError::Parse(_))
        ));
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(
            parse_detection_response("<html>bad gateway</html>"),
            Err(DetectionError::Parse(_))
        ));
    }

    #[test]
    fn accepts_empty_detection() {
        let ingredients = parse_detection_response(r#"{"ingredients":[],"count":0}"#).unwrap();
        assert!(ingredients.is_empty());
    }
}
