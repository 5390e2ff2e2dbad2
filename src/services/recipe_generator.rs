use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::models::recipe::GeneratedRecipe;

/// Top-level keys a generated document must carry.
pub const REQUIRED_FIELDS: [&str; 6] = [
    "title",
    "difficulty",
    "preparation_time",
    "cooking_time",
    "ingredients",
    "procedure",
];

const SYSTEM_PROMPT: &str = "You are a professional chef assistant that creates recipes in JSON format. \
Always return valid JSON only, with no additional text or markdown formatting.";

/// Recipe-generation engine. Given ingredient names, returns a recipe document.
#[async_trait]
pub trait RecipeGenerator: Send + Sync {
    async fn generate(&self, ingredients: &[String]) -> Result<GeneratedRecipe, GenerationError>;
}

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiRecipeClient {
    http: Client,
    completions_url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiRecipeClient {
    pub fn new(
        api_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GenerationError::Http)?;

        Ok(Self {
            http,
            completions_url: format!("{}/chat/completions", api_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl RecipeGenerator for OpenAiRecipeClient {
    async fn generate(&self, ingredients: &[String]) -> Result<GeneratedRecipe, GenerationError> {
        if ingredients.is_empty() {
            return Err(GenerationError::EmptyIngredients);
        }

        let request_body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": recipe_prompt(ingredients) }
            ],
            "temperature": 0.7,
            "max_tokens": 2000,
            "response_format": { "type": "json_object" }
        });

        let response = self
            .http
            .post(&self.completions_url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(GenerationError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status(status.as_u16(), body));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(GenerationError::from_transport)?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(GenerationError::EmptyResponse)?;

        parse_recipe_document(&content)
    }
}

/// User prompt asking for a recipe covering every supplied ingredient.
pub fn recipe_prompt(ingredients: &[String]) -> String {
    format!(
        r#"You are a professional chef assistant. Given the following ingredients, create a delicious and feasible recipe.

Ingredients available: {}

Create a recipe using these ingredients. You can suggest additional common pantry items if needed (like salt, pepper, olive oil, water).

Return ONLY a valid JSON object with this exact structure:
{{
  "title": "Creative and appetizing recipe name",
  "difficulty": "Easy|Medium|Hard",
  "preparation_time": <minutes as integer>,
  "cooking_time": <minutes as integer>,
  "ingredients": [
    {{
      "name": "ingredient name",
      "quantity_needed": <number>,
      "unit": "gr|ml|pieces|tbsp|tsp|cups|etc"
    }}
  ],
  "procedure": [
    "Step 1 description",
    "Step 2 description"
  ]
}}

Important:
- Create an appealing and descriptive title for the recipe
- Include ALL ingredients from the list above in your recipe
- Include realistic quantities and appropriate units
- preparation_time is for prep work (cutting, mixing, etc.)
- cooking_time is for actual cooking/baking time
- Return ONLY the JSON, no additional text"#,
        ingredients.join(", ")
    )
}

/// Parse the model's message content into a recipe document.
///
/// Tolerates a surrounding markdown code fence. Every key in
/// [`REQUIRED_FIELDS`] must be present, the title must be a non-blank string
/// and `ingredients` and `procedure` must be arrays. Everything else is kept
/// exactly as the engine wrote it.
pub fn parse_recipe_document(content: &str) -> Result<GeneratedRecipe, GenerationError> {
    let value: Value =
        serde_json::from_str(strip_code_fence(content)).map_err(GenerationError::Parse)?;

    let Value::Object(document) = value else {
        return Err(GenerationError::InvalidField(
            "document is not a JSON object".to_string(),
        ));
    };

    if let Some(missing) = REQUIRED_FIELDS
        .iter()
        .copied()
        .find(|f| !document.contains_key(*f))
    {
        return Err(GenerationError::MissingField(missing));
    }

    match document.get("title").and_then(Value::as_str) {
        Some(title) if !title.trim().is_empty() => {}
        Some(_) => return Err(GenerationError::InvalidField("title is blank".to_string())),
        None => {
            return Err(GenerationError::InvalidField(
                "title is not a string".to_string(),
            ))
        }
    }
    for field in ["ingredients", "procedure"] {
        if !document.get(field).is_some_and(Value::is_array) {
            return Err(GenerationError::InvalidField(format!("{field} is not a list")));
        }
    }

    Ok(GeneratedRecipe::from_checked(document))
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("No ingredients to generate a recipe from")]
    EmptyIngredients,

    #[error("Generation request timed out")]
    Timeout,

    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("LLM returned {0}: {1}")]
    Status(u16, String),

    #[error("LLM returned no message content")]
    EmptyResponse,

    #[error("Failed to parse recipe document: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("Recipe document is missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid recipe document: {0}")]
    InvalidField(String),
}

impl GenerationError {
    fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GenerationError::Timeout
        } else {
            GenerationError::Http(err)
        }
    }
}
