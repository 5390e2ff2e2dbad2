use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::not_blank;

/// A user's recipe. Jobs are scoped to one recipe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    pub id: i64,
    pub owner_id: String,
    pub title: String,
    /// File name of the uploaded fridge photo, relative to the upload directory.
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Default title of a freshly created recipe, e.g. `Recipe of 18/10/26 09:30`.
pub fn default_title(now: DateTime<Utc>) -> String {
    now.format("Recipe of %d/%m/%y %H:%M").to_string()
}

/// Longest title a recipe may carry, in characters.
pub const MAX_TITLE_CHARS: usize = 200;

/// Trim `raw` and cut it to [`MAX_TITLE_CHARS`] characters.
pub fn normalize_title(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(MAX_TITLE_CHARS) {
        Some((cut, _)) => trimmed[..cut].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

/// Recipe document returned by the generation engine, kept as the engine
/// wrote it.
///
/// Only the top-level shape is checked when the document is accepted (see
/// `services::recipe_generator::parse_recipe_document`). Ingredient lines and
/// times stay untyped so values like `"quantity_needed": "to taste"` survive
/// and the stored payload keeps the engine's key order and numbers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct GeneratedRecipe {
    document: Map<String, Value>,
}

impl GeneratedRecipe {
    pub(crate) fn from_checked(document: Map<String, Value>) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    pub fn title(&self) -> &str {
        self.document
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Replace the title in place; the key keeps its position.
    pub fn set_title(&mut self, title: &str) {
        self.document
            .insert("title".to_string(), Value::String(title.to_string()));
    }

    /// `name` of every ingredient line that has a string name.
    pub fn ingredient_names(&self) -> Vec<&str> {
        self.document
            .get("ingredients")
            .and_then(Value::as_array)
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(|line| line.get("name").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn step_count(&self) -> usize {
        self.document
            .get("procedure")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// Requested names with no matching ingredient line (case-insensitive).
    pub fn missing_ingredients<'a>(&self, requested: &'a [String]) -> Vec<&'a str> {
        let present = self.ingredient_names();
        requested
            .iter()
            .filter(|name| {
                !present
                    .iter()
                    .any(|line| line.trim().eq_ignore_ascii_case(name.trim()))
            })
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RenameRecipeRequest {
    #[garde(length(chars, min = 1, max = 200), custom(not_blank))]
    pub title: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AttachImageRequest {
    #[garde(length(min = 1, max = 255), custom(plain_file_name))]
    pub image: String,
}

fn plain_file_name(value: &str, _ctx: &()) -> garde::Result {
    if value.contains('/') || value.contains('\\') || value.starts_with('.') {
        return Err(garde::Error::new("image must be a plain file name"));
    }
    Ok(())
}
