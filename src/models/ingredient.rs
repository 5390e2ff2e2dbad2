use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::models::not_blank;

/// One ingredient recognised in a fridge photo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct DetectedIngredient {
    #[garde(length(chars, min = 1, max = 100), custom(not_blank))]
    pub name: String,

    #[garde(range(min = 0.0, max = 1.0))]
    pub confidence: f64,
}

impl DetectedIngredient {
    pub fn new(name: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            confidence,
        }
    }
}

/// Result payload of a detection job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct DetectionResult {
    #[garde(dive)]
    pub ingredients: Vec<DetectedIngredient>,
}

impl DetectionResult {
    pub fn names(&self) -> Vec<String> {
        self.ingredients.iter().map(|i| i.name.clone()).collect()
    }
}
