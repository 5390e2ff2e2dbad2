pub mod executor;
pub mod ingredient_detector;
pub mod queue;
pub mod recipe_generator;
