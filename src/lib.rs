//! Recipe Suggester backend
//!
//! Users photograph their fridge, an external model detects the ingredients
//! and an LLM turns the (optionally edited) ingredient list into a recipe.
//! Both steps run as asynchronous jobs that clients create and then poll.

pub mod app_state;
pub mod auth;
pub mod config;
pub mod db;
pub mod jobs;
pub mod models;
pub mod routes;
pub mod services;
