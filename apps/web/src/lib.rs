//! # tessera
//!
//! Browser front-end for local language models: pick a model file and a prompt
//! pattern, type, and read the completion. The last settings are remembered per
//! browser session.

pub mod app_state;
pub mod config;
pub mod error;
pub mod model;
pub mod paths;
pub mod plugin;
pub mod routes;
pub mod view;

pub use app_state::AppState;
pub use config::Config;
pub use error::WebError;
pub use routes::{SESSION_COOKIE, create_router, run_server};
