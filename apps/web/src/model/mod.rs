mod list;

pub use list::{ALLOWED_MODEL_EXTS, ModelEntry, list_available_models};
