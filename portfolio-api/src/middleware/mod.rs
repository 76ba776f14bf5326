pub mod cors;
pub mod json_errors;

pub use cors::cors_layer;
pub use json_errors::json_method_not_allowed;
