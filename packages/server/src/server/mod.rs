// HTTP server setup (Axum)
pub mod api_error;
pub mod app;
pub mod middleware;
pub mod routes;

pub use api_error::*;
pub use app::*;
