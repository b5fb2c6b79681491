pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use auth::{AuthError, AuthGate};
pub use error::ApiError;
pub use handlers::AppState;
pub use server::{build_router, start, ServerConfig, ServerHandle};
