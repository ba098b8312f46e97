pub mod auth;
pub mod response;

pub use auth::{resolve_session, session_auth, CurrentSession};
pub use response::{ApiResponse, ApiResult};
