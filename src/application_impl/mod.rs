mod api_client;
mod auth_service_impl;
mod refresh_coordinator;
mod request_executor;
mod session;
mod session_cookie;

pub use api_client::*;
pub use auth_service_impl::*;
pub use refresh_coordinator::*;
pub use request_executor::*;
pub use session::*;
pub use session_cookie::*;
