mod auth_service;
mod client_error;

pub use auth_service::*;
pub use client_error::*;
