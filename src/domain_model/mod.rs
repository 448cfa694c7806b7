mod request;
mod session;

pub use request::*;
pub use session::*;
