//! Bootstrap logging to stderr, reloaded once settings are known.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
