//! Global tracing setup. The subscriber starts with a bootstrap filter and is
//! re-filtered once settings are loaded. See `bin/logger_demo.rs`.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
