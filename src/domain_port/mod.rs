mod directory;
mod session_store;

pub use directory::*;
pub use session_store::*;
