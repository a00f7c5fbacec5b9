mod identity;
mod session;
mod token;

pub use identity::*;
pub use session::*;
pub use token::*;
