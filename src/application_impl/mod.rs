mod auth_service_impl;
mod key_pair;
mod token_codec_impl;

pub use auth_service_impl::*;
pub use key_pair::*;
pub use token_codec_impl::*;
