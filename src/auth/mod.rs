// Authentication module
// Long/short token exchange and short token lifecycle

mod clock;
mod exchange;
mod manager;
mod types;

pub use clock::{Clock, SystemClock};
pub use manager::TokenManager;
pub use types::{
    Credential, LongToken, ShortToken, TokenPolicy, DEFAULT_LONG_TOKEN_TTL_SECONDS,
    DEFAULT_REFRESH_MARGIN_SECONDS,
};
