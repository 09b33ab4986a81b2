//! Payment provider implementations

#[cfg(feature = "stripe")]
pub mod stripe;

#[cfg(feature = "paygent")]
pub mod paygent;

#[cfg(feature = "stripe")]
pub use stripe::{StripeConfig, StripeGateway};

#[cfg(feature = "paygent")]
pub use paygent::{HttpsTelegramTransport, PaygentConfig, PaygentGateway, TelegramTransport};
