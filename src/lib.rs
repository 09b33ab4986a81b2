// Paygate - provider-agnostic card payments for Rust
//
// This library wraps payment providers behind one gateway interface with
// pre-flight validation, deadlines and cancellation.

// Re-export core functionality
pub use paygate_payments::*;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        AuthorizeParams,
        CancellationToken,
        CaptureParams,
        CompleteAuthorizeParams,
        CreateCreditCardParams,
        CreditCard,
        Currency,
        DeleteCreditCardParams,
        Gateway,
        GatewayError,
        GatewayResult,
        GetCreditCardParams,
        ListCreditCardsParams,
        Merchant,
        MerchantConfig,
        Params,
        PaymentMethod,
        RefundParams,
        SavedCreditCard,
        ThreeDSecureParams,
        Transaction,
        VoidParams,
    };

    #[cfg(feature = "paygent")]
    pub use crate::providers::{PaygentConfig, PaygentGateway};
    #[cfg(feature = "stripe")]
    pub use crate::providers::{StripeConfig, StripeGateway};
}
