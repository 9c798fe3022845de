pub mod auth;
pub mod form;
pub mod listing;
pub mod order_api;
pub mod orchestrator;
pub mod wallet;

pub use auth::LoginState;
pub use form::{FieldPolicy, ShippingField, ShippingForm};
pub use listing::{ListingClient, ListingField, ListingForm};
pub use order_api::{OrderApiClient, RetryPolicy};
pub use orchestrator::{
    admission, CheckoutAction, CheckoutState, OrderOrchestrator, PAYMENT_IN_PROGRESS,
};
pub use wallet::{
    MockWalletProvider, ProviderEvent, SessionSubscription, TransferBehavior, TransferRequest,
    WalletProvider, WalletSessionManager,
};
