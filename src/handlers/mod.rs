pub mod checkout;
pub mod home;
pub mod sell;
pub mod unauthorized;

pub use checkout::*;
pub use home::*;
pub use sell::*;
pub use unauthorized::*;

use crate::context::AppContext;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/favourites", get(favourites))
        .route("/checkout", get(checkout_view))
        .route("/checkout/connect", post(connect_wallet))
        .route("/checkout/network", post(switch_network))
        .route("/checkout/shipping", post(update_shipping))
        .route("/checkout/confirm", post(confirm_payment))
        .route("/payment", get(payment_result))
        .route("/sell", get(sell_form).post(submit_listing))
        .route("/listitem", get(sell_form).post(submit_listing))
        .route("/session", post(log_in).delete(log_out))
        .route("/401", get(unauthorized))
        .with_state(ctx)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::default().include_headers(true)),
                )
                .layer(CorsLayer::permissive()),
        )
}
