use crate::{
    context::AppContext,
    error::CheckoutError,
    models::ApiResponse,
    services::{ListingField, ListingForm},
};
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use ethers::types::Address;
use serde::{Deserialize, Serialize};

pub const FAILED_LISTING_PATH: &str = "/failedlisting";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub wallet_address: Address,
}

/// Stores the token issued by the marketplace auth service.
pub async fn log_in(
    State(ctx): State<AppContext>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, CheckoutError> {
    let wallet_address = ctx.login.log_in(request.token)?;
    Ok(Json(ApiResponse::ok(LoginResponse { wallet_address })))
}

pub async fn log_out(State(ctx): State<AppContext>) -> Redirect {
    ctx.login.log_out();
    Redirect::to("/")
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SellFormView {
    pub seller: Address,
    pub fields: Vec<ListingField>,
}

pub async fn sell_form(State(ctx): State<AppContext>) -> Response {
    match ctx.login.seller() {
        Ok(seller) => Json(ApiResponse::ok(SellFormView {
            seller,
            fields: ListingField::ALL.to_vec(),
        }))
        .into_response(),
        Err(_) => Redirect::to("/401").into_response(),
    }
}

/// Lists the item and redirects to its page, or to the failure page.
pub async fn submit_listing(
    State(ctx): State<AppContext>,
    Json(form): Json<ListingForm>,
) -> Result<Response, CheckoutError> {
    let Ok(seller) = ctx.login.seller() else {
        return Ok(Redirect::to("/401").into_response());
    };

    let listing = form.into_listing(seller)?;

    match ctx.listings.create_listing(&listing).await {
        Ok(created) => Ok(Redirect::to(&format!("/items/{}", created.id)).into_response()),
        Err(e) => {
            tracing::warn!("Listing failed: {}", e);
            Ok(Redirect::to(FAILED_LISTING_PATH).into_response())
        }
    }
}
