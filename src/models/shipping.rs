use serde::{Deserialize, Serialize};

/// Free-form shipping details captured on the checkout page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub first_name: String,
    pub last_name: String,
    pub email_address: String,
    pub country: String,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}
