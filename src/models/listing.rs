use ethers::types::Address;
use serde::{Deserialize, Serialize};

/// Body of `POST /items`. The price is sent exactly as the seller typed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewListing {
    pub name: String,
    pub description: String,
    pub image: String,
    pub price: String,
    pub seller: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingCreated {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}
