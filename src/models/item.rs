use chrono::{DateTime, Utc};
use ethers::types::{Address, H160};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Seller of the item offered on the checkout page.
pub const CHECKOUT_SELLER: Address = H160([
    0x78, 0xbc, 0xa4, 0x37, 0xe8, 0xd6, 0xc9, 0x61, 0xa1, 0xf1, 0xf7, 0xd9, 0x7c, 0x81, 0x78,
    0x10, 0x44, 0x19, 0x5b, 0xcf,
]);

/// A marketplace listing. Prices are in native currency units (ETH).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub seller: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_end_date: Option<DateTime<Utc>>,
}

impl Item {
    /// The item sold on the checkout page. There is no catalog lookup.
    pub fn checkout_item() -> Self {
        Self {
            id: Some("0xtest".to_string()),
            name: "Book of Spells".to_string(),
            description: "Lets you conquer the universe".to_string(),
            price: Decimal::new(1, 1),
            seller: CHECKOUT_SELLER,
            image: None,
            quantity: None,
            listing_start_date: None,
            listing_end_date: None,
        }
    }

    pub fn item_id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn checkout_seller_matches_listing_address() {
        let expected = Address::from_str("0x78bCA437E8D6c961a1F1F7D97c81781044195bcF").unwrap();
        assert_eq!(CHECKOUT_SELLER, expected);
    }

    #[test]
    fn price_serializes_as_number() {
        let json = serde_json::to_value(Item::checkout_item()).unwrap();
        assert_eq!(json["price"], serde_json::json!(0.1));
        assert_eq!(json["_id"], "0xtest");
        assert!(json.get("image").is_none());
    }
}
