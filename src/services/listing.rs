use crate::{
    error::CheckoutError,
    models::{ListingCreated, NewListing},
};
use ethers::types::Address;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Up to six integer digits with two decimals, or up to two with four.
static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{0,6}(\.\d{1,2})?$|^\d{0,2}(\.\d{1,4})?$").expect("Invalid regex")
});

pub fn price_is_valid(price: &str) -> bool {
    PRICE_RE.is_match(price)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingField {
    Name,
    Description,
    Image,
    Price,
}

impl ListingField {
    pub const ALL: [ListingField; 4] = [
        ListingField::Name,
        ListingField::Description,
        ListingField::Image,
        ListingField::Price,
    ];

    /// Message shown when the input is left empty.
    pub fn empty_message(&self) -> &'static str {
        match self {
            ListingField::Name => "Please enter listing title",
            ListingField::Description => "Please enter listing description",
            ListingField::Image => "Please enter listing image",
            ListingField::Price => "Please enter listing price",
        }
    }
}

pub const PRICE_FORMAT_MESSAGE: &str = "Please enter price in numbers";

/// Inputs of the "List Item" form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub price: String,
}

impl ListingForm {
    fn value(&self, field: ListingField) -> &str {
        match field {
            ListingField::Name => &self.name,
            ListingField::Description => &self.description,
            ListingField::Image => &self.image,
            ListingField::Price => &self.price,
        }
    }

    /// Message for a blurred input, if it was left empty.
    pub fn blur(&self, field: ListingField) -> Option<&'static str> {
        self.value(field)
            .is_empty()
            .then(|| field.empty_message())
    }

    /// Every message the form currently shows.
    pub fn messages(&self) -> Vec<&'static str> {
        let mut messages: Vec<&'static str> = ListingField::ALL
            .iter()
            .filter_map(|field| self.blur(*field))
            .collect();
        if !price_is_valid(&self.price) {
            messages.push(PRICE_FORMAT_MESSAGE);
        }
        messages
    }

    /// Builds the listing body once every input is filled and the price parses.
    pub fn into_listing(self, seller: Address) -> Result<NewListing, CheckoutError> {
        let messages = self.messages();
        if !messages.is_empty() {
            return Err(CheckoutError::Validation(
                messages.into_iter().map(str::to_string).collect(),
            ));
        }
        Ok(NewListing {
            name: self.name,
            description: self.description,
            image: self.image,
            price: self.price,
            seller,
        })
    }
}

/// Client for the listing endpoint of the marketplace API.
#[derive(Clone)]
pub struct ListingClient {
    client: Client,
    base_url: String,
}

impl ListingClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn create_listing(
        &self,
        listing: &NewListing,
    ) -> Result<ListingCreated, CheckoutError> {
        let response = self
            .client
            .post(format!("{}/items", self.base_url))
            .json(listing)
            .send()
            .await
            .map_err(|e| CheckoutError::ListingFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CheckoutError::ListingFailed(format!(
                "listing API returned {}",
                status
            )));
        }

        let created: ListingCreated = response
            .json()
            .await
            .map_err(|e| CheckoutError::ListingFailed(e.to_string()))?;

        tracing::info!(item_id = %created.id, seller = ?listing.seller, "Item listed");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> ListingForm {
        ListingForm {
            name: "Wand".into(),
            description: "Slightly used".into(),
            image: "https://img.example/wand.png".into(),
            price: "1.25".into(),
        }
    }

    #[test]
    fn price_pattern() {
        for ok in ["1", "123456", "123456.78", "12.3456", ".5", "0.1"] {
            assert!(price_is_valid(ok), "{ok} should be accepted");
        }
        for bad in ["1234567", "123.456", "abc", "1,5", "-1", "1.23456"] {
            assert!(!price_is_valid(bad), "{bad} should be rejected");
        }
    }

    #[test]
    fn blur_flags_empty_inputs() {
        let form = ListingForm {
            name: String::new(),
            ..filled()
        };
        assert_eq!(form.blur(ListingField::Name), Some("Please enter listing title"));
        assert_eq!(form.blur(ListingField::Price), None);
    }

    #[test]
    fn complete_form_becomes_listing() {
        let seller = Address::repeat_byte(0x07);
        let listing = filled().into_listing(seller).unwrap();
        assert_eq!(listing.price, "1.25");
        assert_eq!(listing.seller, seller);
    }

    #[test]
    fn bad_price_blocks_submission() {
        let form = ListingForm {
            price: "ten".into(),
            ..filled()
        };
        match form.into_listing(Address::zero()) {
            Err(CheckoutError::Validation(messages)) => {
                assert_eq!(messages, vec![PRICE_FORMAT_MESSAGE.to_string()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
