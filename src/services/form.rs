use crate::{error::CheckoutError, models::ShippingAddress};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Whether checkout requires every shipping field before paying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldPolicy {
    #[default]
    Optional,
    Required,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShippingField {
    FirstName,
    LastName,
    EmailAddress,
    Country,
    StreetAddress,
    City,
    State,
    PostalCode,
}

impl ShippingField {
    pub const ALL: [ShippingField; 8] = [
        ShippingField::FirstName,
        ShippingField::LastName,
        ShippingField::EmailAddress,
        ShippingField::Country,
        ShippingField::StreetAddress,
        ShippingField::City,
        ShippingField::State,
        ShippingField::PostalCode,
    ];

    /// Name of the form input.
    pub fn input_name(&self) -> &'static str {
        match self {
            ShippingField::FirstName => "first-name",
            ShippingField::LastName => "last-name",
            ShippingField::EmailAddress => "email-address",
            ShippingField::Country => "country",
            ShippingField::StreetAddress => "street-address",
            ShippingField::City => "city",
            ShippingField::State => "region",
            ShippingField::PostalCode => "postal-code",
        }
    }
}

impl FromStr for ShippingField {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShippingField::ALL
            .into_iter()
            .find(|field| field.input_name() == s)
            .ok_or_else(|| CheckoutError::Validation(vec![format!("unknown field: {}", s)]))
    }
}

/// Countries offered by the country selector; the first one is preselected.
pub const COUNTRIES: [&str; 3] = ["United States", "Canada", "Mexico"];

/// Holds the shipping inputs as the user edits them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingForm {
    values: ShippingAddress,
}

impl Default for ShippingForm {
    fn default() -> Self {
        Self::new()
    }
}

impl ShippingForm {
    pub fn new() -> Self {
        Self {
            values: ShippingAddress {
                country: COUNTRIES[0].to_string(),
                ..ShippingAddress::default()
            },
        }
    }

    /// Records a change or blur event for one input.
    pub fn set(&mut self, field: ShippingField, value: impl Into<String>) {
        let value = value.into();
        let slot = match field {
            ShippingField::FirstName => &mut self.values.first_name,
            ShippingField::LastName => &mut self.values.last_name,
            ShippingField::EmailAddress => &mut self.values.email_address,
            ShippingField::Country => &mut self.values.country,
            ShippingField::StreetAddress => &mut self.values.street_address,
            ShippingField::City => &mut self.values.city,
            ShippingField::State => &mut self.values.state,
            ShippingField::PostalCode => &mut self.values.postal_code,
        };
        *slot = value;
    }

    pub fn get(&self, field: ShippingField) -> &str {
        match field {
            ShippingField::FirstName => &self.values.first_name,
            ShippingField::LastName => &self.values.last_name,
            ShippingField::EmailAddress => &self.values.email_address,
            ShippingField::Country => &self.values.country,
            ShippingField::StreetAddress => &self.values.street_address,
            ShippingField::City => &self.values.city,
            ShippingField::State => &self.values.state,
            ShippingField::PostalCode => &self.values.postal_code,
        }
    }

    /// Current values, without any validation.
    pub fn snapshot(&self) -> ShippingAddress {
        self.values.clone()
    }

    /// Snapshot admitted under `policy`.
    pub fn submit(&self, policy: FieldPolicy) -> Result<ShippingAddress, CheckoutError> {
        if policy == FieldPolicy::Required {
            let missing: Vec<String> = ShippingField::ALL
                .into_iter()
                .filter(|field| self.get(*field).trim().is_empty())
                .map(|field| field.input_name().to_string())
                .collect();
            if !missing.is_empty() {
                return Err(CheckoutError::Validation(missing));
            }
        }
        Ok(self.snapshot())
    }
}
