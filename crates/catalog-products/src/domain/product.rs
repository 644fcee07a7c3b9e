//! The `Product` entity.

use catalog_core::clock::Clock;
use catalog_core::entity::{Entity, EntityMeta};
use catalog_core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Longest accepted product name, in characters.
pub const NAME_MAX_LENGTH: usize = 100;

/// Smallest accepted unit price.
pub const UNIT_PRICE_MIN: f64 = 0.01;

/// A sellable product.
///
/// Name and price are validated by the constructor, by each mutator, and on
/// deserialization, so an invalid product cannot be materialized from
/// storage either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ProductData")]
pub struct Product {
    #[serde(flatten)]
    meta: EntityMeta,
    name: String,
    unit_price: f64,
}

/// Unvalidated wire shape of a product snapshot.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductData {
    #[serde(flatten)]
    meta: EntityMeta,
    name: String,
    unit_price: f64,
}

impl TryFrom<ProductData> for Product {
    type Error = DomainError;

    fn try_from(data: ProductData) -> Result<Self, Self::Error> {
        Ok(Self {
            meta: data.meta,
            name: validate_name(&data.name)?,
            unit_price: validate_unit_price(data.unit_price)?,
        })
    }
}

fn validate_name(name: &str) -> Result<String, DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::Validation(
            "product name must not be empty".into(),
        ));
    }
    // Length counts surrounding whitespace; the name is stored as given.
    if name.chars().count() > NAME_MAX_LENGTH {
        return Err(DomainError::Validation(format!(
            "product name must be at most {NAME_MAX_LENGTH} characters"
        )));
    }
    Ok(name.to_owned())
}

fn validate_unit_price(unit_price: f64) -> Result<f64, DomainError> {
    if unit_price.is_finite() && unit_price >= UNIT_PRICE_MIN {
        Ok(unit_price)
    } else {
        Err(DomainError::Validation(format!(
            "unit price must be at least {UNIT_PRICE_MIN}"
        )))
    }
}

impl Product {
    /// Creates a product with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the name is blank or too long,
    /// or the price is below the minimum.
    pub fn new(name: &str, unit_price: f64, clock: &dyn Clock) -> Result<Self, DomainError> {
        let name = validate_name(name)?;
        let unit_price = validate_unit_price(unit_price)?;
        Ok(Self {
            meta: EntityMeta::new(clock),
            name,
            unit_price,
        })
    }

    /// Returns the product name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the unit price.
    #[must_use]
    pub fn unit_price(&self) -> f64 {
        self.unit_price
    }

    /// Renames the product. Leaves it unchanged on error.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the name is blank or too long.
    pub fn change_name(&mut self, name: &str) -> Result<(), DomainError> {
        self.name = validate_name(name)?;
        Ok(())
    }

    /// Reprices the product. Leaves it unchanged on error.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the price is below the minimum.
    pub fn change_unit_price(&mut self, unit_price: f64) -> Result<(), DomainError> {
        self.unit_price = validate_unit_price(unit_price)?;
        Ok(())
    }
}

impl Entity for Product {
    const ENTITY_NAME: &'static str = "Product";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }
}
