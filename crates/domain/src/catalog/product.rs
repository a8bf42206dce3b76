//! Product aggregate.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::value_objects::{MAX_PRICE, Money, ProductId, RestaurantId};

use super::CatalogError;

/// Menu entry as the owner edits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl ProductDetails {
    pub fn new(name: impl Into<String>, price: Money) -> Self {
        Self {
            name: name.into(),
            description: None,
            price,
            category: None,
            image_url: None,
        }
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::InvalidName);
        }
        if !self.price.is_positive() || self.price > MAX_PRICE {
            return Err(CatalogError::InvalidPrice { price: self.price });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProductEvent {
    ProductListed(ProductListedData),
    ProductUpdated(ProductUpdatedData),
    ProductAvailabilityChanged(ProductAvailabilityChangedData),
    ProductDelisted(ProductDelistedData),
}

impl DomainEvent for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductListed(_) => "ProductListed",
            ProductEvent::ProductUpdated(_) => "ProductUpdated",
            ProductEvent::ProductAvailabilityChanged(_) => "ProductAvailabilityChanged",
            ProductEvent::ProductDelisted(_) => "ProductDelisted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductListedData {
    pub product_id: ProductId,
    pub restaurant_id: RestaurantId,
    pub details: ProductDetails,
    pub listed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductUpdatedData {
    pub details: ProductDetails,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAvailabilityChangedData {
    pub available: bool,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDelistedData {
    pub delisted_at: DateTime<Utc>,
}

/// A product on one restaurant's menu. Products never move between
/// restaurants.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Product {
    id: Option<ProductId>,
    #[serde(default)]
    version: Version,
    restaurant_id: Option<RestaurantId>,
    details: Option<ProductDetails>,
    available: bool,
    delisted: bool,
}

impl Aggregate for Product {
    type Event = ProductEvent;
    type Error = CatalogError;

    fn aggregate_type() -> &'static str {
        "Product"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id.map(Into::into)
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            ProductEvent::ProductListed(data) => {
                self.id = Some(data.product_id);
                self.restaurant_id = Some(data.restaurant_id);
                self.details = Some(data.details);
                self.available = true;
            }
            ProductEvent::ProductUpdated(data) => self.details = Some(data.details),
            ProductEvent::ProductAvailabilityChanged(data) => self.available = data.available,
            ProductEvent::ProductDelisted(_) => self.delisted = true,
        }
    }
}

// Queries
impl Product {
    pub fn product_id(&self) -> Option<ProductId> {
        self.id
    }

    pub fn restaurant_id(&self) -> Option<RestaurantId> {
        self.restaurant_id
    }

    pub fn details(&self) -> Option<&ProductDetails> {
        self.details.as_ref()
    }

    pub fn name(&self) -> &str {
        self.details.as_ref().map_or("", |d| d.name.as_str())
    }

    pub fn price(&self) -> Money {
        self.details.as_ref().map_or(Money::zero(), |d| d.price)
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn is_delisted(&self) -> bool {
        self.delisted
    }

    /// Listed, available and not delisted. The restaurant still has to be
    /// orderable for the product to be sold.
    pub fn is_orderable(&self) -> bool {
        self.id.is_some() && self.available && !self.delisted
    }

    fn ensure_listed(&self) -> Result<(), CatalogError> {
        if self.id.is_none() {
            return Err(CatalogError::ProductNotListed);
        }
        if self.delisted {
            return Err(CatalogError::ProductDelisted);
        }
        Ok(())
    }
}

// Commands
impl Product {
    pub fn list(
        &self,
        product_id: ProductId,
        restaurant_id: RestaurantId,
        details: ProductDetails,
    ) -> Result<Vec<ProductEvent>, CatalogError> {
        if self.id.is_some() {
            return Err(CatalogError::ProductAlreadyListed);
        }
        details.validate()?;

        Ok(vec![ProductEvent::ProductListed(ProductListedData {
            product_id,
            restaurant_id,
            details,
            listed_at: Utc::now(),
        })])
    }

    pub fn update(&self, details: ProductDetails) -> Result<Vec<ProductEvent>, CatalogError> {
        self.ensure_listed()?;
        details.validate()?;
        if self.details.as_ref() == Some(&details) {
            return Ok(vec![]);
        }

        Ok(vec![ProductEvent::ProductUpdated(ProductUpdatedData {
            details,
            updated_at: Utc::now(),
        })])
    }

    pub fn set_availability(&self, available: bool) -> Result<Vec<ProductEvent>, CatalogError> {
        self.ensure_listed()?;
        if self.available == available {
            return Ok(vec![]);
        }

        Ok(vec![ProductEvent::ProductAvailabilityChanged(
            ProductAvailabilityChangedData {
                available,
                changed_at: Utc::now(),
            },
        )])
    }

    pub fn delist(&self) -> Result<Vec<ProductEvent>, CatalogError> {
        if self.id.is_none() {
            return Err(CatalogError::ProductNotListed);
        }
        if self.delisted {
            return Ok(vec![]);
        }
        Ok(vec![ProductEvent::ProductDelisted(ProductDelistedData {
            delisted_at: Utc::now(),
        })])
    }
}
