//! Restaurants and their menus.

mod product;
mod restaurant;
mod service;

pub use product::{
    Product, ProductAvailabilityChangedData, ProductDelistedData, ProductDetails, ProductEvent,
    ProductListedData, ProductUpdatedData,
};
pub use restaurant::{
    Restaurant, RestaurantEvent, RestaurantProfile, RestaurantProfileUpdatedData,
    RestaurantRegisteredData, RestaurantReviewData,
};
pub use service::{CatalogService, OrderableProduct};

use thiserror::Error;

use crate::error::ErrorKind;
use crate::value_objects::{MAX_PRICE, Money, ProductId};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Name must not be blank")]
    InvalidName,

    #[error("Invalid price: {price} (must be greater than 0 and at most {max})", max = MAX_PRICE)]
    InvalidPrice { price: Money },

    #[error("Owner already has a restaurant")]
    AlreadyRegistered,

    #[error("Restaurant is not registered")]
    RestaurantNotRegistered,

    #[error("Restaurant was removed")]
    RestaurantRemoved,

    #[error("Product is already listed")]
    ProductAlreadyListed,

    #[error("Product is not listed")]
    ProductNotListed,

    #[error("Product was delisted")]
    ProductDelisted,

    #[error("Product {product_id} is not available for ordering")]
    Unavailable { product_id: ProductId },
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::InvalidName | CatalogError::InvalidPrice { .. } => {
                ErrorKind::InvalidInput
            }
            CatalogError::AlreadyRegistered | CatalogError::ProductAlreadyListed => {
                ErrorKind::Conflict
            }
            CatalogError::RestaurantNotRegistered
            | CatalogError::RestaurantRemoved
            | CatalogError::ProductNotListed
            | CatalogError::ProductDelisted => ErrorKind::NotFound,
            CatalogError::Unavailable { .. } => ErrorKind::ProductUnavailable,
        }
    }
}
