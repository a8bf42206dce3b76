//! Domain layer of the order lifecycle manager.
//!
//! Carts, restaurants, products, orders and user profiles are event-sourced
//! aggregates.
//! Services wrap a [`CommandHandler`] per aggregate and take the calling
//! [`common::Actor`] explicitly; role checks live in [`access`].

pub mod access;
pub mod aggregate;
pub mod cart;
pub mod catalog;
pub mod command;
pub mod error;
pub mod order;
pub mod profile;
pub mod value_objects;

pub use aggregate::{Aggregate, DomainEvent, SnapshotCapable};
pub use cart::{Cart, CartError, CartEvent, CartLine, CartService, CartSummary, PendingCheckout};
pub use catalog::{
    CatalogError, CatalogService, OrderableProduct, Product, ProductDetails, ProductEvent,
    Restaurant, RestaurantEvent, RestaurantProfile,
};
pub use command::{CommandHandler, CommandResult, MAX_CONFLICT_RETRIES};
pub use error::{DomainError, ErrorKind};
pub use order::{
    DeliveryDetails, Order, OrderDraft, OrderError, OrderEvent, OrderLine, OrderService,
    OrderStatus, StatusChange,
};
pub use profile::{Profile, ProfileDetails, ProfileError, ProfileEvent, ProfileService};
pub use value_objects::{
    CartLineId, DEFAULT_DELIVERY_FEE, MAX_LINE_QUANTITY, MAX_PRICE, Money, OrderId, OrderLineId,
    PaymentMethod, ProductId, RestaurantId,
};
