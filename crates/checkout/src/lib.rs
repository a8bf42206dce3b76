//! Turning a cart into an order.
//!
//! Checkout runs as three steps over two streams:
//! 1. Reserve the cart (`CheckoutStarted`, the cart is locked)
//! 2. Create the order (`OrderPlaced`)
//! 3. Clear the cart (`CartCheckedOut`, the lock is released)
//!
//! A failure in step 2 releases the cart again unless the order turns out to
//! exist after all. A failure in step 3 leaves the lock in place; the next
//! checkout attempt picks up the recorded draft and finishes the job, so an
//! order is never created twice for one reservation.

pub mod coordinator;
pub mod error;
pub mod steps;

pub use coordinator::{CheckoutCoordinator, CheckoutStatus, PlaceOrder};
pub use error::CheckoutError;
