//! User profiles: the name and email behind a user id.
//!
//! The gateway vouches for the id and role; the profile is what the user
//! tells us about themselves on sign-up.

mod aggregate;
mod service;

pub use aggregate::{
    Profile, ProfileDetails, ProfileEvent, ProfileNameChangedData, ProfileRegisteredData,
};
pub use service::ProfileService;

use thiserror::Error;

use crate::error::ErrorKind;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Full name must not be blank")]
    InvalidName,

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Profile already registered")]
    AlreadyRegistered,

    #[error("Profile is not registered")]
    NotRegistered,
}

impl ProfileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProfileError::InvalidName | ProfileError::InvalidEmail(_) => ErrorKind::InvalidInput,
            ProfileError::AlreadyRegistered => ErrorKind::Conflict,
            ProfileError::NotRegistered => ErrorKind::NotFound,
        }
    }
}
