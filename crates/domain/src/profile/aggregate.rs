//! Profile aggregate.

use chrono::{DateTime, Utc};
use common::{AggregateId, Role, UserId};
use event_store::Version;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::{Aggregate, DomainEvent};

use super::ProfileError;

/// Namespace for profile streams derived from the user id.
const PROFILE_NAMESPACE: Uuid = Uuid::from_u128(0x9a4d_7e02_5c1b_4f86_a3d9_61e0_2b7c_d458);

/// What a user enters on sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDetails {
    pub full_name: String,
    pub email: String,
}

impl ProfileDetails {
    /// Trims both fields; the email is also lowercased.
    pub fn new(full_name: impl AsRef<str>, email: impl AsRef<str>) -> Self {
        Self {
            full_name: full_name.as_ref().trim().to_string(),
            email: email.as_ref().trim().to_lowercase(),
        }
    }

    fn validate(&self) -> Result<(), ProfileError> {
        validate_name(&self.full_name)?;
        match self.email.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && domain.contains('.') && !domain.contains('@') =>
            {
                Ok(())
            }
            _ => Err(ProfileError::InvalidEmail(self.email.clone())),
        }
    }
}

fn validate_name(name: &str) -> Result<(), ProfileError> {
    if name.trim().is_empty() {
        return Err(ProfileError::InvalidName);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProfileEvent {
    ProfileRegistered(ProfileRegisteredData),
    ProfileNameChanged(ProfileNameChangedData),
}

impl DomainEvent for ProfileEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProfileEvent::ProfileRegistered(_) => "ProfileRegistered",
            ProfileEvent::ProfileNameChanged(_) => "ProfileNameChanged",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRegisteredData {
    pub user_id: UserId,
    pub role: Role,
    pub details: ProfileDetails,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileNameChangedData {
    pub full_name: String,
    pub changed_at: DateTime<Utc>,
}

/// A user's profile. The role is the one the user signed up with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    user_id: Option<UserId>,
    #[serde(default)]
    version: Version,
    role: Option<Role>,
    full_name: String,
    email: String,
    registered_at: Option<DateTime<Utc>>,
}

impl Aggregate for Profile {
    type Event = ProfileEvent;
    type Error = ProfileError;

    fn aggregate_type() -> &'static str {
        "Profile"
    }

    fn id(&self) -> Option<AggregateId> {
        self.user_id.map(Self::stream_id)
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            ProfileEvent::ProfileRegistered(data) => {
                self.user_id = Some(data.user_id);
                self.role = Some(data.role);
                self.full_name = data.details.full_name;
                self.email = data.details.email;
                self.registered_at = Some(data.registered_at);
            }
            ProfileEvent::ProfileNameChanged(data) => self.full_name = data.full_name,
        }
    }
}

// Queries
impl Profile {
    /// Stream id of `user`'s profile.
    pub fn stream_id(user: UserId) -> AggregateId {
        AggregateId::derived(&PROFILE_NAMESPACE, user.as_uuid())
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn registered_at(&self) -> Option<DateTime<Utc>> {
        self.registered_at
    }

    pub fn is_registered(&self) -> bool {
        self.user_id.is_some()
    }
}

// Commands
impl Profile {
    pub fn register(
        &self,
        user_id: UserId,
        role: Role,
        details: ProfileDetails,
    ) -> Result<Vec<ProfileEvent>, ProfileError> {
        if self.is_registered() {
            return Err(ProfileError::AlreadyRegistered);
        }
        details.validate()?;

        Ok(vec![ProfileEvent::ProfileRegistered(ProfileRegisteredData {
            user_id,
            role,
            details,
            registered_at: Utc::now(),
        })])
    }

    /// Renames the user. The same name again records nothing.
    pub fn change_name(&self, full_name: &str) -> Result<Vec<ProfileEvent>, ProfileError> {
        if !self.is_registered() {
            return Err(ProfileError::NotRegistered);
        }
        let full_name = full_name.trim();
        validate_name(full_name)?;
        if full_name == self.full_name {
            return Ok(vec![]);
        }

        Ok(vec![ProfileEvent::ProfileNameChanged(ProfileNameChangedData {
            full_name: full_name.to_string(),
            changed_at: Utc::now(),
        })])
    }
}
