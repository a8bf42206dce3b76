use common::Actor;
use event_store::EventStore;

use crate::command::{CommandHandler, MAX_CONFLICT_RETRIES};
use crate::error::DomainError;

use super::{Profile, ProfileDetails, ProfileError};

/// Sign-up and self-service for user profiles. Every call acts on the
/// caller's own profile.
pub struct ProfileService<S> {
    profiles: CommandHandler<S, Profile>,
}

impl<S: Clone> Clone for ProfileService<S> {
    fn clone(&self) -> Self {
        Self {
            profiles: self.profiles.clone(),
        }
    }
}

impl<S: EventStore + Clone> ProfileService<S> {
    pub fn new(store: S) -> Self {
        Self {
            profiles: CommandHandler::new(store),
        }
    }

    /// Records the caller's name and email under the role they hold now.
    #[tracing::instrument(skip(self, actor, details), fields(actor = %actor))]
    pub async fn register_profile(
        &self,
        actor: &Actor,
        details: ProfileDetails,
    ) -> Result<Profile, DomainError> {
        let (user_id, role) = (actor.user_id, actor.role);
        let result = self
            .profiles
            .execute(Profile::stream_id(user_id), |profile| {
                profile.register(user_id, role, details)
            })
            .await?;

        tracing::info!(%user_id, %role, "profile registered");
        Ok(result.aggregate)
    }

    #[tracing::instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn change_name(&self, actor: &Actor, full_name: &str) -> Result<Profile, DomainError> {
        let result = self
            .profiles
            .execute_retrying(
                Profile::stream_id(actor.user_id),
                MAX_CONFLICT_RETRIES,
                |profile| profile.change_name(full_name),
            )
            .await?;
        Ok(result.aggregate)
    }

    pub async fn get_profile(&self, actor: &Actor) -> Result<Profile, DomainError> {
        self.profiles
            .load_existing(Profile::stream_id(actor.user_id))
            .await?
            .ok_or_else(|| ProfileError::NotRegistered.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use common::{Role, UserId};
    use event_store::InMemoryEventStore;

    #[tokio::test]
    async fn test_register_then_rename() {
        let profiles = ProfileService::new(InMemoryEventStore::new());
        let owner = Actor::restaurant_owner(UserId::new());

        let err = profiles.get_profile(&owner).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let profile = profiles
            .register_profile(&owner, ProfileDetails::new("Grace", "grace@example.com"))
            .await
            .unwrap();
        assert_eq!(profile.role(), Some(Role::RestaurantOwner));

        profiles.change_name(&owner, "Grace Hopper").await.unwrap();
        let stored = profiles.get_profile(&owner).await.unwrap();
        assert_eq!(stored.full_name(), "Grace Hopper");
        assert_eq!(stored.email(), "grace@example.com");
    }

    #[tokio::test]
    async fn test_second_registration_conflicts() {
        let profiles = ProfileService::new(InMemoryEventStore::new());
        let customer = Actor::customer(UserId::new());
        let details = ProfileDetails::new("Linus", "linus@example.com");
        profiles
            .register_profile(&customer, details.clone())
            .await
            .unwrap();

        let err = profiles
            .register_profile(&customer, details)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_rename_requires_profile() {
        let profiles = ProfileService::new(InMemoryEventStore::new());
        let err = profiles
            .change_name(&Actor::customer(UserId::new()), "Nobody")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
