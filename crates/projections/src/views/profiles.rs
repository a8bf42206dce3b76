//! Registered users, for the admin user list.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AggregateId, Role, UserId};
use domain::{Aggregate, Profile, ProfileEvent};
use event_store::SequencedEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileView {
    pub user_id: UserId,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub registered_at: DateTime<Utc>,
}

/// Optional role predicate for the user list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct UserFilter {
    #[serde(default)]
    pub role: Option<Role>,
}

impl UserFilter {
    pub fn role(role: Role) -> Self {
        Self { role: Some(role) }
    }

    pub fn matches(&self, profile: &ProfileView) -> bool {
        self.role.is_none_or(|r| r == profile.role)
    }
}

#[derive(Default)]
struct ProfilesState {
    profiles: HashMap<UserId, ProfileView>,
    /// Profile stream id back to its user.
    users_by_stream: HashMap<AggregateId, UserId>,
    position: ProjectionPosition,
}

#[derive(Clone, Default)]
pub struct ProfilesView {
    state: Arc<RwLock<ProfilesState>>,
}

impl ProfilesView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: UserId) -> Option<ProfileView> {
        self.state.read().await.profiles.get(&user_id).cloned()
    }

    /// Matching users, newest sign-up first.
    pub async fn users(&self, filter: UserFilter) -> Vec<ProfileView> {
        let state = self.state.read().await;
        let mut users: Vec<ProfileView> = state
            .profiles
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        users.sort_by(|a, b| {
            b.registered_at
                .cmp(&a.registered_at)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        users
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.profiles.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Projection for ProfilesView {
    fn name(&self) -> &'static str {
        "ProfilesView"
    }

    async fn handle(&self, recorded: &SequencedEvent) -> Result<()> {
        let event = &recorded.event;
        let mut state = self.state.write().await;

        if event.is_for(Profile::aggregate_type()) {
            match event.decode::<ProfileEvent>()? {
                ProfileEvent::ProfileRegistered(data) => {
                    state.users_by_stream.insert(event.aggregate_id, data.user_id);
                    state.profiles.insert(
                        data.user_id,
                        ProfileView {
                            user_id: data.user_id,
                            full_name: data.details.full_name,
                            email: data.details.email,
                            role: data.role,
                            registered_at: data.registered_at,
                        },
                    );
                }
                ProfileEvent::ProfileNameChanged(data) => {
                    let stream = event.aggregate_id;
                    let user_id = state.users_by_stream.get(&stream).copied();
                    match user_id.and_then(|id| state.profiles.get_mut(&id)) {
                        Some(profile) => profile.full_name = data.full_name,
                        None => tracing::warn!(%stream, "name change for unknown profile"),
                    }
                }
            }
        }

        state.position = state.position.advance_to(recorded.sequence);
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position
    }

    async fn reset(&self) -> Result<()> {
        *self.state.write().await = ProfilesState::default();
        Ok(())
    }
}
