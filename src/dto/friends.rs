use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{FriendshipRequest, UserSummary};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SearchFriendRequest {
    pub username: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SendFriendRequest {
    pub to_user_id: Uuid,
    #[serde(default)]
    pub message: Option<String>,
}

/// What sending a friendship request ended up doing.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SendOutcome {
    /// A new request now waits for the addressee.
    Pending { request: FriendshipRequest },
    /// The addressee had already asked; the two users are now friends.
    Accepted { friend: UserSummary },
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MutationResult {
    /// `false` when there was nothing left to change.
    pub changed: bool,
}
