use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::users::Role;

text_enum! {
    pub enum FriendshipStatus {
        Pending => "pending",
        Accepted => "accepted",
        Rejected => "rejected",
        Blocked => "blocked",
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
pub struct Friendship {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub recipient_id: Uuid,
    pub status: FriendshipStatus,
    pub requested_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl Friendship {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.requester_id == user_id || self.recipient_id == user_id
    }

    pub fn other_party(&self, user_id: Uuid) -> Uuid {
        if self.requester_id == user_id {
            self.recipient_id
        } else {
            self.requester_id
        }
    }
}

/// Friendship seen from one side, with the other party's identity.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct FriendshipView {
    pub id: Uuid,
    pub status: FriendshipStatus,
    pub requested_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub friend_id: Uuid,
    pub friend_name: String,
    pub friend_email: String,
    pub friend_role: Role,
}

#[derive(Debug, Deserialize)]
pub struct FriendRequest {
    pub recipient_id: Uuid,
}

text_enum! {
    pub enum FriendResponse {
        Accept => "accept",
        Reject => "reject",
    }
}

impl FriendResponse {
    pub fn status(&self) -> FriendshipStatus {
        match self {
            FriendResponse::Accept => FriendshipStatus::Accepted,
            FriendResponse::Reject => FriendshipStatus::Rejected,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub action: FriendResponse,
}
