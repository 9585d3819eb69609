//! User-level interaction payloads
//!
//! One tagged variant per interaction kind, validated at the boundary
//! before any business logic sees it. Every payload carries a
//! caller-generated `interaction_id` so receivers can deduplicate;
//! delivery itself is at-least-once.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::types::now_millis;

/// The user performing an interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorRef {
    pub handle: String,
    pub did: String,
    /// The actor's home node domain
    pub domain: String,
}

/// The six interaction kinds delivered point-to-point between nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Like,
    Unlike,
    Repost,
    Follow,
    Unfollow,
    Mention,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 6] = [
        InteractionKind::Like,
        InteractionKind::Unlike,
        InteractionKind::Repost,
        InteractionKind::Follow,
        InteractionKind::Unfollow,
        InteractionKind::Mention,
    ];

    /// URL path segment for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Like => "like",
            InteractionKind::Unlike => "unlike",
            InteractionKind::Repost => "repost",
            InteractionKind::Follow => "follow",
            InteractionKind::Unfollow => "unfollow",
            InteractionKind::Mention => "mention",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single user-level interaction, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Interaction {
    Like {
        interaction_id: String,
        actor: ActorRef,
        post_uri: String,
        created_at: i64,
    },
    Unlike {
        interaction_id: String,
        actor: ActorRef,
        post_uri: String,
        created_at: i64,
    },
    Repost {
        interaction_id: String,
        actor: ActorRef,
        post_uri: String,
        created_at: i64,
    },
    Follow {
        interaction_id: String,
        actor: ActorRef,
        target_handle: String,
        created_at: i64,
    },
    Unfollow {
        interaction_id: String,
        actor: ActorRef,
        target_handle: String,
        created_at: i64,
    },
    Mention {
        interaction_id: String,
        actor: ActorRef,
        post_uri: String,
        mentioned_handle: String,
        created_at: i64,
    },
}

impl Interaction {
    fn next_id() -> String {
        Ulid::new().to_string()
    }

    pub fn like(actor: ActorRef, post_uri: impl Into<String>) -> Self {
        Interaction::Like {
            interaction_id: Self::next_id(),
            actor,
            post_uri: post_uri.into(),
            created_at: now_millis(),
        }
    }

    pub fn unlike(actor: ActorRef, post_uri: impl Into<String>) -> Self {
        Interaction::Unlike {
            interaction_id: Self::next_id(),
            actor,
            post_uri: post_uri.into(),
            created_at: now_millis(),
        }
    }

    pub fn repost(actor: ActorRef, post_uri: impl Into<String>) -> Self {
        Interaction::Repost {
            interaction_id: Self::next_id(),
            actor,
            post_uri: post_uri.into(),
            created_at: now_millis(),
        }
    }

    pub fn follow(actor: ActorRef, target_handle: impl Into<String>) -> Self {
        Interaction::Follow {
            interaction_id: Self::next_id(),
            actor,
            target_handle: target_handle.into(),
            created_at: now_millis(),
        }
    }

    pub fn unfollow(actor: ActorRef, target_handle: impl Into<String>) -> Self {
        Interaction::Unfollow {
            interaction_id: Self::next_id(),
            actor,
            target_handle: target_handle.into(),
            created_at: now_millis(),
        }
    }

    pub fn mention(
        actor: ActorRef,
        post_uri: impl Into<String>,
        mentioned_handle: impl Into<String>,
    ) -> Self {
        Interaction::Mention {
            interaction_id: Self::next_id(),
            actor,
            post_uri: post_uri.into(),
            mentioned_handle: mentioned_handle.into(),
            created_at: now_millis(),
        }
    }

    pub fn kind(&self) -> InteractionKind {
        match self {
            Interaction::Like { .. } => InteractionKind::Like,
            Interaction::Unlike { .. } => InteractionKind::Unlike,
            Interaction::Repost { .. } => InteractionKind::Repost,
            Interaction::Follow { .. } => InteractionKind::Follow,
            Interaction::Unfollow { .. } => InteractionKind::Unfollow,
            Interaction::Mention { .. } => InteractionKind::Mention,
        }
    }

    pub fn interaction_id(&self) -> &str {
        match self {
            Interaction::Like { interaction_id, .. }
            | Interaction::Unlike { interaction_id, .. }
            | Interaction::Repost { interaction_id, .. }
            | Interaction::Follow { interaction_id, .. }
            | Interaction::Unfollow { interaction_id, .. }
            | Interaction::Mention { interaction_id, .. } => interaction_id,
        }
    }

    pub fn actor(&self) -> &ActorRef {
        match self {
            Interaction::Like { actor, .. }
            | Interaction::Unlike { actor, .. }
            | Interaction::Repost { actor, .. }
            | Interaction::Follow { actor, .. }
            | Interaction::Unfollow { actor, .. }
            | Interaction::Mention { actor, .. } => actor,
        }
    }
}

/// Acknowledgement returned by an inbound interaction endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAck {
    pub accepted: bool,
    /// True when this `interaction_id` was already processed
    pub duplicate: bool,
}
