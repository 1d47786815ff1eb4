//! Core data models for conversations, messages, and normalized records.
//!
//! Conversations and messages are read-only snapshots deserialized from the
//! platform API. The pipeline never mutates them; it only filters and
//! annotates via lookup. [`NormalizedRecord`] is the terminal flat shape,
//! the only thing that gets persisted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder customer name when the conversation carries no contact name.
pub const UNKNOWN_CUSTOMER: &str = "Unknown Customer";

/// Placeholder agent name when a platform user has no name set.
pub const UNKNOWN_AGENT: &str = "Unknown Agent";

/// Placeholder channel name when an inbox entry carries no name.
pub const UNKNOWN_CHANNEL: &str = "Unknown Channel";

/// Mapping from channel (inbox) identifier to channel display name.
///
/// Built once per run from the account's channel listing, immutable after
/// load, and passed by reference to the stages that need name resolution.
/// Unresolved identifiers resolve to a synthesized placeholder, never to
/// null, so downstream records always carry a channel name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelDirectory {
    channels: HashMap<i64, String>,
}

impl ChannelDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a channel entry.
    pub fn insert(&mut self, id: i64, name: impl Into<String>) {
        self.channels.insert(id, name.into());
    }

    /// Resolves a channel id to its display name.
    ///
    /// Unknown or absent ids resolve to a placeholder of the form
    /// `Channel ID 42` (or `Channel ID unknown` when the conversation has
    /// no inbox id at all).
    pub fn resolve(&self, id: Option<i64>) -> String {
        match id {
            Some(id) => self
                .channels
                .get(&id)
                .cloned()
                .unwrap_or_else(|| format!("Channel ID {id}")),
            None => "Channel ID unknown".to_string(),
        }
    }

    /// Returns the channel ids in ascending order.
    ///
    /// The fallback discovery sweep iterates this, so a stable order keeps
    /// runs deterministic.
    pub fn ids_sorted(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.channels.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns a new directory restricted to the selected channel ids.
    ///
    /// Ids not present in this directory are ignored.
    pub fn select(&self, selected: &[i64]) -> ChannelDirectory {
        let channels = self
            .channels
            .iter()
            .filter(|(id, _)| selected.contains(id))
            .map(|(id, name)| (*id, name.clone()))
            .collect();
        ChannelDirectory { channels }
    }

    /// Returns the number of channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns `true` if the directory holds no channels.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Returns `true` if the directory contains the given channel id.
    pub fn contains(&self, id: i64) -> bool {
        self.channels.contains_key(&id)
    }
}

impl FromIterator<(i64, String)> for ChannelDirectory {
    fn from_iter<I: IntoIterator<Item = (i64, String)>>(iter: I) -> Self {
        Self {
            channels: iter.into_iter().collect(),
        }
    }
}

/// A conversation snapshot as returned by the platform API.
///
/// Only the fields the pipeline consumes are modeled; everything else in
/// the payload is ignored on deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier, the dedup key across all discovery
    /// strategies.
    pub id: i64,

    /// Owning channel (inbox) identifier.
    #[serde(default)]
    pub inbox_id: Option<i64>,

    /// Last activity as epoch seconds, used as a cheap pre-filter.
    #[serde(default)]
    pub last_activity_at: Option<i64>,

    /// Embedded metadata, including the contact summary.
    #[serde(default)]
    pub meta: ConversationMeta,
}

impl Conversation {
    /// Returns the embedded contact summary, if present.
    pub fn contact(&self) -> Option<&Contact> {
        self.meta.sender.as_ref()
    }

    /// Customer display name, falling back to a placeholder.
    pub fn customer_name(&self) -> String {
        self.contact()
            .and_then(|contact| contact.name.clone())
            .unwrap_or_else(|| UNKNOWN_CUSTOMER.to_string())
    }

    /// Customer email, falling back to an empty string.
    pub fn customer_email(&self) -> String {
        self.contact()
            .and_then(|contact| contact.email.clone())
            .unwrap_or_default()
    }
}

/// The `meta` object embedded in a conversation payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationMeta {
    /// The contact on the customer side of the conversation.
    #[serde(default)]
    pub sender: Option<Contact>,
}

/// Contact summary embedded in a conversation's metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    /// Contact display name, if the platform has one.
    #[serde(default)]
    pub name: Option<String>,

    /// Contact email, if the platform has one.
    #[serde(default)]
    pub email: Option<String>,
}

/// A single message as returned by the conversation messages endpoint.
///
/// Timestamps and the type tag are kept as raw JSON values: accounts have
/// been observed returning malformed variants of both, and the transformer
/// owns the fallback rules.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessage {
    /// Raw message type tag, `incoming` or `outgoing` when well-formed.
    #[serde(default)]
    pub message_type: Option<Value>,

    /// Free-text content; null for attachment-only messages.
    #[serde(default)]
    pub content: Option<String>,

    /// Creation time as epoch seconds when well-formed.
    #[serde(default)]
    pub created_at: Option<Value>,

    /// Sender identity; absent for system-generated entries.
    #[serde(default)]
    pub sender: Option<MessageSender>,
}

impl ApiMessage {
    /// Returns the creation time as epoch seconds, if it parses as one.
    pub fn created_epoch(&self) -> Option<i64> {
        self.created_at.as_ref().and_then(Value::as_i64)
    }
}

/// Sender identity attached to a message.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageSender {
    /// Sender kind tag; `User` marks a platform agent.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    /// Sender display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Sender email.
    #[serde(default)]
    pub email: Option<String>,
}

impl MessageSender {
    /// Returns `true` if this sender is a platform agent rather than the
    /// conversation's contact.
    pub fn is_agent(&self) -> bool {
        self.kind.as_deref() == Some("User")
    }
}

/// The terminal, flat per-message record.
///
/// One record per message; this is the sole externally persisted shape and
/// its field names match the dump format consumed downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Identifier of the owning conversation.
    pub conversation_id: i64,

    /// Customer display name (placeholder when absent).
    pub customer_name: String,

    /// Customer email (empty when absent).
    pub customer_email: String,

    /// Resolved channel display name (placeholder when unresolved).
    pub channel_name: String,

    /// Raw message type classification, default `outgoing`.
    pub message_type: String,

    /// Display name of whoever sent the message.
    pub sender_name: String,

    /// Free-text message content.
    pub content: String,

    /// Creation time as an ISO-8601 UTC string, the raw value as a string
    /// when unparsable, or null when absent.
    pub created_at_iso: Option<String>,

    /// Agent email; null unless the sender is a platform agent.
    pub agent_email: Option<String>,
}
