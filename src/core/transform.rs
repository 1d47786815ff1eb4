//! Conversation to flat-record transformation.
//!
//! For each retained conversation the transformer fetches the full message
//! list (one call, no pagination) and maps every in-window message to a
//! [`NormalizedRecord`]: channel name resolved through the directory,
//! contact identity from the conversation's embedded metadata, sender
//! classified as agent or customer, and the creation timestamp rendered as
//! an ISO-8601 UTC string with a raw-string fallback.
//!
//! Fetches for different conversations are independent, so they run
//! through a bounded worker pool; results are reassembled by input
//! position, keeping the output order deterministic regardless of
//! completion order. A failed message fetch yields zero records for that
//! conversation and the run continues.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::DateTime;
use futures::{StreamExt, TryStreamExt, stream};
use serde_json::Value;
use tracing::warn;

use crate::client::{Executor, messages_endpoint};
use crate::core::filter::{DateWindow, message_in_window};
use crate::core::models::{
    ApiMessage, ChannelDirectory, Conversation, NormalizedRecord, UNKNOWN_AGENT,
};
use crate::core::pipeline::CancelFlag;
use crate::error::{HarvestError, Result};
use crate::progress::{Progress, ProgressCallback};

/// Transform progress is reported over this percentage range.
const PCT_TRANSFORM_START: f64 = 25.0;
const PCT_TRANSFORM_END: f64 = 95.0;

/// Conversations between progress reports.
const PROGRESS_INTERVAL: usize = 10;

/// Fetches messages and normalizes records for every conversation.
///
/// `workers` bounds how many message fetches are in flight at once; the
/// executor's shared throttle still spaces the actual requests.
pub async fn transform_conversations<E: Executor>(
    executor: &E,
    account: &str,
    conversations: &[Conversation],
    directory: &ChannelDirectory,
    window: Option<&DateWindow>,
    workers: usize,
    progress: &ProgressCallback,
    cancel: &CancelFlag,
) -> Result<Vec<NormalizedRecord>> {
    let total = conversations.len();
    let done = AtomicUsize::new(0);

    let mut indexed: Vec<(usize, Vec<NormalizedRecord>)> =
        stream::iter(conversations.iter().enumerate())
            .map(|(position, conversation)| {
                let done = &done;
                async move {
                    cancel.check()?;
                    let messages = fetch_messages(executor, account, conversation.id).await?;
                    let records =
                        records_for_conversation(conversation, &messages, directory, window);

                    let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                    if finished % PROGRESS_INTERVAL == 0 || finished == total {
                        let span = PCT_TRANSFORM_END - PCT_TRANSFORM_START;
                        let percent =
                            PCT_TRANSFORM_START + span * (finished as f64 / total as f64);
                        progress(Progress::new(
                            Some(percent),
                            format!("Processed {finished}/{total} conversations"),
                        ));
                    }

                    Ok::<_, HarvestError>((position, records))
                }
            })
            .buffer_unordered(workers.max(1))
            .try_collect()
            .await?;

    // Reassemble by input position so output order is deterministic.
    indexed.sort_by_key(|(position, _)| *position);
    Ok(indexed
        .into_iter()
        .flat_map(|(_, records)| records)
        .collect())
}

/// Fetches the full message list of one conversation.
///
/// Local failures degrade to an empty list (the conversation contributes
/// zero records); only fatal failures propagate.
async fn fetch_messages<E: Executor>(
    executor: &E,
    account: &str,
    conversation_id: i64,
) -> Result<Vec<ApiMessage>> {
    match executor
        .execute(&messages_endpoint(account, conversation_id), &[])
        .await
    {
        Ok(response) => Ok(messages_from(&response)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(conversation = conversation_id, error = %e, "message fetch failed, skipping conversation");
            Ok(Vec::new())
        }
    }
}

fn messages_from(response: &Value) -> Vec<ApiMessage> {
    response
        .get("payload")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Pure mapping from one conversation and its messages to flat records.
///
/// Applies the authoritative message-level window filter before emitting.
pub fn records_for_conversation(
    conversation: &Conversation,
    messages: &[ApiMessage],
    directory: &ChannelDirectory,
    window: Option<&DateWindow>,
) -> Vec<NormalizedRecord> {
    let customer_name = conversation.customer_name();
    let customer_email = conversation.customer_email();
    let channel_name = directory.resolve(conversation.inbox_id);

    messages
        .iter()
        .filter(|message| message_in_window(message.created_epoch(), window))
        .map(|message| {
            let (sender_name, agent_email) = match &message.sender {
                Some(sender) if sender.is_agent() => (
                    sender
                        .name
                        .clone()
                        .unwrap_or_else(|| UNKNOWN_AGENT.to_string()),
                    Some(sender.email.clone().unwrap_or_default()),
                ),
                // Anything that is not a platform agent is attributed to
                // the conversation's contact.
                _ => (customer_name.clone(), None),
            };

            NormalizedRecord {
                conversation_id: conversation.id,
                customer_name: customer_name.clone(),
                customer_email: customer_email.clone(),
                channel_name: channel_name.clone(),
                message_type: message_type_label(message.message_type.as_ref()),
                sender_name,
                content: message.content.clone().unwrap_or_default(),
                created_at_iso: created_at_iso(message.created_at.as_ref()),
                agent_email,
            }
        })
        .collect()
}

/// Raw message type as a label, defaulting to `outgoing` when absent.
fn message_type_label(raw: Option<&Value>) -> String {
    match raw {
        None | Some(Value::Null) => "outgoing".to_string(),
        Some(Value::String(label)) => label.clone(),
        Some(other) => other.to_string(),
    }
}

/// Renders the creation timestamp as an ISO-8601 UTC string.
///
/// Epoch seconds that fail to parse fall back to the raw value as a
/// string rather than dropping the field; an absent value stays null.
fn created_at_iso(raw: Option<&Value>) -> Option<String> {
    let value = raw?;
    if value.is_null() {
        return None;
    }
    match value
        .as_i64()
        .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
    {
        Some(created) => Some(created.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        None => Some(match value {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::no_progress;
    use serde_json::json;
    use std::collections::HashMap;

    fn directory() -> ChannelDirectory {
        [(101, "WhatsApp".to_string()), (102, "Email".to_string())]
            .into_iter()
            .collect()
    }

    fn conversation(id: i64, inbox_id: i64) -> Conversation {
        serde_json::from_value(json!({
            "id": id,
            "inbox_id": inbox_id,
            "meta": { "sender": { "name": "Maria Silva", "email": "maria@example.com" } }
        }))
        .unwrap()
    }

    fn message(value: Value) -> ApiMessage {
        serde_json::from_value(value).unwrap()
    }

    // 2025-01-10T09:00:00Z
    const JAN_10: i64 = 1_736_499_600;
    // 2025-02-05T10:00:00Z
    const FEB_05: i64 = 1_738_749_600;

    #[test]
    fn test_contact_message_attributed_to_customer() {
        let records = records_for_conversation(
            &conversation(5001, 101),
            &[message(json!({
                "message_type": "incoming",
                "content": "Hello, I need help",
                "created_at": JAN_10,
                "sender": { "type": "Contact", "name": "Maria Silva" }
            }))],
            &directory(),
            None,
        );

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.conversation_id, 5001);
        assert_eq!(record.channel_name, "WhatsApp");
        assert_eq!(record.message_type, "incoming");
        assert_eq!(record.sender_name, "Maria Silva");
        assert_eq!(record.customer_email, "maria@example.com");
        assert_eq!(record.created_at_iso.as_deref(), Some("2025-01-10T09:00:00Z"));
        assert_eq!(record.agent_email, None);
    }

    #[test]
    fn test_agent_message_captures_agent_identity() {
        let records = records_for_conversation(
            &conversation(5001, 101),
            &[message(json!({
                "message_type": "outgoing",
                "content": "How can I help?",
                "created_at": JAN_10,
                "sender": { "type": "User", "name": "Ana", "email": "ana@company.com" }
            }))],
            &directory(),
            None,
        );

        let record = &records[0];
        assert_eq!(record.sender_name, "Ana");
        assert_eq!(record.agent_email.as_deref(), Some("ana@company.com"));
        // Customer identity still comes from the conversation contact.
        assert_eq!(record.customer_name, "Maria Silva");
    }

    #[test]
    fn test_senderless_message_falls_back_to_customer() {
        let records = records_for_conversation(
            &conversation(5001, 101),
            &[message(json!({ "content": "automated note", "created_at": JAN_10 }))],
            &directory(),
            None,
        );

        let record = &records[0];
        assert_eq!(record.sender_name, "Maria Silva");
        assert_eq!(record.message_type, "outgoing");
        assert_eq!(record.agent_email, None);
    }

    #[test]
    fn test_unresolved_channel_gets_placeholder() {
        let records = records_for_conversation(
            &conversation(5001, 999),
            &[message(json!({ "content": "x", "created_at": JAN_10 }))],
            &directory(),
            None,
        );
        assert_eq!(records[0].channel_name, "Channel ID 999");
    }

    #[test]
    fn test_unparsable_timestamp_falls_back_to_raw_string() {
        let records = records_for_conversation(
            &conversation(5001, 101),
            &[
                message(json!({ "content": "a", "created_at": "soon" })),
                message(json!({ "content": "b", "created_at": 1.5 })),
                message(json!({ "content": "c" })),
            ],
            &directory(),
            None,
        );

        assert_eq!(records[0].created_at_iso.as_deref(), Some("soon"));
        assert_eq!(records[1].created_at_iso.as_deref(), Some("1.5"));
        assert_eq!(records[2].created_at_iso, None);
    }

    #[test]
    fn test_window_filters_messages_not_conversations() {
        // One January message from the contact, one February agent reply,
        // window covering January only: exactly the January record remains.
        let window = DateWindow::from_dates("2025-01-01", "2025-01-31").unwrap();
        let records = records_for_conversation(
            &conversation(5001, 101),
            &[
                message(json!({
                    "message_type": "incoming",
                    "content": "Hello",
                    "created_at": JAN_10,
                    "sender": { "type": "Contact", "name": "Maria Silva" }
                })),
                message(json!({
                    "message_type": "outgoing",
                    "content": "Following up",
                    "created_at": FEB_05,
                    "sender": { "type": "User", "name": "Ana", "email": "ana@company.com" }
                })),
            ],
            &directory(),
            Some(&window),
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].channel_name, "WhatsApp");
        assert_eq!(records[0].content, "Hello");
        assert_eq!(records[0].agent_email, None);
    }

    #[test]
    fn test_message_type_label_variants() {
        assert_eq!(message_type_label(None), "outgoing");
        assert_eq!(message_type_label(Some(&Value::Null)), "outgoing");
        assert_eq!(message_type_label(Some(&json!("incoming"))), "incoming");
        assert_eq!(message_type_label(Some(&json!(1))), "1");
    }

    /// Executor stub serving message payloads keyed by endpoint.
    struct MessagesApi {
        by_endpoint: HashMap<String, Value>,
    }

    impl Executor for MessagesApi {
        async fn execute(
            &self,
            endpoint: &str,
            _query: &[(&str, String)],
        ) -> Result<Value> {
            match self.by_endpoint.get(endpoint) {
                Some(response) => Ok(response.clone()),
                None => Err(HarvestError::http(500, endpoint)),
            }
        }
    }

    fn messages_api(entries: &[(i64, Value)]) -> MessagesApi {
        MessagesApi {
            by_endpoint: entries
                .iter()
                .map(|(id, response)| (messages_endpoint("42", *id), response.clone()))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_transform_orders_output_by_input_position() {
        let api = messages_api(&[
            (1, json!({ "payload": [{ "content": "first", "created_at": JAN_10 }] })),
            (2, json!({ "payload": [{ "content": "second", "created_at": JAN_10 }] })),
            (3, json!({ "payload": [{ "content": "third", "created_at": JAN_10 }] })),
        ]);
        let conversations = vec![
            conversation(1, 101),
            conversation(2, 101),
            conversation(3, 102),
        ];

        let records = transform_conversations(
            &api,
            "42",
            &conversations,
            &directory(),
            None,
            3,
            &no_progress(),
            &CancelFlag::new(),
        )
        .await
        .unwrap();

        let contents: Vec<&str> = records.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_failed_message_fetch_skips_conversation() {
        // Conversation 2 has no scripted response, so its fetch errors and
        // it contributes zero records.
        let api = messages_api(&[
            (1, json!({ "payload": [{ "content": "kept", "created_at": JAN_10 }] })),
            (3, json!({ "payload": [{ "content": "also kept", "created_at": JAN_10 }] })),
        ]);
        let conversations = vec![
            conversation(1, 101),
            conversation(2, 101),
            conversation(3, 101),
        ];

        let records = transform_conversations(
            &api,
            "42",
            &conversations,
            &directory(),
            None,
            2,
            &no_progress(),
            &CancelFlag::new(),
        )
        .await
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].conversation_id, 1);
        assert_eq!(records[1].conversation_id, 3);
    }

    #[tokio::test]
    async fn test_empty_message_payload_yields_no_records() {
        let api = messages_api(&[(1, json!({ "payload": [] }))]);
        let records = transform_conversations(
            &api,
            "42",
            &[conversation(1, 101)],
            &directory(),
            None,
            1,
            &no_progress(),
            &CancelFlag::new(),
        )
        .await
        .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_transform_aborts() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let api = messages_api(&[]);
        let err = transform_conversations(
            &api,
            "42",
            &[conversation(1, 101)],
            &directory(),
            None,
            1,
            &no_progress(),
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, HarvestError::Cancelled));
    }
}
