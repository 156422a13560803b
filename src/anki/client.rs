use std::{
    collections::HashMap,
    sync::atomic::{
        AtomicBool,
        Ordering,
    },
    time::Duration,
};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    anki::{
        transport::{
            BridgeTransport,
            HttpTransport,
        },
        types::{
            Field,
            NoteInfo,
        },
    },
    connection::ConnectionEvent,
    core::BridgeError,
};

/// Builds the bridge's search-filter syntax for one deck, quote-escaped so
/// deck names containing `"` survive the round trip.
pub fn deck_query(deck: &str) -> String {
    format!("deck:\"{}\"", deck.replace('"', "\\\""))
}

/// Typed request dispatch against a resolved bridge endpoint.
///
/// Holds the process-lifetime "connection established" latch: the first call
/// that comes back without a server error emits one
/// [`ConnectionEvent::BridgeEstablished`] for user feedback, and never again
/// for this client.
pub struct BridgeClient<T: BridgeTransport = HttpTransport> {
    transport: T,
    established: AtomicBool,
    events: Option<UnboundedSender<ConnectionEvent>>,
}

impl BridgeClient<HttpTransport> {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_transport(HttpTransport::new(base_url))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self::with_transport(HttpTransport::with_timeout(base_url, timeout))
    }
}

impl<T: BridgeTransport> BridgeClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport, established: AtomicBool::new(false), events: None }
    }

    /// Wires the client into an event stream (the coordinator's, usually).
    pub fn on_events(mut self, events: UnboundedSender<ConnectionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    async fn call_raw(
        &self,
        action: &str,
        params: Option<Value>,
    ) -> Result<Option<Value>, BridgeError> {
        let response = self.transport.invoke(action, params).await?;

        if let Some(message) = response.error {
            return Err(BridgeError::Protocol(message));
        }

        self.mark_established();
        Ok(response.result)
    }

    /// Issues `action` and unwraps the `result` payload into the operation's
    /// return type.
    pub async fn call<R: DeserializeOwned>(
        &self,
        action: &str,
        params: Option<Value>,
    ) -> Result<R, BridgeError> {
        match self.call_raw(action, params).await? {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                BridgeError::Transport(format!("malformed result for {}: {}", action, e))
            }),
            None => Err(BridgeError::Transport(format!("missing result for {}", action))),
        }
    }

    /// For actions whose success is the absence of an `error` string.
    pub async fn call_unit(&self, action: &str, params: Option<Value>) -> Result<(), BridgeError> {
        self.call_raw(action, params).await.map(|_| ())
    }

    pub async fn version(&self) -> Result<u32, BridgeError> {
        self.call("version", None).await
    }

    pub async fn deck_names(&self) -> Result<Vec<String>, BridgeError> {
        self.call("deckNames", None).await
    }

    pub async fn find_notes(&self, query: &str) -> Result<Vec<u64>, BridgeError> {
        self.call("findNotes", Some(serde_json::json!({ "query": query }))).await
    }

    pub async fn notes_in_deck(&self, deck: &str) -> Result<Vec<u64>, BridgeError> {
        self.find_notes(&deck_query(deck)).await
    }

    /// Batch note fetch: one round trip, one entry per id, in input order.
    /// Preferred over repeated single fetches whenever more than one note is
    /// needed.
    pub async fn notes_info(&self, note_ids: &[u64]) -> Result<Vec<NoteInfo>, BridgeError> {
        if note_ids.is_empty() {
            return Ok(Vec::new());
        }

        let notes: Vec<NoteInfo> =
            self.call("notesInfo", Some(serde_json::json!({ "notes": note_ids }))).await?;

        if notes.len() != note_ids.len() {
            return Err(BridgeError::Transport(format!(
                "notesInfo returned {} notes for {} ids",
                notes.len(),
                note_ids.len()
            )));
        }

        Ok(notes)
    }

    /// One note's fields in declared order, ready for an editor view.
    pub async fn note_fields(&self, note_id: u64) -> Result<Vec<(String, Field)>, BridgeError> {
        let mut notes = self.notes_info(&[note_id]).await?;
        let note = notes
            .pop()
            .ok_or_else(|| BridgeError::Protocol(format!("note was not found: {}", note_id)))?;
        Ok(note.into_ordered_fields())
    }

    pub async fn update_note_fields(
        &self,
        note_id: u64,
        fields: &HashMap<String, String>,
    ) -> Result<(), BridgeError> {
        self.call_unit(
            "updateNoteFields",
            Some(serde_json::json!({ "note": { "id": note_id, "fields": fields } })),
        )
        .await
    }

    fn mark_established(&self) {
        if !self.established.swap(true, Ordering::SeqCst) {
            println!("Bridge connection established");
            if let Some(events) = &self.events {
                let _ = events.send(ConnectionEvent::BridgeEstablished);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::Mutex,
    };

    use super::*;
    use crate::anki::types::ApiResponse;

    struct FakeTransport {
        responses: Mutex<VecDeque<ApiResponse<Value>>>,
        calls: Mutex<Vec<(String, Option<Value>)>>,
    }

    impl FakeTransport {
        fn new(responses: Vec<ApiResponse<Value>>) -> Self {
            Self { responses: Mutex::new(responses.into()), calls: Mutex::new(Vec::new()) }
        }

        fn ok(result: Value) -> ApiResponse<Value> {
            ApiResponse { result: Some(result), error: None }
        }

        fn server_error(message: &str) -> ApiResponse<Value> {
            ApiResponse { result: None, error: Some(message.to_string()) }
        }
    }

    impl BridgeTransport for FakeTransport {
        async fn invoke(
            &self,
            action: &str,
            params: Option<Value>,
        ) -> Result<ApiResponse<Value>, BridgeError> {
            self.calls.lock().unwrap().push((action.to_string(), params));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| BridgeError::Transport("no scripted response".to_string()))
        }
    }

    #[tokio::test]
    async fn server_error_string_is_protocol_error() {
        let transport =
            FakeTransport::new(vec![FakeTransport::server_error("note was not found: 42")]);
        let client = BridgeClient::with_transport(transport);

        let result = client.update_note_fields(42, &HashMap::new()).await;
        match result {
            Err(BridgeError::Protocol(message)) => {
                assert_eq!(message, "note was not found: 42")
            }
            other => panic!("expected protocol error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn request_carries_action_and_params() {
        let transport = FakeTransport::new(vec![FakeTransport::ok(Value::from(vec![1u64, 2]))]);
        let client = BridgeClient::with_transport(transport);

        let ids = client.notes_in_deck("日本語::N3").await.unwrap();
        assert_eq!(ids, vec![1, 2]);

        let calls = client.transport.calls.lock().unwrap();
        let (action, params) = &calls[0];
        assert_eq!(action, "findNotes");
        assert_eq!(params.as_ref().unwrap()["query"], "deck:\"日本語::N3\"");
    }

    #[test]
    fn deck_query_escapes_quotes() {
        assert_eq!(deck_query("My \"Best\" Deck"), "deck:\"My \\\"Best\\\" Deck\"");
    }

    #[tokio::test]
    async fn batch_fetch_validates_count() {
        let note = serde_json::json!({
            "noteId": 101,
            "modelName": "Basic",
            "fields": { "Front": { "value": "a", "order": 0 } }
        });
        let transport =
            FakeTransport::new(vec![FakeTransport::ok(Value::Array(vec![note]))]);
        let client = BridgeClient::with_transport(transport);

        match client.notes_info(&[101, 102, 103]).await {
            Err(BridgeError::Transport(message)) => {
                assert!(message.contains("1 notes for 3 ids"))
            }
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn batch_fetch_preserves_input_order() {
        let notes: Vec<Value> = [101u64, 102, 103]
            .iter()
            .map(|id| {
                serde_json::json!({
                    "noteId": id,
                    "modelName": "Basic",
                    "fields": { "Front": { "value": id.to_string(), "order": 0 } }
                })
            })
            .collect();
        let transport = FakeTransport::new(vec![FakeTransport::ok(Value::Array(notes))]);
        let client = BridgeClient::with_transport(transport);

        let fetched = client.notes_info(&[101, 102, 103]).await.unwrap();
        let ids: Vec<u64> = fetched.iter().map(|n| n.note_id).collect();
        assert_eq!(ids, vec![101, 102, 103]);
    }

    #[tokio::test]
    async fn empty_batch_skips_the_round_trip() {
        let transport = FakeTransport::new(vec![]);
        let client = BridgeClient::with_transport(transport);

        assert!(client.notes_info(&[]).await.unwrap().is_empty());
        assert!(client.transport.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn note_fields_come_back_order_sorted() {
        let note = serde_json::json!({
            "noteId": 7,
            "modelName": "Basic",
            "fields": {
                "Back": { "value": "b", "order": 1 },
                "Front": { "value": "f", "order": 0 }
            }
        });
        let transport =
            FakeTransport::new(vec![FakeTransport::ok(Value::Array(vec![note]))]);
        let client = BridgeClient::with_transport(transport);

        let fields = client.note_fields(7).await.unwrap();
        let names: Vec<&str> = fields.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["Front", "Back"]);
    }

    #[tokio::test]
    async fn established_event_fires_once() {
        let transport = FakeTransport::new(vec![
            FakeTransport::ok(Value::from(6)),
            FakeTransport::ok(Value::from(6)),
        ]);
        let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
        let client = BridgeClient::with_transport(transport).on_events(sender);

        client.version().await.unwrap();
        client.version().await.unwrap();

        assert!(matches!(receiver.try_recv(), Ok(ConnectionEvent::BridgeEstablished)));
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_call_leaves_latch_unset() {
        let transport = FakeTransport::new(vec![
            FakeTransport::server_error("collection is not available"),
            FakeTransport::ok(Value::from(6)),
        ]);
        let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
        let client = BridgeClient::with_transport(transport).on_events(sender);

        assert!(client.version().await.is_err());
        assert!(receiver.try_recv().is_err());

        client.version().await.unwrap();
        assert!(matches!(receiver.try_recv(), Ok(ConnectionEvent::BridgeEstablished)));
    }

    #[tokio::test]
    async fn missing_result_on_typed_call_is_transport_error() {
        let transport =
            FakeTransport::new(vec![ApiResponse { result: None, error: None }]);
        let client = BridgeClient::with_transport(transport);

        match client.deck_names().await {
            Err(BridgeError::Transport(message)) => {
                assert!(message.contains("missing result"))
            }
            other => panic!("expected transport error, got {:?}", other),
        }
    }
}
