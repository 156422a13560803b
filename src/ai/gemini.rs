use std::{
    sync::Arc,
    time::Duration,
};

use reqwest::Client;
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    ai::keys::{
        ApiKeyStore,
        GEMINI_API_KEY,
    },
    core::AnkiBridgeError,
};

const GEMINI_MODEL: &str = "gemini-2.0-flash-001";
const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GENERATE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

/// Thin `generate(prompt) -> text` client for the AI provider's REST
/// endpoint. The key is read per call so a key saved in settings takes
/// effect without reconstruction.
pub struct GeminiClient {
    http: Client,
    base: String,
    keys: Arc<dyn ApiKeyStore>,
}

impl GeminiClient {
    pub fn new(keys: Arc<dyn ApiKeyStore>) -> Self {
        Self::with_base(GEMINI_BASE, keys)
    }

    pub fn with_base(base: impl Into<String>, keys: Arc<dyn ApiKeyStore>) -> Self {
        Self { http: Client::new(), base: base.into(), keys }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, AnkiBridgeError> {
        let api_key = self.keys.get(GEMINI_API_KEY).ok_or(AnkiBridgeError::MissingApiKey)?;
        let url = format!("{}/{}:generateContent?key={}", self.base, GEMINI_MODEL, api_key);

        let request = GenerateRequest {
            contents: vec![Content { parts: vec![Part { text: prompt.to_string() }] }],
        };

        let response = self
            .http
            .post(&url)
            .timeout(GENERATE_TIMEOUT)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: GenerateResponse = response.json().await?;
        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AnkiBridgeError::EmptyAiResponse);
        }

        Ok(text)
    }
}

/// Prompt for filling one field from its stored instruction.
pub fn field_prompt(field_name: &str, instruction: &str) -> String {
    format!(
        "You are an AI assistant helping to create content for flashcards.\n\
         Generate content for the \"{}\" field with the following instruction:\n{}",
        field_name, instruction
    )
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::Mutex,
    };

    use super::*;
    use crate::testutil::FakeBridge;

    struct MemoryKeys(Mutex<HashMap<String, String>>);

    impl MemoryKeys {
        fn with_key(value: &str) -> Arc<Self> {
            let mut map = HashMap::new();
            map.insert(GEMINI_API_KEY.to_string(), value.to_string());
            Arc::new(Self(Mutex::new(map)))
        }

        fn empty() -> Arc<Self> {
            Arc::new(Self(Mutex::new(HashMap::new())))
        }
    }

    impl ApiKeyStore for MemoryKeys {
        fn get(&self, key: &str) -> Option<String> {
            self.0.lock().unwrap().get(key).cloned().filter(|v| !v.is_empty())
        }

        fn set(&self, key: &str, value: &str) -> Result<(), AnkiBridgeError> {
            self.0.lock().unwrap().insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_network() {
        let client = GeminiClient::with_base("http://127.0.0.1:1", MemoryKeys::empty());

        match client.generate("prompt").await {
            Err(AnkiBridgeError::MissingApiKey) => {}
            other => panic!("expected missing key error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unwraps_first_candidate_text() {
        let server = FakeBridge::respond(
            r#"{"candidates": [{"content": {"parts": [{"text": "A lamp you switch on."}]}}]}"#,
        )
        .await;
        let client = GeminiClient::with_base(server.base_url(), MemoryKeys::with_key("k"));

        let text = client.generate("describe 電気").await.unwrap();
        assert_eq!(text, "A lamp you switch on.");
    }

    #[tokio::test]
    async fn empty_candidates_are_an_error_not_empty_text() {
        let server = FakeBridge::respond(r#"{"candidates": []}"#).await;
        let client = GeminiClient::with_base(server.base_url(), MemoryKeys::with_key("k"));

        match client.generate("prompt").await {
            Err(AnkiBridgeError::EmptyAiResponse) => {}
            other => panic!("expected empty response error, got {:?}", other),
        }
    }

    #[test]
    fn field_prompt_names_the_field_and_instruction() {
        let prompt = field_prompt("Example", "Write one simple sentence using the word.");
        assert!(prompt.contains("\"Example\" field"));
        assert!(prompt.contains("Write one simple sentence"));
    }
}
