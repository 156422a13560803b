use std::time::Duration;

use crate::{
    anki::transport::{
        BridgeTransport,
        HttpTransport,
        API_VERSION,
    },
    core::BridgeError,
};

/// Candidate base URLs in priority order. Different sandboxed runtimes expose
/// the host loopback under different addresses: plain loopback first, then
/// the emulator gateway alias, then the hostname alias.
pub const BRIDGE_CANDIDATES: &[&str] =
    &["http://127.0.0.1:8765", "http://10.0.2.2:8765", "http://localhost:8765"];

/// A liveness answer below this counts as "bridge unavailable", not success.
pub const MIN_BRIDGE_VERSION: u32 = API_VERSION;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

pub struct EndpointResolver {
    candidates: Vec<String>,
    probe_timeout: Duration,
}

impl EndpointResolver {
    pub fn new() -> Self {
        Self::with_candidates(
            BRIDGE_CANDIDATES.iter().map(|c| c.to_string()).collect(),
            DEFAULT_PROBE_TIMEOUT,
        )
    }

    pub fn with_candidates(candidates: Vec<String>, probe_timeout: Duration) -> Self {
        Self { candidates, probe_timeout }
    }

    /// First candidate whose liveness probe answers with a version number at
    /// or above the required minimum; `None` when every candidate fails.
    ///
    /// Probes run strictly in priority order, each resolved before the next
    /// begins. An early success must short-circuit the slower aliases, and
    /// probing several loopback aliases of one program at once can duplicate
    /// side effects on it.
    pub async fn resolve(&self) -> Option<String> {
        for base_url in &self.candidates {
            match self.probe(base_url).await {
                Ok(version) if version >= MIN_BRIDGE_VERSION => {
                    println!("Bridge is reachable at {} (version {})", base_url, version);
                    return Some(base_url.clone());
                }
                Ok(version) => {
                    eprintln!(
                        "Bridge at {} answered version {}, need {} or newer",
                        base_url, version, MIN_BRIDGE_VERSION
                    );
                }
                Err(err) => {
                    eprintln!("No bridge at {}: {}", base_url, err);
                }
            }
        }

        None
    }

    async fn probe(&self, base_url: &str) -> Result<u32, BridgeError> {
        let transport = HttpTransport::with_timeout(base_url, self.probe_timeout);
        let response = transport.invoke("version", None).await?;

        if let Some(message) = response.error {
            return Err(BridgeError::Protocol(message));
        }

        response
            .result
            .and_then(|value| value.as_u64())
            .map(|version| version as u32)
            .ok_or_else(|| {
                BridgeError::Transport("liveness probe returned no version number".to_string())
            })
    }
}

impl Default for EndpointResolver {
    fn default() -> Self {
        Self::new()
    }
}
