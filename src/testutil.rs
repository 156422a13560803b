//! Throwaway local HTTP bridges for exercising the transport, resolver, and
//! coordinator against real sockets.

use std::{
    net::SocketAddr,
    sync::{
        atomic::{
            AtomicUsize,
            Ordering,
        },
        Arc,
    },
    time::Duration,
};

use tokio::{
    io::{
        AsyncReadExt,
        AsyncWriteExt,
    },
    net::{
        TcpListener,
        TcpStream,
    },
    task::JoinHandle,
};

enum Behavior {
    Respond { status: &'static str, body: String, delay: Option<Duration> },
    Silent,
}

pub(crate) struct FakeBridge {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    server: JoinHandle<()>,
}

impl FakeBridge {
    /// Answers every request with `{"result": <version>, "error": null}`.
    pub async fn version(version: u32) -> Self {
        Self::respond(format!(r#"{{"result": {}, "error": null}}"#, version)).await
    }

    pub async fn respond(body: impl Into<String>) -> Self {
        Self::start(Behavior::Respond { status: "200 OK", body: body.into(), delay: None }).await
    }

    pub async fn respond_status(status: &'static str, body: impl Into<String>) -> Self {
        Self::start(Behavior::Respond { status, body: body.into(), delay: None }).await
    }

    /// Liveness answer held back by `delay` before the bytes go out.
    pub async fn delayed_version(version: u32, delay: Duration) -> Self {
        Self::start(Behavior::Respond {
            status: "200 OK",
            body: format!(r#"{{"result": {}, "error": null}}"#, version),
            delay: Some(delay),
        })
        .await
    }

    /// Accepts connections and never answers, for timeout paths.
    pub async fn silent() -> Self {
        Self::start(Behavior::Silent).await
    }

    /// Liveness responder bound to a specific port, for bring-up/tear-down
    /// sequences against a fixed candidate address.
    pub async fn version_on(port: u16, version: u32) -> Self {
        Self::start_on(
            format!("127.0.0.1:{}", port),
            Behavior::Respond {
                status: "200 OK",
                body: format!(r#"{{"result": {}, "error": null}}"#, version),
                delay: None,
            },
        )
        .await
    }

    async fn start(behavior: Behavior) -> Self {
        Self::start_on("127.0.0.1:0".to_string(), behavior).await
    }

    async fn start_on(bind_addr: String, behavior: Behavior) -> Self {
        let listener = TcpListener::bind(&bind_addr).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let behavior = Arc::new(behavior);
        let hit_counter = hits.clone();
        let server = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let behavior = behavior.clone();
                let hits = hit_counter.clone();
                tokio::spawn(async move {
                    let _ = serve_one(stream, hits, behavior).await;
                });
            }
        });

        Self { addr, hits, server }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests fully received so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for FakeBridge {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn serve_one(
    mut stream: TcpStream,
    hits: Arc<AtomicUsize>,
    behavior: Arc<Behavior>,
) -> std::io::Result<()> {
    read_request(&mut stream).await?;
    hits.fetch_add(1, Ordering::SeqCst);

    match &*behavior {
        Behavior::Silent => {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        Behavior::Respond { status, body, delay } => {
            if let Some(delay) = delay {
                tokio::time::sleep(*delay).await;
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await?;
            stream.flush().await?;
        }
    }

    Ok(())
}

/// Reads one request through its Content-Length-delimited body so the client
/// never sees a reset while still writing.
async fn read_request(stream: &mut TcpStream) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buffer.extend_from_slice(&chunk[..n]);

        if let Some(header_end) = find_subslice(&buffer, b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buffer[..header_end]);
            let content_length = headers
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.trim().eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);

            let mut body_received = buffer.len() - header_end - 4;
            while body_received < content_length {
                let n = stream.read(&mut chunk).await?;
                if n == 0 {
                    return Ok(());
                }
                body_received += n;
            }
            return Ok(());
        }
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// A 127.0.0.1 URL nothing is listening on.
pub(crate) async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
