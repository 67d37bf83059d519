use super::VisionModel;
use crate::{
    config::OpenAiConfig,
    error::{MenuError, Result},
    models::{Fragment, FragmentStream, ModelRequest},
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc::Sender;
use tokio_stream::wrappers::ReceiverStream;

/// Chat completions client for OpenAI and compatible endpoints.
#[derive(Clone)]
pub struct OpenAiVisionClient {
    client: Client,
    config: OpenAiConfig,
    headers: HeaderMap,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
}

/// One meaningful line of a server-sent event stream.
#[derive(Debug, PartialEq, Eq)]
enum SseLine {
    Data(String),
    Done,
}

/// Splits the response body into lines; chunks may end mid-line and
/// mid-character, so bytes are buffered until a newline arrives.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<SseLine> {
        self.buffer.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(parsed) = parse_sse_line(&String::from_utf8_lossy(&line)) {
                lines.push(parsed);
            }
        }
        lines
    }

    fn finish(&mut self) -> Option<SseLine> {
        let rest = std::mem::take(&mut self.buffer);
        parse_sse_line(&String::from_utf8_lossy(&rest))
    }
}

fn parse_sse_line(line: &str) -> Option<SseLine> {
    let line = line.trim_end_matches(&['\r', '\n'][..]);
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data);
    if data.trim() == "[DONE]" {
        Some(SseLine::Done)
    } else if data.trim().is_empty() {
        None
    } else {
        Some(SseLine::Data(data.to_string()))
    }
}

fn parse_chunk(data: &str) -> Result<Fragment> {
    let chunk: ChatCompletionChunk = serde_json::from_str(data)
        .map_err(|e| MenuError::Model(format!("Undecodable stream event ({}): {}", e, data)))?;

    if let Some(error) = chunk.error {
        return Err(MenuError::Model(format!(
            "OpenAI stream error: {}",
            error.message.unwrap_or_else(|| "no message".to_string())
        )));
    }

    Ok(Fragment {
        content: chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content),
    })
}

impl OpenAiVisionClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| MenuError::Config("API_KEY is required for the openai provider".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", api_key))?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        if let Some(organization) = &config.organization {
            headers.insert("OpenAI-Organization", header_value(organization)?);
        }
        if let Some(project) = &config.project {
            headers.insert("OpenAI-Project", header_value(project)?);
        }

        Ok(Self {
            client: Client::new(),
            config,
            headers,
        })
    }

    fn build_request_payload(request: &ModelRequest) -> serde_json::Value {
        json!({
            "model": request.model_id,
            "messages": [
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": request.instruction },
                        { "type": "image_url", "image_url": { "url": request.data_uri() } }
                    ]
                }
            ],
            "stream": request.stream,
            "max_tokens": request.max_tokens
        })
    }
}

/// Sends one decoded line on; false once the stream is over for any reason.
async fn forward(tx: &Sender<Result<Fragment>>, line: SseLine) -> bool {
    match line {
        SseLine::Done => false,
        SseLine::Data(data) => {
            let item = parse_chunk(&data);
            let keep_going = item.is_ok();
            tx.send(item).await.is_ok() && keep_going
        }
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| MenuError::Config(format!("Invalid header value: {}", e)))
}

#[async_trait]
impl VisionModel for OpenAiVisionClient {
    fn provider(&self) -> &'static str {
        "openai"
    }

    async fn stream(&self, request: &ModelRequest) -> Result<FragmentStream> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let payload = Self::build_request_payload(request);

        log::info!("Invoking streaming model: {}", request.model_id);
        log::debug!(
            "Image payload: {} base64 characters",
            request.image_base64.len()
        );

        let response = self
            .client
            .post(&url)
            .headers(self.headers.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                log::error!("OpenAI request failed: {:?}", e);
                MenuError::Model(format!("OpenAI request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("OpenAI rejected the request with {}: {}", status, body);
            return Err(MenuError::Model(format!(
                "OpenAI returned {}: {}",
                status, body
            )));
        }

        let (tx, rx) = tokio::sync::mpsc::channel(100);
        let mut body = Box::pin(response.bytes_stream());

        tokio::spawn(async move {
            let mut decoder = SseDecoder::default();
            while let Some(chunk) = body.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx
                            .send(Err(MenuError::Model(format!("Stream interrupted: {}", e))))
                            .await;
                        return;
                    }
                };
                for line in decoder.push(&bytes) {
                    if !forward(&tx, line).await {
                        return;
                    }
                }
            }
            let keep_going = match decoder.finish() {
                Some(line) => forward(&tx, line).await,
                None => true,
            };
            if keep_going {
                log::error!("OpenAI stream closed without [DONE]");
                let _ = tx
                    .send(Err(MenuError::Model("Stream ended before [DONE]".into())))
                    .await;
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}
