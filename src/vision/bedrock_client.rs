use super::VisionModel;
use crate::{
    config::BedrockConfig,
    error::{MenuError, Result},
    models::{Fragment, FragmentStream, ModelRequest},
};
use async_trait::async_trait;
use aws_sdk_bedrockruntime::{
    error::ProvideErrorMetadata, primitives::Blob, types::ResponseStream, Client,
};
use serde_json::json;
use std::fmt::Display;
use tokio::sync::mpsc::Sender;
use tokio_stream::wrappers::ReceiverStream;

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Claude 3 models on AWS Bedrock, through the messages API.
#[derive(Clone)]
pub struct BedrockVisionClient {
    client: Client,
}

impl BedrockVisionClient {
    pub async fn new(bedrock_config: BedrockConfig) -> Result<Self> {
        let region = aws_sdk_bedrockruntime::config::Region::new(
            bedrock_config
                .region
                .clone()
                .unwrap_or_else(|| "us-east-1".to_string()),
        );

        let aws_config = if let (Some(access_key), Some(secret_key)) =
            (&bedrock_config.access_key, &bedrock_config.secret_key)
        {
            aws_config::from_env()
                .credentials_provider(aws_sdk_bedrockruntime::config::Credentials::new(
                    access_key,
                    secret_key,
                    None,
                    None,
                    "menuscan",
                ))
                .region(region)
                .load()
                .await
        } else {
            log::warn!("⚠️  No AWS credentials configured, falling back to the default credential chain");
            aws_config::from_env().region(region).load().await
        };

        Ok(Self::from_client(Client::new(&aws_config)))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    fn build_request_payload(request: &ModelRequest) -> Result<serde_json::Value> {
        if !request.model_id.starts_with("anthropic.claude-3")
            && !request.model_id.starts_with("arn:aws:bedrock")
        {
            return Err(MenuError::Config(format!(
                "Model {} does not accept images, use an anthropic.claude-3 model",
                request.model_id
            )));
        }

        Ok(json!({
            "anthropic_version": ANTHROPIC_VERSION,
            "max_tokens": request.max_tokens,
            "messages": [
                {
                    "role": "user",
                    "content": [
                        {
                            "type": "image",
                            "source": {
                                "type": "base64",
                                "media_type": request.mime_type,
                                "data": request.image_base64
                            }
                        },
                        { "type": "text", "text": request.instruction }
                    ]
                }
            ]
        }))
    }

    /// Only `content_block_delta` events carry text; the rest are bookkeeping.
    fn parse_stream_chunk(chunk_str: &str) -> Result<Fragment> {
        let json: serde_json::Value = serde_json::from_str(chunk_str)
            .map_err(|e| MenuError::Model(format!("Undecodable stream event: {}", e)))?;

        match json["type"].as_str() {
            Some("content_block_delta") => Ok(Fragment {
                content: json["delta"]["text"].as_str().map(String::from),
            }),
            Some("error") => Err(MenuError::Model(format!(
                "Bedrock stream error: {}",
                json["error"]["message"].as_str().unwrap_or("no message")
            ))),
            _ => Ok(Fragment::empty()),
        }
    }
}

/// Turns one receive result into a fragment; `None` once the stream has ended.
fn map_event<E: Display>(
    event: std::result::Result<Option<ResponseStream>, E>,
) -> Option<Result<Fragment>> {
    match event {
        Ok(Some(ResponseStream::Chunk(chunk))) => Some(match chunk.bytes {
            Some(bytes) => {
                BedrockVisionClient::parse_stream_chunk(&String::from_utf8_lossy(bytes.as_ref()))
            }
            None => Ok(Fragment::empty()),
        }),
        Ok(Some(_)) => Some(Ok(Fragment::empty())),
        Ok(None) => None,
        Err(e) => Some(Err(MenuError::Model(format!("Stream interrupted: {}", e)))),
    }
}

/// Sends one event on; false once the stream is over for any reason.
async fn forward<E: Display>(
    tx: &Sender<Result<Fragment>>,
    event: std::result::Result<Option<ResponseStream>, E>,
) -> bool {
    match map_event(event) {
        Some(item) => {
            let keep_going = item.is_ok();
            tx.send(item).await.is_ok() && keep_going
        }
        None => false,
    }
}

#[async_trait]
impl VisionModel for BedrockVisionClient {
    fn provider(&self) -> &'static str {
        "bedrock"
    }

    async fn stream(&self, request: &ModelRequest) -> Result<FragmentStream> {
        let request_payload = Self::build_request_payload(request)?;
        let request_json = serde_json::to_string(&request_payload)
            .map_err(|e| MenuError::Model(format!("Failed to serialize request: {}", e)))?;

        log::info!("Invoking streaming model: {}", request.model_id);

        let response = self
            .client
            .invoke_model_with_response_stream()
            .model_id(&request.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(request_json.into_bytes()))
            .send()
            .await
            .map_err(|e| {
                log::error!("Bedrock streaming error details: {:?}", e);

                if let Some(service_error) = e.as_service_error() {
                    MenuError::Model(format!(
                        "Bedrock service error: {} - {}",
                        service_error.code().unwrap_or("unknown"),
                        service_error.message().unwrap_or("no message")
                    ))
                } else {
                    MenuError::Model(format!("AWS SDK error: {}", e))
                }
            })?;

        let (tx, rx) = tokio::sync::mpsc::channel(100);
        let mut event_receiver = response.body;

        tokio::spawn(async move {
            while forward(&tx, event_receiver.recv().await).await {}
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_bedrockruntime::types::PayloadPart;

    fn chunk(json: &str) -> std::result::Result<Option<ResponseStream>, String> {
        Ok(Some(ResponseStream::Chunk(
            PayloadPart::builder()
                .bytes(Blob::new(json.as_bytes().to_vec()))
                .build(),
        )))
    }

    #[test]
    fn test_payload_carries_image_block() {
        let request =
            ModelRequest::menu_scan("QUJD".into(), "anthropic.claude-3-haiku-20240307-v1:0");
        let payload = BedrockVisionClient::build_request_payload(&request).unwrap();
        assert_eq!(payload["anthropic_version"], ANTHROPIC_VERSION);
        assert_eq!(payload["max_tokens"], 300);
        let content = &payload["messages"][0]["content"];
        assert_eq!(content[0]["source"]["media_type"], "image/jpeg");
        assert_eq!(content[0]["source"]["data"], "QUJD");
        assert_eq!(content[1]["text"], request.instruction.as_str());
    }

    #[test]
    fn test_text_only_models_are_refused() {
        let request = ModelRequest::menu_scan("QUJD".into(), "amazon.titan-text-express-v1");
        assert!(matches!(
            BedrockVisionClient::build_request_payload(&request),
            Err(MenuError::Config(_))
        ));
    }

    #[test]
    fn test_parse_stream_chunk() {
        let delta = r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"{\"dishes\""}}"#;
        assert_eq!(
            BedrockVisionClient::parse_stream_chunk(delta).unwrap(),
            Fragment::text("{\"dishes\"")
        );

        let start = r#"{"type":"message_start","message":{"id":"msg_1","role":"assistant"}}"#;
        assert_eq!(
            BedrockVisionClient::parse_stream_chunk(start).unwrap(),
            Fragment::empty()
        );

        let error = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        assert!(matches!(
            BedrockVisionClient::parse_stream_chunk(error),
            Err(MenuError::Model(msg)) if msg.contains("Overloaded")
        ));
    }

    #[tokio::test]
    async fn test_forward_sends_chunk_text() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let delta = r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Pizza"}}"#;
        assert!(forward(&tx, chunk(delta)).await);
        assert_eq!(rx.recv().await.unwrap().unwrap(), Fragment::text("Pizza"));
    }

    #[tokio::test]
    async fn test_forward_stops_on_receive_error() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let event: std::result::Result<Option<ResponseStream>, String> = Err("connection reset".into());
        assert!(!forward(&tx, event).await);
        assert!(matches!(
            rx.recv().await.unwrap(),
            Err(MenuError::Model(msg)) if msg.contains("connection reset")
        ));
    }

    #[tokio::test]
    async fn test_forward_stops_quietly_at_end_of_stream() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        assert!(!forward(&tx, Ok::<_, String>(None)).await);
        drop(tx);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_forward_stops_after_stream_error_event() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let error = r#"{"type":"error","error":{"message":"Overloaded"}}"#;
        assert!(!forward(&tx, chunk(error)).await);
        assert!(matches!(rx.recv().await.unwrap(), Err(MenuError::Model(_))));
    }
}
