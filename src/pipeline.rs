use crate::{
    accumulator, encoder,
    error::{MenuError, Result},
    extractor,
    logger::Timer,
    models::{DishList, ImagePayload, ModelRequest},
    vision::VisionModel,
};
use std::{path::Path, sync::Arc};

/// Runs the image-to-dishes pipeline. Holds only read-only state, so one
/// instance can serve any number of concurrent scans.
#[derive(Clone)]
pub struct MenuScanner {
    client: Arc<dyn VisionModel>,
    model_id: String,
    upload_limit: usize,
}

impl MenuScanner {
    pub fn new(client: Arc<dyn VisionModel>, model_id: impl Into<String>) -> Self {
        Self {
            client,
            model_id: model_id.into(),
            upload_limit: crate::config::DEFAULT_UPLOAD_LIMIT,
        }
    }

    pub fn from_config(client: Arc<dyn VisionModel>, config: &crate::config::Config) -> Self {
        Self::new(client, config.model())
            .with_upload_limit(config.upload_limit)
    }

    pub fn with_upload_limit(mut self, bytes: usize) -> Self {
        self.upload_limit = bytes;
        self
    }

    pub fn upload_limit(&self) -> usize {
        self.upload_limit
    }

    /// Encodes the image, streams the model's answer to the end and extracts
    /// the dishes from it. The first failure is returned as is.
    pub async fn scan(&self, image: &[u8]) -> Result<DishList> {
        let _timer = Timer::new("menu scan");

        let request = ModelRequest::menu_scan(encoder::encode(image), &self.model_id);
        let stream = self.client.stream(&request).await?;
        let text = accumulator::accumulate(stream).await?;

        match extractor::extract_dishes(&text) {
            Ok(dishes) => {
                log::info!("🍽️  Found {} matching dishes", dishes.len());
                Ok(dishes)
            }
            Err(e) => {
                if let MenuError::Extraction(_) = &e {
                    log::warn!("⚠️  Model output did not match the dish contract: {}", text);
                }
                Err(e)
            }
        }
    }

    pub async fn scan_payload(&self, payload: ImagePayload) -> Result<DishList> {
        self.scan(payload.as_bytes()).await
    }

    pub async fn scan_file(&self, path: impl AsRef<Path>) -> Result<DishList> {
        let payload = ImagePayload::from_file(path, self.upload_limit).await?;
        self.scan_payload(payload).await
    }
}
