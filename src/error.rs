use thiserror::Error;

#[derive(Debug, Error)]
pub enum MenuError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Input error: {0}")]
    Input(#[from] InputError),
    #[error("Model error: {0}")]
    Model(String),
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),
}

/// Problems with the uploaded image, raised before the model is called.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("no image uploaded")]
    Missing,
    #[error("image is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed upload: {0}")]
    Malformed(String),
}

/// The model answered, but not in the agreed shape.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("model output is not a JSON object ({reason}): {raw}")]
    InvalidJson { raw: String, reason: String },
    #[error("malformed dish entry{}: {reason}", .index.map(|i| format!(" #{}", i)).unwrap_or_default())]
    MalformedDishEntry { index: Option<usize>, reason: String },
}

impl MenuError {
    /// True for failures caused by the caller's upload rather than the pipeline.
    pub fn is_client_error(&self) -> bool {
        matches!(self, MenuError::Input(_))
    }
}

pub type Result<T> = std::result::Result<T, MenuError>;
