//! Finds tatar, pizza and spaghetti on a photographed restaurant menu.
//!
//! The image is sent to a vision-capable model, the streamed answer is
//! buffered to the end, and the JSON inside it is validated and mapped to
//! [`DishRecord`]s.

pub mod accumulator;
pub mod config;
pub mod encoder;
pub mod error;
pub mod extractor;
pub mod logger;
pub mod models;
pub mod pipeline;
#[cfg(feature = "server")]
pub mod server;
pub mod vision;

pub use config::{BedrockConfig, Config, ModelProvider, OpenAiConfig};
pub use error::{ExtractionError, InputError, MenuError, Result};
pub use models::{DishList, DishRecord, Fragment, ImagePayload, ModelRequest};
pub use pipeline::MenuScanner;
pub use vision::{BedrockVisionClient, OpenAiVisionClient, StubVisionClient, VisionModel};
