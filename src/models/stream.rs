use crate::error::Result;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// One incremental piece of model output. Providers send keep-alive and
/// bookkeeping events too, so `content` is often absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub content: Option<String>,
}

impl Fragment {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
        }
    }

    pub fn empty() -> Self {
        Self { content: None }
    }
}

pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment>> + Send>>;
