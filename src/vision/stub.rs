//! Scripted model for tests and offline runs.

use super::VisionModel;
use crate::{
    error::{MenuError, Result},
    models::{Fragment, FragmentStream, ModelRequest},
};
use async_trait::async_trait;
use futures::stream;
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Step {
    Emit(Fragment),
    Fail(String),
}

/// Replays the same fragments on every call and remembers the last request.
#[derive(Debug, Default)]
pub struct StubVisionClient {
    steps: Vec<Step>,
    reject: Option<String>,
    last_request: Mutex<Option<ModelRequest>>,
}

impl StubVisionClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut client = Self::new();
        for text in fragments {
            client = client.then_emit(Fragment::text(text));
        }
        client
    }

    /// Answers `{}`, the model's "none of the dishes" reply.
    pub fn no_match() -> Self {
        Self::with_fragments(["```json\n{}\n```"])
    }

    pub fn then_emit(mut self, fragment: Fragment) -> Self {
        self.steps.push(Step::Emit(fragment));
        self
    }

    /// Ends the stream with a transport failure after the fragments so far.
    pub fn then_fail(mut self, message: impl Into<String>) -> Self {
        self.steps.push(Step::Fail(message.into()));
        self
    }

    /// Refuses the request before any fragment is produced.
    pub fn rejecting(message: impl Into<String>) -> Self {
        Self {
            reject: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn last_request(&self) -> Option<ModelRequest> {
        self.last_request.lock().ok().and_then(|r| r.clone())
    }
}

#[async_trait]
impl VisionModel for StubVisionClient {
    fn provider(&self) -> &'static str {
        "stub"
    }

    async fn stream(&self, request: &ModelRequest) -> Result<FragmentStream> {
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        if let Some(message) = &self.reject {
            return Err(MenuError::Model(message.clone()));
        }

        let mut items: Vec<Result<Fragment>> = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            match step {
                Step::Emit(fragment) => items.push(Ok(fragment.clone())),
                Step::Fail(message) => {
                    items.push(Err(MenuError::Model(message.clone())));
                    break;
                }
            }
        }

        Ok(Box::pin(stream::iter(items)))
    }
}
