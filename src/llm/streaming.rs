//! Streaming response handling

use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;
use futures::StreamExt;

use crate::errors::Result;

/// Content type assumed when the generation service does not send one
pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Raw streaming response from the generation service.
///
/// The bytes are forwarded as received; nothing here parses or buffers them
/// unless the owner calls [`StreamingResponse::collect_all`].
pub struct StreamingResponse {
    content_type: String,
    stream: ByteStream,
}

impl StreamingResponse {
    pub fn new(stream: ByteStream) -> Self {
        Self {
            content_type: EVENT_STREAM_CONTENT_TYPE.to_string(),
            stream,
        }
    }

    /// Build a response from in-memory chunks
    pub fn from_chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let chunks: Vec<Result<Bytes>> = chunks.into_iter().map(|c| Ok(c.into())).collect();
        Self::new(Box::pin(futures::stream::iter(chunks)))
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Collect all chunks into a single string
    pub async fn collect_all(mut self) -> Result<String> {
        let mut buffer = Vec::new();
        while let Some(chunk) = self.stream.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Get the content type and the underlying stream
    pub fn into_parts(self) -> (String, ByteStream) {
        (self.content_type, self.stream)
    }
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}
