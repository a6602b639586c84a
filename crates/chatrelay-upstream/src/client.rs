//! Upstream HTTP client
//!
//! Opens one streaming request per assistant turn and exposes the body as
//! a decoded signal stream. Dropping the stream releases the connection,
//! which cancels the upstream generation.

use crate::decode::ResponsesDecoder;
use crate::request::ResponseRequest;
use crate::signal::UpstreamEvent;
use crate::sse::SseFrames;
use chatrelay_core::{Error, Result};
use futures::stream::BoxStream;
use futures_util::StreamExt;
use std::time::Duration;

/// HTTP client for the provider's Responses API
#[derive(Debug, Clone)]
pub struct ResponsesClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ResponsesClient {
    /// Create a client for the given API base URL
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(300)) // 5 minute ceiling per turn
            .build()
            .map_err(|e| Error::config(format!("http client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Open a streaming turn and decode its SSE body into signals.
    ///
    /// The `[DONE]` marker terminates the stream; unknown event kinds pass
    /// through as [`UpstreamEvent::Ignored`].
    pub async fn stream_response(
        &self,
        request: &ResponseRequest,
    ) -> Result<BoxStream<'static, Result<UpstreamEvent>>> {
        let url = format!("{}/responses", self.base_url);
        tracing::debug!(model = %request.model, "opening upstream stream");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Accept", "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| Error::upstream(format!("upstream request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::upstream(format!("upstream returned {status}: {body}")));
        }

        let decoder = ResponsesDecoder::new();
        let events = SseFrames::new(response.bytes_stream())
            .map(move |frame| match frame {
                Ok(payload) if decoder.is_done_marker(&payload) => None,
                Ok(payload) => Some(decoder.decode_data(&payload)),
                Err(e) => Some(Err(e)),
            })
            .take_while(|item| futures::future::ready(item.is_some()))
            .filter_map(futures::future::ready);

        Ok(events.boxed())
    }
}
