//! Turn orchestration
//!
//! Drives one assistant turn end-to-end: dispatches decoded upstream
//! signals into the per-kind delta trackers, reconciles usage on
//! completion, and guarantees exactly one terminal event per turn.

use chatrelay_core::{
    BlockKind, DeltaTracker, Error, Result, StreamEvent, TokenUsage, UsageSummary,
};
use chatrelay_upstream::{FinalResponse, UpstreamEvent};
use chatrelay_usage::UsageEnricher;
use futures_util::{Stream, StreamExt};

/// Sink for the outward event sequence.
///
/// An emit error means the consumer is gone; the orchestrator stops and
/// releases the upstream subscription.
pub trait EventSink: Send {
    /// Deliver one event
    fn emit(&mut self, event: StreamEvent) -> Result<()>;
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn emit(&mut self, event: StreamEvent) -> Result<()> {
        (**self).emit(event)
    }
}

/// Collecting sink, mostly useful in tests
impl EventSink for Vec<StreamEvent> {
    fn emit(&mut self, event: StreamEvent) -> Result<()> {
        self.push(event);
        Ok(())
    }
}

/// Accumulated text of one finished block
#[derive(Debug, Clone, PartialEq)]
pub struct BlockText {
    pub id: String,
    pub text: String,
}

/// Outcome of a normally finished turn
#[derive(Debug, Clone, Default)]
pub struct TurnSummary {
    /// Visible text blocks in first-seen order
    pub text_blocks: Vec<BlockText>,

    /// Model that served the turn, when reported
    pub model: Option<String>,

    /// Usage attached to the turn, absent when enrichment failed
    pub usage: Option<UsageSummary>,
}

impl TurnSummary {
    /// All visible text joined into one string
    pub fn text(&self) -> String {
        self.text_blocks
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// One-turn orchestrator over a decoded upstream signal stream
pub struct TurnOrchestrator {
    text: DeltaTracker,
    reasoning: DeltaTracker,
    terminal: bool,
}

impl Default for TurnOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnOrchestrator {
    /// Create an orchestrator for a fresh turn
    pub fn new() -> Self {
        Self {
            text: DeltaTracker::new(BlockKind::Text),
            reasoning: DeltaTracker::new(BlockKind::Reasoning),
            terminal: false,
        }
    }

    /// Drive the turn to completion.
    ///
    /// Emits `start` immediately, translates every signal, and terminates
    /// with exactly one of `finish` or `error`. Failures are re-raised to
    /// the caller after the error event is emitted.
    pub async fn run<U, S, E>(
        mut self,
        mut upstream: U,
        sink: &mut S,
        enricher: &E,
    ) -> Result<TurnSummary>
    where
        U: Stream<Item = Result<UpstreamEvent>> + Unpin,
        S: EventSink,
        E: UsageEnricher + ?Sized,
    {
        let outcome = self.drive(&mut upstream, sink, enricher).await;

        match &outcome {
            Ok(_) => {
                metrics::counter!("chatrelay_turns_total", "outcome" => "finish").increment(1);
            }
            Err(e) => {
                // The failure dispatch already emitted its error event;
                // anything else terminates here before re-raising.
                if !self.terminal {
                    self.terminal = true;
                    let error_event = StreamEvent::Error {
                        error_text: e.to_string(),
                    };
                    if sink.emit(error_event).is_err() {
                        tracing::debug!("consumer gone before error event");
                    }
                }
                metrics::counter!("chatrelay_turns_total", "outcome" => "error").increment(1);
            }
        }

        outcome
    }

    async fn drive<U, S, E>(
        &mut self,
        upstream: &mut U,
        sink: &mut S,
        enricher: &E,
    ) -> Result<TurnSummary>
    where
        U: Stream<Item = Result<UpstreamEvent>> + Unpin,
        S: EventSink,
        E: UsageEnricher + ?Sized,
    {
        sink.emit(StreamEvent::Start)?;

        while let Some(signal) = upstream.next().await {
            match signal? {
                UpstreamEvent::OutputTextDelta { id, delta } => {
                    for event in self.text.write_delta(&id, &delta) {
                        sink.emit(event)?;
                    }
                }
                UpstreamEvent::OutputTextDone { id } => {
                    if let Some(event) = self.text.finish(&id) {
                        sink.emit(event)?;
                    }
                }
                UpstreamEvent::ReasoningTextDelta { id, delta } => {
                    for event in self.reasoning.write_delta(&id, &delta) {
                        sink.emit(event)?;
                    }
                }
                UpstreamEvent::ReasoningTextDone { id } => {
                    if let Some(event) = self.reasoning.finish(&id) {
                        sink.emit(event)?;
                    }
                }
                UpstreamEvent::Completed(response) => {
                    return self.finish_turn(sink, enricher, response).await;
                }
                UpstreamEvent::Failed { message } => {
                    let message =
                        message.unwrap_or_else(|| "assistant run failed unexpectedly".to_string());
                    self.terminal = true;
                    sink.emit(StreamEvent::Error {
                        error_text: message.clone(),
                    })?;
                    return Err(Error::upstream(message));
                }
                UpstreamEvent::Ignored => {}
            }
        }

        // Upstream ended without a terminal signal: close the turn with
        // whatever we have, zero-filled usage included.
        tracing::warn!("upstream ended without terminal signal");
        self.finish_turn(sink, enricher, FinalResponse::default()).await
    }

    async fn finish_turn<S, E>(
        &mut self,
        sink: &mut S,
        enricher: &E,
        response: FinalResponse,
    ) -> Result<TurnSummary>
    where
        S: EventSink,
        E: UsageEnricher + ?Sized,
    {
        // Text blocks close before reasoning blocks
        for event in self.text.finish_all() {
            sink.emit(event)?;
        }
        for event in self.reasoning.finish_all() {
            sink.emit(event)?;
        }

        let tokens = TokenUsage::from_raw(&response.usage.unwrap_or_default());
        let model = response.model;

        // Usage is best-effort: an enrichment failure must not abort the
        // turn, the assistant text is already delivered.
        let usage = match enricher.enrich(tokens, model.as_deref()).await {
            Ok(summary) => {
                sink.emit(StreamEvent::Usage {
                    data: summary.clone(),
                })?;
                Some(summary)
            }
            Err(e) => {
                tracing::warn!(error = %e, "usage enrichment failed");
                None
            }
        };

        self.terminal = true;
        sink.emit(StreamEvent::Finish)?;

        let text_blocks = self
            .text
            .blocks()
            .map(|block| BlockText {
                id: block.id.clone(),
                text: block.text().to_string(),
            })
            .collect();

        Ok(TurnSummary {
            text_blocks,
            model,
            usage,
        })
    }
}
