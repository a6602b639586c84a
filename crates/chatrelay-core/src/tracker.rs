//! Delta tracking state machine
//!
//! Converts an unordered sequence of per-block delta/done signals into a
//! well-formed start/delta/end event sequence. One tracker exists per
//! content kind; blocks are keyed by the upstream item id and kept in
//! first-seen order.

use crate::event::{BlockKind, StreamEvent};

/// Mutable state for one content block
#[derive(Debug)]
pub struct TrackedBlock {
    /// Opaque block id from the upstream source
    pub id: String,

    started: bool,
    finished: bool,
    text: String,
}

impl TrackedBlock {
    fn new(id: String) -> Self {
        Self {
            id,
            started: false,
            finished: false,
            text: String::new(),
        }
    }

    /// Whether a start event has been emitted for this block
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Whether an end event has been emitted for this block
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Text accumulated from every delta seen for this block
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Start/delta/end sequencer for one content kind
///
/// Guarantee: every emitted end event is preceded by exactly one start
/// event for the same id, and no delta is emitted before its start or
/// after its end.
#[derive(Debug)]
pub struct DeltaTracker {
    kind: BlockKind,
    blocks: Vec<TrackedBlock>,
}

impl DeltaTracker {
    /// Create a tracker for the given content kind
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            blocks: Vec::new(),
        }
    }

    /// Content kind this tracker sequences
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    fn entry_mut(&mut self, id: &str) -> &mut TrackedBlock {
        // Block counts per turn are small; a linear scan keeps first-seen
        // order without a side index.
        if let Some(pos) = self.blocks.iter().position(|block| block.id == id) {
            return &mut self.blocks[pos];
        }
        self.blocks.push(TrackedBlock::new(id.to_string()));
        self.blocks.last_mut().expect("just pushed")
    }

    /// Record an incremental fragment for a block.
    ///
    /// Emits the block's start event before its first delta. Empty deltas
    /// and deltas for already-finished blocks are no-ops.
    pub fn write_delta(&mut self, id: &str, delta: &str) -> Vec<StreamEvent> {
        if delta.is_empty() {
            return Vec::new();
        }

        let kind = self.kind;
        let entry = self.entry_mut(id);

        if entry.finished {
            tracing::warn!(block_id = %id, "delta after block end, dropping");
            return Vec::new();
        }

        let mut events = Vec::with_capacity(2);
        if !entry.started {
            entry.started = true;
            events.push(kind.start_event(&entry.id));
        }

        entry.text.push_str(delta);
        events.push(kind.delta_event(&entry.id, delta));
        events
    }

    /// Mark a block complete, emitting its end event.
    ///
    /// Finishing an unstarted or already-finished block is a no-op.
    pub fn finish(&mut self, id: &str) -> Option<StreamEvent> {
        let kind = self.kind;
        let entry = self.blocks.iter_mut().find(|block| block.id == id)?;

        if entry.started && !entry.finished {
            entry.finished = true;
            return Some(kind.end_event(&entry.id));
        }
        None
    }

    /// Force-finish every open block, in first-seen order.
    ///
    /// Used when the upstream ends without per-block completion signals.
    pub fn finish_all(&mut self) -> Vec<StreamEvent> {
        let kind = self.kind;
        self.blocks
            .iter_mut()
            .filter(|block| block.started && !block.finished)
            .map(|block| {
                block.finished = true;
                kind.end_event(&block.id)
            })
            .collect()
    }

    /// Tracked blocks in first-seen order
    pub fn blocks(&self) -> impl Iterator<Item = &TrackedBlock> {
        self.blocks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_tracker() -> DeltaTracker {
        DeltaTracker::new(BlockKind::Text)
    }

    #[test]
    fn test_start_precedes_first_delta() {
        let mut tracker = text_tracker();

        let events = tracker.write_delta("m1", "Hel");
        assert_eq!(
            events,
            vec![
                StreamEvent::TextStart { id: "m1".into() },
                StreamEvent::TextDelta {
                    id: "m1".into(),
                    delta: "Hel".into()
                },
            ]
        );

        // Second delta for the same block: no repeated start
        let events = tracker.write_delta("m1", "lo");
        assert_eq!(
            events,
            vec![StreamEvent::TextDelta {
                id: "m1".into(),
                delta: "lo".into()
            }]
        );

        let end = tracker.finish("m1");
        assert_eq!(end, Some(StreamEvent::TextEnd { id: "m1".into() }));

        let block = tracker.blocks().next().unwrap();
        assert_eq!(block.text(), "Hello");
    }

    #[test]
    fn test_empty_delta_is_noop() {
        let mut tracker = text_tracker();
        assert!(tracker.write_delta("m1", "").is_empty());
        assert_eq!(tracker.blocks().count(), 0);
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut tracker = text_tracker();
        tracker.write_delta("m1", "hi");

        assert!(tracker.finish("m1").is_some());
        assert!(tracker.finish("m1").is_none());
        assert!(tracker.finish_all().is_empty());
    }

    #[test]
    fn test_finish_unstarted_is_noop() {
        let mut tracker = text_tracker();
        assert!(tracker.finish("ghost").is_none());
    }

    #[test]
    fn test_finish_all_closes_open_blocks_in_order() {
        let mut tracker = text_tracker();
        tracker.write_delta("a", "1");
        tracker.write_delta("b", "2");
        tracker.write_delta("c", "3");
        tracker.finish("b");

        let ends = tracker.finish_all();
        assert_eq!(
            ends,
            vec![
                StreamEvent::TextEnd { id: "a".into() },
                StreamEvent::TextEnd { id: "c".into() },
            ]
        );
    }

    #[test]
    fn test_delta_after_end_is_dropped() {
        let mut tracker = text_tracker();
        tracker.write_delta("m1", "hi");
        tracker.finish("m1");

        assert!(tracker.write_delta("m1", "late").is_empty());
        assert_eq!(tracker.blocks().next().unwrap().text(), "hi");
    }

    #[test]
    fn test_reasoning_kind_events() {
        let mut tracker = DeltaTracker::new(BlockKind::Reasoning);
        let events = tracker.write_delta("r1", "because");
        assert_eq!(
            events[0],
            StreamEvent::ReasoningStart { id: "r1".into() }
        );
        assert_eq!(
            tracker.finish("r1"),
            Some(StreamEvent::ReasoningEnd { id: "r1".into() })
        );
    }
}

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    #[derive(Debug, Clone)]
    enum Op {
        Delta(usize, String),
        Finish(usize),
        FinishAll,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..4, "[a-z]{0,6}").prop_map(|(id, text)| Op::Delta(id, text)),
            (0usize..4).prop_map(Op::Finish),
            Just(Op::FinishAll),
        ]
    }

    fn block_id(event: &StreamEvent) -> Option<(&str, &'static str)> {
        match event {
            StreamEvent::TextStart { id } => Some((id, "start")),
            StreamEvent::TextDelta { id, .. } => Some((id, "delta")),
            StreamEvent::TextEnd { id } => Some((id, "end")),
            _ => None,
        }
    }

    proptest! {
        /// For any op sequence: per block, exactly one start before the
        /// first delta, at most one end, and nothing outside start..end.
        #[test]
        fn emitted_sequence_is_well_formed(ops in prop::collection::vec(op_strategy(), 0..64)) {
            let mut tracker = DeltaTracker::new(BlockKind::Text);
            let mut emitted = Vec::new();

            for op in ops {
                match op {
                    Op::Delta(id, text) => {
                        emitted.extend(tracker.write_delta(&format!("b{id}"), &text));
                    }
                    Op::Finish(id) => emitted.extend(tracker.finish(&format!("b{id}"))),
                    Op::FinishAll => emitted.extend(tracker.finish_all()),
                }
            }
            emitted.extend(tracker.finish_all());

            // 0 = unseen, 1 = started, 2 = ended
            let mut phases: HashMap<String, u8> = HashMap::new();
            for event in &emitted {
                let (id, what) = block_id(event).expect("text tracker emits text events");
                let phase = phases.entry(id.to_string()).or_insert(0);
                match what {
                    "start" => {
                        prop_assert_eq!(*phase, 0, "duplicate start for {}", id);
                        *phase = 1;
                    }
                    "delta" => prop_assert_eq!(*phase, 1, "delta outside block for {}", id),
                    "end" => {
                        prop_assert_eq!(*phase, 1, "end without open block for {}", id);
                        *phase = 2;
                    }
                    _ => unreachable!(),
                }
            }

            // After the trailing finish_all, no block may remain open
            for (id, phase) in &phases {
                prop_assert_ne!(*phase, 1, "block {} left open", id);
            }
        }
    }
}
