//! Decode → parse → reduce for one turn.

use std::sync::Arc;

use ot_domain::Message;

use crate::frame::{Frame, FrameDecoder};
use crate::parse::parse_event;
use crate::reduce::apply;

/// Counters kept while folding one stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FoldStats {
    pub frames: usize,
    pub events: usize,
    pub malformed: usize,
    /// Frames that arrived after `done` and were not folded.
    pub ignored: usize,
}

/// Folds a byte stream into a single evolving [`Message`].
///
/// Every event that changes the message yields one immutable snapshot, in
/// frame order.  Once a `done` event is seen nothing else is folded.
#[derive(Debug)]
pub struct MessageFold {
    decoder: FrameDecoder,
    current: Arc<Message>,
    done: bool,
    stats: FoldStats,
}

impl MessageFold {
    pub fn new(message: Message, frame_prefix: &str) -> Self {
        Self {
            decoder: FrameDecoder::new(frame_prefix),
            current: Arc::new(message),
            done: false,
            stats: FoldStats::default(),
        }
    }

    /// Fold one chunk. Returns the snapshots it produced.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Arc<Message>> {
        let frames = self.decoder.feed(chunk);
        let mut snapshots = Vec::new();
        for frame in frames {
            self.fold_frame(frame, &mut snapshots);
        }
        snapshots
    }

    /// Fold whatever the decoder still holds at end of stream.
    pub fn finish(&mut self) -> Vec<Arc<Message>> {
        let mut snapshots = Vec::new();
        let buffered = self.decoder.buffered_len();
        if buffered > 0 {
            tracing::debug!(buffered, "flushing unterminated tail");
        }
        if let Some(frame) = self.decoder.finish() {
            self.fold_frame(frame, &mut snapshots);
        }
        snapshots
    }

    /// Whether a `done` event has been folded.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn message(&self) -> &Arc<Message> {
        &self.current
    }

    pub fn stats(&self) -> FoldStats {
        self.stats
    }

    /// Frames the decoder discarded for lacking the prefix.
    pub fn dropped_frames(&self) -> usize {
        self.decoder.dropped()
    }

    /// Change the current message outside the event stream (lifecycle
    /// state, failure notice) and return the new snapshot.
    pub fn update(&mut self, f: impl FnOnce(&mut Message)) -> Arc<Message> {
        f(Arc::make_mut(&mut self.current));
        Arc::clone(&self.current)
    }

    pub fn into_message(self) -> Message {
        Arc::try_unwrap(self.current).unwrap_or_else(|shared| (*shared).clone())
    }

    fn fold_frame(&mut self, frame: Frame, snapshots: &mut Vec<Arc<Message>>) {
        self.stats.frames += 1;
        if self.done {
            self.stats.ignored += 1;
            return;
        }

        let event = match parse_event(&frame.payload) {
            Ok(event) => event,
            Err(e) => {
                self.stats.malformed += 1;
                tracing::warn!(error = %e, "skipping malformed frame");
                return;
            }
        };
        self.stats.events += 1;
        tracing::trace!(kind = event.kind(), "event");

        if event.is_done() {
            self.done = true;
        } else if event.mutates_message() {
            self.current = Arc::new(apply(&self.current, &event));
            snapshots.push(Arc::clone(&self.current));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ot_domain::StepStatus;

    fn fold() -> MessageFold {
        MessageFold::new(Message::assistant_placeholder(), "data: ")
    }

    #[test]
    fn one_snapshot_per_mutating_event() {
        let mut f = fold();
        let snaps = f.feed(
            b"data: {\"type\":\"token\",\"content\":\"a\"}\n\n\
              data: {\"type\":\"heartbeat\"}\n\n\
              data: {\"type\":\"token\",\"content\":\"b\"}\n\n",
        );
        assert_eq!(snaps.len(), 2);
        assert_eq!(snaps[0].content, "a");
        assert_eq!(snaps[1].content, "ab");
        assert_eq!(f.stats().events, 3);
    }

    #[test]
    fn malformed_frame_between_tokens_is_skipped() {
        let mut f = fold();
        f.feed(b"data: {\"type\":\"token\",\"content\":\"Hello\"}\n\n");
        f.feed(b"data: {\"type\":\"token\",\"content\n\n");
        f.feed(b"data: {\"type\":\"token\",\"content\":\" world\"}\n\n");
        assert_eq!(f.message().content, "Hello world");
        assert_eq!(f.stats().malformed, 1);
    }

    #[test]
    fn nothing_folds_after_done() {
        let mut f = fold();
        let snaps = f.feed(
            b"data: {\"type\":\"token\",\"content\":\"kept\"}\n\n\
              data: {\"type\":\"done\"}\n\n\
              data: {\"type\":\"token\",\"content\":\" late\"}\n\n",
        );
        assert_eq!(snaps.len(), 1);
        assert!(f.is_done());
        assert_eq!(f.message().content, "kept");
        assert_eq!(f.stats().ignored, 1);
    }

    #[test]
    fn finish_folds_unterminated_last_frame() {
        let mut f = fold();
        assert!(f
            .feed(b"data: {\"type\":\"response\",\"content\":\"Final.\"}")
            .is_empty());
        let snaps = f.finish();
        assert_eq!(snaps.len(), 1);
        assert_eq!(f.into_message().content, "Final.");
    }

    #[test]
    fn normality_test_scenario() {
        let stream = concat!(
            "data: {\"type\":\"step\",\"id\":\"s1\",\"title\":\"Load data\",\"status\":\"running\"}\n\n",
            "data: {\"type\":\"step\",\"id\":\"s1\",\"status\":\"completed\"}\n\n",
            "data: {\"type\":\"token\",\"content\":\"Result: \"}\n\n",
            "data: {\"type\":\"token\",\"content\":\"p=0.12\"}\n\n",
            "data: {\"type\":\"response\",\"content\":\"The data is normally distributed (p=0.12).\"}\n\n",
            "data: {\"type\":\"done\"}\n\n",
        );
        let mut f = fold();
        let snaps = f.feed(stream.as_bytes());
        assert_eq!(snaps.len(), 5);
        assert_eq!(snaps[3].content, "Result: p=0.12");
        assert!(f.is_done());

        let msg = f.into_message();
        assert_eq!(msg.steps.len(), 1);
        assert_eq!(msg.steps[0].id, "s1");
        assert_eq!(msg.steps[0].title, "Load data");
        assert_eq!(msg.steps[0].status, StepStatus::Completed);
        assert_eq!(msg.content, "The data is normally distributed (p=0.12).");
    }

    #[test]
    fn update_does_not_touch_published_snapshots() {
        let mut f = fold();
        let snaps = f.feed(b"data: {\"type\":\"token\",\"content\":\"a\"}\n\n");
        let next = f.update(|m| m.state = ot_domain::MessageState::Completed);
        assert_eq!(snaps[0].state, ot_domain::MessageState::Pending);
        assert_eq!(next.state, ot_domain::MessageState::Completed);
        assert_eq!(next.content, "a");
    }

    #[test]
    fn earlier_snapshots_are_unaffected_by_later_folds() {
        let mut f = fold();
        let first = f.feed(b"data: {\"type\":\"token\",\"content\":\"a\"}\n\n");
        f.feed(b"data: {\"type\":\"token\",\"content\":\"b\"}\n\n");
        assert_eq!(first[0].content, "a");
        assert_eq!(f.message().content, "ab");
    }
}
