//! Structured progress events emitted by the file managers.
//!
//! Managers push events into an unbounded channel; the application drains
//! the receiver and logs. Nothing in the pipeline depends on a subscriber
//! being present.

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A source workbook is about to be parsed.
    FileStarted { name: String },
    /// One mock artifact was written.
    MockWritten { name: String, row_count: usize },
    /// One asset file was copied.
    AssetCopied { name: String },
}

pub type ProgressSender = UnboundedSender<ProgressEvent>;
pub type ProgressReceiver = UnboundedReceiver<ProgressEvent>;

pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    unbounded_channel()
}

pub(crate) fn emit(sender: &Option<ProgressSender>, event: ProgressEvent) {
    if let Some(tx) = sender {
        // A dropped receiver only means nobody is listening anymore.
        let _ = tx.send(event);
    }
}
