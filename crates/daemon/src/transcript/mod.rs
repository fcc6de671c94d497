// Conversation transcript built from the assistant's event stream.

pub mod aggregator;
pub mod reducer;
pub mod status;

pub use aggregator::{
    build_context, run_aggregator_loop, ChatCommand, ChatView, ContextSnippet,
    EventStreamAggregator,
};
pub use reducer::{reduce, PendingToolCall, Reduction, TranscriptState};
