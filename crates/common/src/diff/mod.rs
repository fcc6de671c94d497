pub mod words;

pub use words::{apply_spans, diff_words, DiffSpan, SpanKind};
