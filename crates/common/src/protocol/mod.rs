pub mod events;
pub mod stream_json;
