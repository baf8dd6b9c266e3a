pub mod app;
pub mod chat_stream;
pub mod constants;
pub mod message;
pub mod reconciler;
pub mod transcript;
