pub mod channel;
pub mod retry_queue;
