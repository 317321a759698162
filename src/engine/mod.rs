pub mod batching;
pub mod coordinator;
pub mod dispatch;
pub mod queue;
pub mod sequencing;
