pub mod consumer;
pub mod coordinator;
pub mod liveness;
pub mod producer;
pub mod queue;
pub mod sink;
