pub mod graph;
pub mod provider;

pub use graph::GraphPublisher;
pub use provider::{PublishError, PublishReceipt, Publisher};
