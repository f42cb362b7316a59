//! Infrastructure layer: storage adapters behind the core's contracts.

pub mod node_store;

pub use node_store::InMemoryNodeStore;
