//! The document store: codec plus engine.

pub mod codec;
pub mod engine;

pub use engine::DocumentStore;
