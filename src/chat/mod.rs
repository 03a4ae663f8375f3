//! Storefront sales assistant.

pub mod assistant;
pub mod segmenter;

pub use assistant::{greeting, history, reply, Greeting, GREETING_TIMEOUT};
pub use segmenter::segment;
