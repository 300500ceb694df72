pub mod client;
pub mod wire;

pub use client::{classify_failure, GenerativeTransport, HttpTransport};
pub use wire::*;
