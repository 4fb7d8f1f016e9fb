//! TCP sending side: validated endpoints and the one-shot transfer client.

pub mod client;
pub mod endpoint;

pub use client::{TransferClient, TransferReport, TransferResult};
pub use endpoint::Endpoint;
