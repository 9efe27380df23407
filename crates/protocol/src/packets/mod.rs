//! Payload definitions for the flapper protocol.
//!
//! Payloads are UTF-8 JSON carried inside frames. Every field has a default
//! so that peers built against an older or newer schema still interoperate:
//! missing fields decode to their default and unknown fields are ignored.

mod client;
mod server;

pub use client::*;
pub use server::*;
