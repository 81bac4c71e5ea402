//! Core connection, session, and trust logic for the Deckhand mobile shell.
//!
//! This crate is platform-independent: it speaks HTTP(S) to a Galactic AI
//! server, decides which certificates to trust, and drives the login state
//! machine. The mobile FFI layer (`deckhand_mobile_native`) owns the runtime
//! and the platform capabilities (keystore, biometrics, speech) and consumes
//! this crate through the `client` and `store` modules.

pub mod api;
pub mod bridge;
pub mod client;
pub mod store;
