//! Native core of the Deckhand mobile shell.
//!
//! Exposes the session/trust subsystem to the Flutter UI layer through
//! flutter_rust_bridge. The UI owns the WebView, the platform keystore,
//! biometrics, and the speech engines; everything protocol- and
//! security-relevant happens here.

pub mod api;
pub mod client;
