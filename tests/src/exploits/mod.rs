//! # Exploit Simulations
//!
//! Attack scenarios the broker must survive: response spoofing, callback
//! griefing, and settlement re-entry.

pub mod reentrant_fulfillment;
