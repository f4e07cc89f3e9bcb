//! # Ports
//!
//! Hexagonal boundaries: the inbound API the broker exposes and the outbound
//! interfaces it depends on.

pub mod inbound;
pub mod outbound;
