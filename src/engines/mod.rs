//! Speech synthesis engines.
//!
//! This module contains implementations of remote text-to-speech engines.
//!
//! # Available Engines
//!
//! Enable engines via Cargo features:
//! - `azure` - Azure Speech service (REST, neural voices only)

#[cfg(feature = "azure")]
pub mod azure;
