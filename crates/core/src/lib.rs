//! Domain types and pure logic for the studio generation service.
//!
//! No I/O beyond in-memory image decoding lives here; storage, the
//! simulated backend and orchestration are layered on top in their own
//! crates.

pub mod backoff;
pub mod error;
pub mod generation;
pub mod imaging;
pub mod style;
pub mod types;
