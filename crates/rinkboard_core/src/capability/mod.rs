//! Seams to platform components the core drives but does not implement.
//!
//! # Responsibility
//! - Describe the stylus capture surface and the photo-library exporter as
//!   traits so platform adapters can be plugged in and faked in tests.
//!
//! # Invariants
//! - The core never interprets stroke data; canvas content stays opaque bytes.

pub mod capture;
pub mod export;
