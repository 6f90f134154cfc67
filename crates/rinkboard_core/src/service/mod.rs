//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate entity store commits into folder/drawing lifecycle APIs.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod content_writer;
pub mod drawing_service;
pub mod folder_service;
pub mod listing_service;
