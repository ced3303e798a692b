//! Angeli Core - Shared types library.
//!
//! This crate provides common types used across all Angeli Visions components:
//! - `site` - JSON API backing the marketing pages and the back-office
//! - `cli` - Command-line tools for user bootstrap and content seeding
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no store access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, roles and localized text

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
