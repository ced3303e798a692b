//! Core types for Angeli Visions.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod locale;
pub mod role;

pub use email::{Email, EmailError};
pub use id::*;
pub use locale::{Locale, LocaleError, LocalizedString};
pub use role::{Role, RoleError};
