//! Business logic services.
//!
//! - `auth` - password login, bootstrap, reset, signed tokens
//! - `captcha` - Turnstile verification gate
//! - `email` - SMTP notifications

pub mod auth;
pub mod captcha;
pub mod email;

pub use captcha::CaptchaVerifier;
pub use email::EmailService;
