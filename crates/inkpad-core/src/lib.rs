//! Core library for Inkpad.
//!
//! Contains input validation, the login rate limiter, credential
//! verification, signed sessions, frontmatter parsing, and the markdown
//! content layer. This crate depends on `inkpad-storage` for the provider
//! trait and knows nothing about HTTP.

pub mod content;
pub mod credentials;
pub mod error;
pub mod frontmatter;
pub mod ratelimit;
pub mod session;
pub mod validate;
