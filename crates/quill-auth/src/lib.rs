//! Session-security primitives for Quill.
//!
//! `password` validates credential syntax and produces salted SHA-256
//! password hashes. `token` signs and verifies the cookie values that carry
//! session identity. The two share a hashing primitive but never a secret.

pub mod password;
pub mod token;

pub use token::SecurityContext;
