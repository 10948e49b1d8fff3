//! Authentication utilities library
//!
//! Provides the token and credential primitives of the session subsystem:
//! - Password hashing (Argon2id, configurable cost)
//! - JWT access/refresh token issuance and verification (HS256)
//!
//! Both are pure and hold no I/O; storage and orchestration live in the
//! service crate.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::default();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.matches("my_password", &hash));
//! ```
//!
//! ## JWT Tokens
//! ```
//! use auth::JwtHandler;
//! use chrono::Duration;
//! use chrono::Utc;
//!
//! let handler = JwtHandler::new(b"secret_key_at_least_32_bytes_long!").unwrap();
//! let now = Utc::now();
//! let token = handler.issue_access(1, "alice@example.com", now, Duration::hours(1)).unwrap();
//! let claims = handler.verify(&token, now).unwrap();
//! assert_eq!(claims.subject(), Some("alice@example.com"));
//! ```

pub mod jwt;
pub mod password;

// Re-export commonly used items
pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use password::HashCost;
pub use password::PasswordError;
pub use password::PasswordHasher;
