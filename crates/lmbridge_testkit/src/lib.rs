//! # lmbridge Testkit
//!
//! Test utilities for lmbridge.
//!
//! This crate provides:
//! - Test fixtures over the in-memory engine
//! - Property-based test generators using proptest
//! - Cross-language comparator test vectors
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lmbridge_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_env() {
//!     with_test_env(|env| {
//!         let scratch = env.scratch("test", 0);
//!         // ... bridge calls against `env` and `scratch`
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::vectors::*;
}

pub use fixtures::*;
pub use generators::*;
pub use vectors::*;
