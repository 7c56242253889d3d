//! Shared storage contract tests.
//!
//! Each backend imports these functions and runs them against a fresh,
//! empty store.

pub mod code_store_tests;
pub mod settings_store_tests;
