//! Codici - single-use redemption codes for e-learning orders
//!
//! Holds a pool of redemption codes per product (by ISBN), issues one to the
//! buyer when an order completes, alerts an administrator when the pool runs
//! low, and mails a periodic usage report.

pub mod admin;
pub mod allocator;
pub mod config;
pub mod mail;
pub mod model;
pub mod notifier;
pub mod orders;
pub mod report;
pub mod runtime;
pub mod scheduler;
pub mod settings;
pub mod storage;
pub mod utils;
