//! Integration tests for the make-right pipeline
//!
//! # Test Organization
//!
//! - `event_helper`: Stories about which lifecycle events an attempt may
//!   emit and what the resulting records look like
//!
//! - `make_right`: Stories about whole make-right attempts, including
//!   failures, retries, cancellation and deletion

mod event_helper;
mod helpers;
mod make_right;
