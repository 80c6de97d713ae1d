//! Session and conversation thread management.
//!
//! This module provides in-memory session storage keyed by user id. Each
//! session holds the user's current remote thread and the files produced for
//! them. Nothing is persisted; sessions live as long as the process.
//!
//! # Architecture
//!
//! - [`Session`]: Thread slot and files of a single user
//! - [`SessionStore`]: Thread-safe store for all sessions; owns the remote
//!   thread lifecycle (create, reset, delete)

mod thread;

pub use thread::{Session, SessionStore};
