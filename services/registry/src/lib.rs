//! protrack registry library.
//!
//! This crate primarily ships a `registry` binary, but we expose a small
//! library surface so request handlers elsewhere can allocate item codes and
//! enforce `If-Match` preconditions, and to enable integration testing.

pub mod allocation;
pub mod api;
pub mod config;
pub mod db;
pub mod state;
