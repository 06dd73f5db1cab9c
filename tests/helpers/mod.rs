//! Test helpers module
//!
//! Mock servers for the identity provider and email API, an app context
//! wired against them, and database helpers for repository tests.

#![allow(dead_code)]

pub mod database_helper;
pub mod mock_servers;
pub mod test_context;
pub mod test_data;

pub use database_helper::*;
pub use mock_servers::*;
pub use test_context::*;
pub use test_data::*;
