//! State management module
//!
//! This module handles shared application state and login flow progress

pub mod context;
pub mod login;
pub mod storage;

// Re-export commonly used state components
pub use context::AppState;
pub use login::{CallbackOutcome, LoginFlow, LoginMethod, LoginStep};
pub use storage::LoginFlowStorage;
