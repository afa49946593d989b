//! # Pilah Common Library
//!
//! Shared code for the Pilah services including:
//! - Configuration loading and resolution
//! - Event types (ScanEvent enum) and the EventBus
//! - Wire types for the remote scoring backend
//! - The local credential store

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod events;

pub use credentials::{CredentialStore, Credentials};
pub use error::{Error, Result};
