//! Strome Demo - the sample user model and a walkthrough of the persistence flow.
//!
//! # Modules
//!
//! - [`model`] - `User`, `Name` and `Address` entities
//! - [`walkthrough`] - save, reload, fetch and graph delete
//! - [`cli`] - command-line arguments
//! - [`error`] - Demo error types

pub mod cli;
pub mod error;
pub mod model;
pub mod walkthrough;

pub use cli::Args;
pub use error::DemoError;
pub use model::{Address, Name, User, UserSummary};
pub use walkthrough::{run, schema_json, Report};
