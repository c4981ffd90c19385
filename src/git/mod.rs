//! Git subprocess layer: the command executor and the repository-local
//! auth lifecycle built on top of it.

pub mod auth;
pub mod command;

pub use auth::GitAuth;
pub use command::{GitCommand, GitOutput};
