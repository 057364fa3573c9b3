//! CLI command implementations.

pub mod generate;
pub mod init;
pub mod order;
pub mod validate;
pub mod version;
