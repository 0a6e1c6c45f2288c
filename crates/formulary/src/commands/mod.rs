//! Command handlers, one module per subcommand.

pub mod catalog;
pub mod draft;
pub mod init;
pub mod wizard;
