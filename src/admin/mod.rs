pub mod commands;
pub mod handler;

pub use commands::{parse_command, AdminCommand};
pub use handler::{respond, AdminState};
