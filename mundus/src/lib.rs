// Library interface for the mundus editor modules
// This allows tests and the binary to import modules

pub mod compose;
pub mod gateway;
pub mod parser;
pub mod session;
pub mod shell;
pub mod state;
pub mod views;
