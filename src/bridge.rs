//! Out-of-process helpers: the system scripting host and user configured shell commands.
//! Every value interpolated into generated source goes through the escaping in this module.

pub mod command;
pub mod script;
