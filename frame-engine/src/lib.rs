pub mod config;
pub mod process;
pub mod worker;

pub use self::config::EngineConfig;
pub use self::process::{CancelToken, ErrorKind, Output, Pipeline, ProcessError};

#[cfg(test)]
mod tests;
