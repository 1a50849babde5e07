pub mod commands;
pub mod config;
pub mod error;
pub mod galleries;
pub mod remote;
pub mod run;
pub mod sections;

pub use error::{ClientError, Result};
