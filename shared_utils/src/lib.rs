//! Small helpers shared by the store library and its command-line front end.

#![deny(missing_docs)]

pub mod env;

pub use env::{ConfigError, get_env_path, get_env_var, get_env_var_opt};
