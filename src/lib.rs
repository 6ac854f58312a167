//! magma-babel – evaluate Magma code blocks for literate-programming hosts
//!
//! Blocks run either in a persistent interactive session or through the
//! stateless online calculator:
//! - Variables are bound by prepending assignments to the block source
//! - Session output is framed by a sentinel and classified by asking the
//!   same session whether it reads back as a table
//! - Calculator responses are XML documents of result lines
//!
//! [`Babel`] is the entry point hosts embed.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod babel;
pub mod config;
pub mod error;
pub mod expand;
pub mod literal;
pub mod magma;
pub mod params;
pub mod remote;
pub mod session;
pub mod value;

// Re-export key types for convenience
pub use babel::Babel;
pub use config::Config;
pub use error::{BabelError, Result};
pub use expand::{Binding, expand_body};
pub use magma::{FILE_EXTENSION, LANGUAGE};
pub use params::{BlockParams, HeaderArgs, ResultMode};
pub use value::Value;

/// Current version of magma-babel
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
