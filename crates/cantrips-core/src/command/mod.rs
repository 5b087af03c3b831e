//! Command synthesis and dispatch.
//!
//! [`CommandTree`] describes one category per registered module and one
//! action per exposed entry. [`Dispatcher`] runs an action with merged
//! options under a timeout.

mod dispatch;
mod tree;

pub use dispatch::{
    DEFAULT_TIMEOUT_MS, Dispatcher, TIMEOUT_OPTION, clean_options, merge_options, resolve_timeout,
};
pub use tree::{ActionCommand, Category, CommandTree, DEFAULT_DESCRIPTION, OptionSpec};
