pub mod builtin;
pub mod module;
