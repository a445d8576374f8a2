//! Command implementations.

mod build;
mod dev;

pub use build::execute as build_execute;
pub use dev::execute as dev_execute;
