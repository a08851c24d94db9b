//! Filesystem and package primitives used by module execution.
pub mod file;
pub mod fs;
pub mod package;
