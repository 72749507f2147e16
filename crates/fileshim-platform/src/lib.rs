//! Host capabilities the file shim is written against: native filesystem
//! primitives and the provider of root directory paths.

pub mod filesystem;
pub mod paths;
