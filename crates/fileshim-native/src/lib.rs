// Native implementations of the platform capabilities

pub mod filesystem;
pub mod paths;
