//! Legacy File-System API semantics (entries, get-or-create, range reads,
//! append writes, data URLs) resolved onto the local filesystem under a fixed
//! set of root directories.

pub mod bridge;
pub mod config;
pub mod encoding;
pub mod entry;
pub mod error;
pub mod mime;
pub mod path;
pub mod protocol;
pub mod resolver;
pub mod roots;
pub mod server;

pub use bridge::Bridge;
pub use entry::{Entry, OperationOptions};
pub use error::{ErrorKind, FileError};
pub use resolver::Resolver;
pub use roots::{Root, RootTable};
