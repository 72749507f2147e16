use std::io;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::entry::OperationOptions;
use crate::error::{ErrorKind, FileError, Result};
use crate::path::from_uri;
use crate::resolver::Resolver;

/// Payload of `write`: text is written as UTF-8, an array as raw bytes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum WriteData {
    Text(String),
    Bytes(Vec<u8>),
}

impl WriteData {
    fn as_bytes(&self) -> &[u8] {
        match self {
            WriteData::Text(s) => s.as_bytes(),
            WriteData::Bytes(b) => b,
        }
    }
}

/// Dispatches File API calls by method name, with positional JSON arguments,
/// onto a [`Resolver`].
pub struct Bridge {
    resolver: Resolver,
}

impl Bridge {
    pub fn new(resolver: Resolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub async fn call(&self, method: &str, args: &[Value]) -> Result<Value> {
        debug!(method, argc = args.len(), "bridge call");
        let r = &self.resolver;

        match method {
            "requestAllPaths" => reply(r.request_all_paths()),
            "getDirectory" => {
                let options = arg::<Option<OperationOptions>>(args, 2)?.unwrap_or_default();
                let path: String = arg(args, 1)?;
                reply(r.get_directory(&path_arg(args, 0)?, &path, options).await?)
            }
            "getFile" => {
                let options = arg::<Option<OperationOptions>>(args, 2)?.unwrap_or_default();
                let path: String = arg(args, 1)?;
                reply(r.get_file(&path_arg(args, 0)?, &path, options).await?)
            }
            "removeRecursively" => reply(r.remove_recursively(&path_arg(args, 0)?).await?),
            "readEntries" => reply(r.read_entries(&path_arg(args, 0)?).await?),
            "getFileMetadata" => reply(r.get_file_metadata(&path_arg(args, 0)?).await?),
            "setMetadata" => reply(r.set_metadata().await?),
            "getParent" => reply(r.get_parent().await?),
            "moveTo" | "copyTo" => {
                let src = path_arg(args, 0)?;
                let parent = path_arg(args, 1)?;
                let name: Option<String> = arg(args, 2)?;
                let entry = if method == "moveTo" {
                    r.move_to(&src, &parent, name.as_deref()).await?
                } else {
                    r.copy_to(&src, &parent, name.as_deref()).await?
                };
                reply(entry)
            }
            "remove" => reply(r.remove(&path_arg(args, 0)?).await?),
            "readAsText" => {
                let encoding = arg::<Option<String>>(args, 1)?.unwrap_or_else(|| "utf8".to_string());
                let (start, end) = (arg(args, 2)?, arg(args, 3)?);
                reply(r.read_as_text(&path_arg(args, 0)?, &encoding, start, end).await?)
            }
            "readAsDataURL" => {
                let (start, end) = (arg(args, 1)?, arg(args, 2)?);
                reply(r.read_as_data_url(&path_arg(args, 0)?, start, end).await?)
            }
            "readAsBinaryString" => {
                let (start, end) = (arg(args, 1)?, arg(args, 2)?);
                reply(r.read_as_binary_string(&path_arg(args, 0)?, start, end).await?)
            }
            "readAsArrayBuffer" => {
                let (start, end) = (arg(args, 1)?, arg(args, 2)?);
                reply(r.read_as_array_buffer(&path_arg(args, 0)?, start, end).await?)
            }
            "write" => {
                let data: WriteData = arg(args, 1)?;
                let offset = arg::<Option<u64>>(args, 2)?.unwrap_or(0);
                let is_binary = arg::<Option<bool>>(args, 3)?.unwrap_or(false);
                reply(
                    r.write(&path_arg(args, 0)?, data.as_bytes(), offset, is_binary)
                        .await?,
                )
            }
            "truncate" => {
                let path: Option<String> = arg(args, 0)?;
                let path = path.map(|p| from_uri(&p)).transpose()?;
                let len: u64 = arg(args, 1)?;
                reply(r.truncate(path.as_deref(), len).await?)
            }
            "requestFileSystem" => {
                let size = arg::<Option<u64>>(args, 1)?.unwrap_or(0);
                reply(r.request_file_system(arg(args, 0)?, size).await?)
            }
            "resolveLocalFileSystemURI" => {
                let uri: String = arg(args, 0)?;
                reply(r.resolve_local_file_system_uri(&uri).await?)
            }
            _ => Err(FileError::Unsupported(method.to_string())),
        }
    }
}

/// Positional argument `index`; a missing argument reads as `null`.
fn arg<T: DeserializeOwned>(args: &[Value], index: usize) -> Result<T> {
    let value = args.get(index).cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| {
        debug!(index, "bad argument: {}", e);
        ErrorKind::Syntax.into()
    })
}

/// A path argument, given either as a plain path or a `file://` URI
fn path_arg(args: &[Value], index: usize) -> Result<PathBuf> {
    let raw: String = arg(args, index)?;
    from_uri(&raw)
}

fn reply<T: Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| FileError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}
