// Licensed under the Apache-2.0 license

mod error;
mod paths;
pub mod update_zip;

pub use error::{Result, UpdateZipError};
pub use paths::{tool_dir, Payload, UpdateZipArgs, UpdateZipPaths, DEFAULT_OUTPUT};
pub use update_zip::{
    update_zip_create, update_zip_extract, update_zip_verify, UpdateContainer, UpdateZipSummary,
};
