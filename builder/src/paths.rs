// Licensed under the Apache-2.0 license

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Output written to the current working directory when no path is given.
pub const DEFAULT_OUTPUT: &str = "update.zip";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    Firmware,
    Filesystem,
}

impl Payload {
    /// File name looked up next to the tool when the caller gives no path.
    pub fn default_file_name(self) -> &'static str {
        match self {
            Payload::Firmware => "firmware.bin",
            Payload::Filesystem => "littlefs.bin",
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Firmware => write!(f, "firmware"),
            Payload::Filesystem => write!(f, "filesystem"),
        }
    }
}

/// Paths as supplied by the caller; `None` selects the default.
#[derive(Debug, Default, Clone)]
pub struct UpdateZipArgs {
    pub firmware: Option<PathBuf>,
    pub filesystem: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateZipPaths {
    pub firmware: PathBuf,
    pub filesystem: PathBuf,
    pub output: PathBuf,
}

impl UpdateZipPaths {
    /// Input images default to files inside `tool_dir`, the output to
    /// `update.zip` relative to the working directory.
    pub fn resolve(args: UpdateZipArgs, tool_dir: &Path) -> Self {
        Self {
            firmware: args
                .firmware
                .unwrap_or_else(|| tool_dir.join(Payload::Firmware.default_file_name())),
            filesystem: args
                .filesystem
                .unwrap_or_else(|| tool_dir.join(Payload::Filesystem.default_file_name())),
            output: args.output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
        }
    }
}

/// Directory holding the running executable.
pub fn tool_dir() -> io::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    Ok(exe
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".")))
}
