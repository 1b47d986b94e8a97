// Licensed under the Apache-2.0 license

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::Payload;

pub type Result<T> = std::result::Result<T, UpdateZipError>;

/// Errors raised while building or reading an update container.
#[derive(Error, Debug)]
pub enum UpdateZipError {
    #[error("{payload} image not found: {}", path.display())]
    NotFound { payload: Payload, path: PathBuf },
    #[error("{payload} image {} rejected: {reason}", path.display())]
    InvalidInput {
        payload: Payload,
        path: PathBuf,
        reason: &'static str,
    },
    #[error("Invalid update container: {0}")]
    InvalidContainer(String),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl UpdateZipError {
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            UpdateZipError::NotFound { .. } => io::ErrorKind::NotFound,
            UpdateZipError::InvalidInput { .. } => io::ErrorKind::InvalidInput,
            UpdateZipError::InvalidContainer(_) => io::ErrorKind::InvalidData,
            UpdateZipError::Io { source, .. } => source.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_input() {
        let err = UpdateZipError::NotFound {
            payload: Payload::Filesystem,
            path: PathBuf::from("out/littlefs.bin"),
        };
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert_eq!(
            err.to_string(),
            "filesystem image not found: out/littlefs.bin"
        );

        let err = UpdateZipError::InvalidInput {
            payload: Payload::Firmware,
            path: PathBuf::from("build/app.bin"),
            reason: "empty file",
        };
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(
            err.to_string(),
            "firmware image build/app.bin rejected: empty file"
        );
    }

    #[test]
    fn test_io_kind_passes_through() {
        let err = UpdateZipError::Io {
            path: PathBuf::from("update.zip"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(err.to_string(), "update.zip: denied");
    }
}
