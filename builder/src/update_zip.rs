// Licensed under the Apache-2.0 license

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use tempfile::Builder;
use update_container::{UpdateHeader, UPDATE_CONTAINER_MAGIC, UPDATE_HEADER_SIZE};
use zerocopy::{FromBytes, IntoBytes};

use crate::{Payload, Result, UpdateZipError, UpdateZipPaths};

/// A header together with the two images it describes.
#[derive(Debug)]
pub struct UpdateContainer<'a> {
    header: UpdateHeader,
    firmware: &'a [u8],
    filesystem: &'a [u8],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateZipSummary {
    pub output: PathBuf,
    pub firmware_size: u32,
    pub filesystem_size: u32,
}

impl<'a> UpdateContainer<'a> {
    /// `firmware_path` and `filesystem_path` only label validation errors.
    pub fn new(
        firmware_path: &Path,
        firmware: &'a [u8],
        filesystem_path: &Path,
        filesystem: &'a [u8],
    ) -> Result<Self> {
        let inputs = [
            (Payload::Firmware, firmware_path, firmware),
            (Payload::Filesystem, filesystem_path, filesystem),
        ];
        for (payload, path, data) in inputs {
            if data.is_empty() {
                return Err(UpdateZipError::InvalidInput {
                    payload,
                    path: path.to_path_buf(),
                    reason: "empty file",
                });
            }
        }
        let firmware_size = payload_size(Payload::Firmware, firmware_path, firmware.len() as u64)?;
        let filesystem_size =
            payload_size(Payload::Filesystem, filesystem_path, filesystem.len() as u64)?;

        Ok(Self {
            header: UpdateHeader::new(firmware_size, filesystem_size),
            firmware,
            filesystem,
        })
    }

    pub fn header(&self) -> &UpdateHeader {
        &self.header
    }

    pub fn firmware(&self) -> &'a [u8] {
        self.firmware
    }

    pub fn filesystem(&self) -> &'a [u8] {
        self.filesystem
    }

    pub fn write_to(&self, mut writer: impl Write) -> io::Result<()> {
        writer.write_all(self.header.as_bytes())?;
        writer.write_all(self.firmware)?;
        writer.write_all(self.filesystem)?;
        Ok(())
    }

    /// Writes the container next to `filename` and renames it into place, so
    /// an interrupted write never leaves a truncated container behind.
    ///
    /// The result carries the permissions a plain create-or-truncate would
    /// give it: an existing file keeps its mode, a new one gets the umask
    /// default.
    pub fn write_to_file(&self, filename: &Path) -> Result<()> {
        let wrap_err = |source: io::Error| UpdateZipError::Io {
            path: filename.to_path_buf(),
            source,
        };
        let dir = match filename.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let existing = match fs::metadata(filename) {
            Ok(metadata) => Some(metadata.permissions()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(wrap_err(e)),
        };

        #[cfg_attr(not(unix), allow(unused_mut))]
        let mut builder = Builder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // The umask is applied when the file is created.
            builder.permissions(fs::Permissions::from_mode(0o666));
        }
        let mut temp_file = builder.tempfile_in(dir).map_err(wrap_err)?;
        debug!("Staging update container in {}", temp_file.path().display());
        if let Some(permissions) = existing {
            temp_file
                .as_file()
                .set_permissions(permissions)
                .map_err(wrap_err)?;
        }
        {
            let mut writer = BufWriter::new(temp_file.as_file_mut());
            self.write_to(&mut writer).map_err(wrap_err)?;
            writer.flush().map_err(wrap_err)?;
        }
        temp_file.as_file().sync_all().map_err(wrap_err)?;
        temp_file.persist(filename).map_err(|e| wrap_err(e.error))?;

        info!(
            "Wrote {} bytes to {}",
            self.header.container_len(),
            filename.display()
        );
        Ok(())
    }

    /// Splits a complete container back into its images.
    pub fn parse(image: &'a [u8]) -> Result<Self> {
        if image.len() < UPDATE_HEADER_SIZE {
            return Err(UpdateZipError::InvalidContainer(format!(
                "{} bytes is too small to contain the header",
                image.len()
            )));
        }
        let (header, rest) = UpdateHeader::read_from_prefix(image).map_err(|_| {
            UpdateZipError::InvalidContainer("failed to parse header".to_string())
        })?;
        if header.magic != UPDATE_CONTAINER_MAGIC {
            return Err(UpdateZipError::InvalidContainer("incorrect magic".to_string()));
        }
        if header.firmware_size() == 0 || header.filesystem_size() == 0 {
            return Err(UpdateZipError::InvalidContainer(format!(
                "empty payload (firmware {} bytes, filesystem {} bytes)",
                header.firmware_size(),
                header.filesystem_size()
            )));
        }
        if image.len() as u64 != header.container_len() {
            return Err(UpdateZipError::InvalidContainer(format!(
                "expected {} bytes, found {}",
                header.container_len(),
                image.len()
            )));
        }
        debug!(
            "Parsed header: firmware {} bytes, filesystem {} bytes",
            header.firmware_size(),
            header.filesystem_size()
        );

        let (firmware, filesystem) = rest.split_at(header.firmware_size() as usize);
        Ok(Self {
            header,
            firmware,
            filesystem,
        })
    }
}

fn payload_size(payload: Payload, path: &Path, len: u64) -> Result<u32> {
    u32::try_from(len).map_err(|_| UpdateZipError::InvalidInput {
        payload,
        path: path.to_path_buf(),
        reason: "too large",
    })
}

fn check_input(payload: Payload, path: &Path) -> Result<()> {
    let not_found = || UpdateZipError::NotFound {
        payload,
        path: path.to_path_buf(),
    };
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => Ok(()),
        Ok(_) => Err(not_found()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(not_found()),
        Err(source) => Err(UpdateZipError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn load_file(path: &Path) -> Result<Vec<u8>> {
    let wrap_err = |source: io::Error| UpdateZipError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut buffer = Vec::new();
    let mut file = File::open(path).map_err(wrap_err)?;
    file.read_to_end(&mut buffer).map_err(wrap_err)?;
    debug!("Read {} bytes from {}", buffer.len(), path.display());
    Ok(buffer)
}

/// Builds `paths.output` from the firmware and filesystem images.
///
/// Both inputs are validated before any output is written. The output file is
/// created or replaced only once the whole container has been written.
pub fn update_zip_create(paths: &UpdateZipPaths) -> Result<UpdateZipSummary> {
    check_input(Payload::Firmware, &paths.firmware)?;
    check_input(Payload::Filesystem, &paths.filesystem)?;

    let firmware = load_file(&paths.firmware)?;
    let filesystem = load_file(&paths.filesystem)?;

    let container =
        UpdateContainer::new(&paths.firmware, &firmware, &paths.filesystem, &filesystem)?;
    container.write_to_file(&paths.output)?;

    Ok(UpdateZipSummary {
        output: paths.output.clone(),
        firmware_size: container.header().firmware_size(),
        filesystem_size: container.header().filesystem_size(),
    })
}

pub fn update_zip_verify(image_file_path: &Path) -> Result<UpdateHeader> {
    let data = fs::read(image_file_path).map_err(|source| UpdateZipError::Io {
        path: image_file_path.to_path_buf(),
        source,
    })?;
    let container = UpdateContainer::parse(&data)?;
    Ok(*container.header())
}

/// Writes both images of a container into `dir` under their default names.
pub fn update_zip_extract(image_file_path: &Path, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let data = fs::read(image_file_path).map_err(|source| UpdateZipError::Io {
        path: image_file_path.to_path_buf(),
        source,
    })?;
    let container = UpdateContainer::parse(&data)?;

    fs::create_dir_all(dir).map_err(|source| UpdateZipError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let firmware_path = dir.join(Payload::Firmware.default_file_name());
    let filesystem_path = dir.join(Payload::Filesystem.default_file_name());
    for (path, data) in [
        (&firmware_path, container.firmware()),
        (&filesystem_path, container.filesystem()),
    ] {
        fs::write(path, data).map_err(|source| UpdateZipError::Io {
            path: path.clone(),
            source,
        })?;
        info!("Wrote {} bytes to {}", data.len(), path.display());
    }

    Ok((firmware_path, filesystem_path))
}
