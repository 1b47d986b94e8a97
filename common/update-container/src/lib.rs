// Licensed under the Apache-2.0 license
#![cfg_attr(not(test), no_std)]

//! Wire format of the streamed dual-image update container.
//!
//! ```text
//! offset  size            field
//! 0       8               magic ("K2UPD1\0\0")
//! 8       4               firmware size (u32, little-endian)
//! 12      4               filesystem size (u32, little-endian)
//! 16      firmware size   firmware image
//! ..      filesystem size filesystem image
//! ```
//!
//! The layout is shared by the host-side builder and any device-side reader
//! that splits the container back into its two images while streaming it.

use core::ops::Range;

use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const UPDATE_CONTAINER_MAGIC: [u8; 8] = *b"K2UPD1\0\0";
pub const UPDATE_HEADER_SIZE: usize = core::mem::size_of::<UpdateHeader>();

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct UpdateHeader {
    pub magic: [u8; 8],
    pub firmware_size: U32<LittleEndian>,
    pub filesystem_size: U32<LittleEndian>,
}

const _: () = assert!(UPDATE_HEADER_SIZE == 16);

impl UpdateHeader {
    pub fn new(firmware_size: u32, filesystem_size: u32) -> Self {
        Self {
            magic: UPDATE_CONTAINER_MAGIC,
            firmware_size: firmware_size.into(),
            filesystem_size: filesystem_size.into(),
        }
    }

    /// Checks the magic and that neither payload is empty.
    pub fn verify(&self) -> bool {
        if self.magic != UPDATE_CONTAINER_MAGIC {
            return false;
        }
        self.firmware_size() != 0 && self.filesystem_size() != 0
    }

    pub fn firmware_size(&self) -> u32 {
        self.firmware_size.get()
    }

    pub fn filesystem_size(&self) -> u32 {
        self.filesystem_size.get()
    }

    /// Total number of bytes the container occupies, header included.
    pub fn container_len(&self) -> u64 {
        UPDATE_HEADER_SIZE as u64 + self.firmware_size() as u64 + self.filesystem_size() as u64
    }

    pub fn firmware_range(&self) -> Range<u64> {
        let start = UPDATE_HEADER_SIZE as u64;
        start..start + self.firmware_size() as u64
    }

    pub fn filesystem_range(&self) -> Range<u64> {
        let start = self.firmware_range().end;
        start..start + self.filesystem_size() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = UpdateHeader::new(10, 3);
        assert_eq!(
            header.as_bytes(),
            &[
                0x4B, 0x32, 0x55, 0x50, 0x44, 0x31, 0x00, 0x00, // magic
                0x0A, 0x00, 0x00, 0x00, // firmware size
                0x03, 0x00, 0x00, 0x00, // filesystem size
            ]
        );
        assert_eq!(header.container_len(), 29);
        assert_eq!(header.firmware_range(), 16..26);
        assert_eq!(header.filesystem_range(), 26..29);
    }

    #[test]
    fn test_sizes_are_little_endian() {
        let header = UpdateHeader::new(0x1234_5678, 0xFFFF_FFFF);
        assert_eq!(&header.as_bytes()[8..12], &[0x78, 0x56, 0x34, 0x12]);
        assert_eq!(&header.as_bytes()[12..16], &[0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(header.container_len(), 16 + 0x1234_5678 + 0xFFFF_FFFF);
    }

    #[test]
    fn test_read_from_prefix() {
        let mut bytes = UpdateHeader::new(4, 2).as_bytes().to_vec();
        bytes.extend_from_slice(&[1, 2, 3, 4, 5, 6]);
        let (header, rest) = UpdateHeader::read_from_prefix(&bytes).unwrap();
        assert!(header.verify());
        assert_eq!(header.firmware_size(), 4);
        assert_eq!(header.filesystem_size(), 2);
        assert_eq!(rest.len(), 6);

        assert!(UpdateHeader::read_from_prefix(&bytes[..15]).is_err());
    }

    #[test]
    fn test_verify() {
        assert!(UpdateHeader::new(1, 1).verify());
        assert!(!UpdateHeader::new(0, 1).verify());
        assert!(!UpdateHeader::new(1, 0).verify());

        let mut header = UpdateHeader::new(1, 1);
        header.magic[6] = 1;
        assert!(!header.verify());
        header.magic = *b"K2BK\0\0\0\0";
        assert!(!header.verify());
    }
}
