//! Fixed-capacity byte store backing the RAM window of the bus.

use crate::bus::{BusError, BusTarget};

/// Contiguous, bounds-checked byte array with a fixed capacity.
///
/// A `Memory` carries no notion of its bus base address; the [`crate::Bus`]
/// window it is mapped into translates absolute addresses to the
/// window-relative offsets seen here.
pub struct Memory {
    bytes: Box<[u8]>,
}

impl Memory {
    /// Allocates a zeroed store of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity].into_boxed_slice(),
        }
    }

    /// Capacity of the store in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Copies a program or data image into the store before mapping.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::OutOfBounds`] when the image does not fit.
    pub fn load_image(&mut self, offset: u32, image: &[u8]) -> Result<(), BusError> {
        let range = self.checked_range(offset, image.len())?;
        self.bytes[range].copy_from_slice(image);
        Ok(())
    }

    fn checked_range(
        &self,
        offset: u32,
        len: usize,
    ) -> Result<core::ops::Range<usize>, BusError> {
        let start = offset as usize;
        let end = start.checked_add(len);
        match end {
            Some(end) if end <= self.bytes.len() => Ok(start..end),
            _ => Err(BusError::OutOfBounds {
                offset,
                len: u32::try_from(len).unwrap_or(u32::MAX),
                capacity: u32::try_from(self.bytes.len()).unwrap_or(u32::MAX),
            }),
        }
    }
}

impl BusTarget for Memory {
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), BusError> {
        let range = self.checked_range(offset, buf.len())?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), BusError> {
        let range = self.checked_range(offset, data.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }
}
