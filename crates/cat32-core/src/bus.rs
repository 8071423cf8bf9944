//! Address-space router connecting the core to memory and peripheral
//! windows.
//!
//! The bus owns an ordered set of pairwise-disjoint address windows, each
//! backed by a [`BusTarget`]. Every access must fall entirely within one
//! window; spans that cross a window boundary or touch unmapped space fail
//! with a typed error and are never partially serviced.

use thiserror::Error;

/// Typed failures for address-space routing and window access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BusError {
    /// No window maps the start of the access.
    #[error("no window maps address {addr:#010x}")]
    Unmapped {
        /// First address of the access.
        addr: u32,
    },
    /// The access starts inside a window but does not fit within it.
    #[error("access at {addr:#010x} of {len} bytes crosses a window boundary")]
    CrossesWindow {
        /// First address of the access.
        addr: u32,
        /// Byte length of the access.
        len: u32,
    },
    /// A target rejected a window-relative access past its capacity.
    #[error("access at offset {offset:#010x} of {len} bytes exceeds target capacity {capacity:#x}")]
    OutOfBounds {
        /// Window-relative offset of the access.
        offset: u32,
        /// Byte length of the access.
        len: u32,
        /// Capacity of the backing target in bytes.
        capacity: u32,
    },
    /// A new window would overlap one that is already mapped.
    #[error("window at {start:#010x} of {len} bytes overlaps an existing window")]
    Overlap {
        /// First address of the rejected window.
        start: u32,
        /// Byte length of the rejected window.
        len: u32,
    },
    /// A window was registered with zero length.
    #[error("window at {start:#010x} has zero length")]
    EmptyWindow {
        /// First address of the rejected window.
        start: u32,
    },
}

/// A memory bank or peripheral occupying one bus window.
///
/// Offsets are window-relative; the bus performs the address-space routing
/// and hands targets only accesses that fit their window.
pub trait BusTarget {
    /// Fills `buf` starting at `offset` bytes into the window.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::OutOfBounds`] when the access does not fit the
    /// target's backing store.
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), BusError>;

    /// Writes `data` starting at `offset` bytes into the window.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::OutOfBounds`] when the access does not fit the
    /// target's backing store.
    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), BusError>;
}

struct Window {
    start: u32,
    len: u32,
    target: Box<dyn BusTarget>,
}

impl Window {
    /// Exclusive end address, in 64-bit space to survive the 4 GiB edge.
    const fn end(&self) -> u64 {
        self.start as u64 + self.len as u64
    }

    const fn contains_span(&self, addr: u32, len: usize) -> bool {
        let span_start = addr as u64;
        let span_end = addr as u64 + len as u64;
        span_start >= self.start as u64 && span_end <= self.end()
    }

    const fn overlaps(&self, start: u32, len: u32) -> bool {
        (start as u64) < self.end() && (self.start as u64) < start as u64 + len as u64
    }
}

/// Byte-granular 32-bit address-space router.
#[derive(Default)]
pub struct Bus {
    windows: Vec<Window>,
}

impl Bus {
    /// Creates a bus with no mapped windows.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a window of `len` bytes at `start`, backed by `target`.
    ///
    /// Mapping is a setup-time operation: overlap with an existing window is
    /// rejected before any execution starts.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::EmptyWindow`] for a zero-length window and
    /// [`BusError::Overlap`] when the range intersects an existing window.
    pub fn map(
        &mut self,
        start: u32,
        len: u32,
        target: Box<dyn BusTarget>,
    ) -> Result<(), BusError> {
        if len == 0 {
            return Err(BusError::EmptyWindow { start });
        }
        if self.windows.iter().any(|w| w.overlaps(start, len)) {
            return Err(BusError::Overlap { start, len });
        }
        self.windows.push(Window { start, len, target });
        Ok(())
    }

    /// Fills `buf` from the single window containing the whole span.
    ///
    /// Zero-length reads succeed without touching any window.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Unmapped`] or [`BusError::CrossesWindow`] when the
    /// span is not serviced by exactly one window, or the target's own error.
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), BusError> {
        if buf.is_empty() {
            return Ok(());
        }
        let window = Self::window_for_span(&mut self.windows, addr, buf.len())?;
        window.target.read(addr - window.start, buf)
    }

    /// Writes `data` through the single window containing the whole span.
    ///
    /// Zero-length writes succeed without touching any window.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Unmapped`] or [`BusError::CrossesWindow`] when the
    /// span is not serviced by exactly one window, or the target's own error.
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), BusError> {
        if data.is_empty() {
            return Ok(());
        }
        let window = Self::window_for_span(&mut self.windows, addr, data.len())?;
        window.target.write(addr - window.start, data)
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Propagates the same errors as [`Bus::read`].
    pub fn read_u8(&mut self, addr: u32) -> Result<u8, BusError> {
        let mut buf = [0u8; 1];
        self.read(addr, &mut buf)?;
        Ok(buf[0])
    }

    /// Reads a little-endian 32-bit value.
    ///
    /// # Errors
    ///
    /// Propagates the same errors as [`Bus::read`].
    pub fn read_u32(&mut self, addr: u32) -> Result<u32, BusError> {
        let mut buf = [0u8; 4];
        self.read(addr, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Writes a little-endian 32-bit value.
    ///
    /// # Errors
    ///
    /// Propagates the same errors as [`Bus::write`].
    pub fn write_u32(&mut self, addr: u32, value: u32) -> Result<(), BusError> {
        self.write(addr, &value.to_le_bytes())
    }

    /// Resolves the deterministic single window servicing the span.
    fn window_for_span(
        windows: &mut [Window],
        addr: u32,
        len: usize,
    ) -> Result<&mut Window, BusError> {
        let containing_start = windows
            .iter_mut()
            .find(|w| w.contains_span(addr, 1))
            .ok_or(BusError::Unmapped { addr })?;
        if containing_start.contains_span(addr, len) {
            Ok(containing_start)
        } else {
            Err(BusError::CrossesWindow {
                addr,
                len: u32::try_from(len).unwrap_or(u32::MAX),
            })
        }
    }
}
