//! Access to the guest's linear memory.
//!
//! The guest owns one resizable byte buffer. Growing it may move the
//! backing storage, so nothing here holds an address across a call into the
//! guest: [`GuestMemory::linear`] hands out a borrow of the current buffer
//! together with the [`ViewCache`], and every typed view is derived from that
//! borrow. The borrow checker makes a pre-growth view unusable once the guest
//! runs again.
//!
//! The view cache records the identity (base address and length) of the
//! buffer each view kind last saw and rebuilds lazily when it changes.

mod codec;
mod view;

pub use codec::{
    GuestStr, decode, encode, encode_exact, encode_growing, take_owned, write_out_pair,
};
pub use view::{ByteView, DataView, ViewCache, ViewKind, ViewStamp, WordView};

use crate::error::{BridgeError, Result};
use std::ops::Range;

/// Size of a wasm page in bytes.
pub const WASM_PAGE_SIZE: usize = 65_536;

/// Source of the guest's current linear memory.
pub trait GuestMemory {
    /// Borrow the current buffer and view cache.
    fn linear(&mut self) -> Linear<'_>;
}

/// Allocator exported by the guest for buffers the host fills.
pub trait GuestAllocator {
    /// Allocate `size` bytes with the given alignment.
    fn malloc(&mut self, size: u32, align: u32) -> Result<u32>;

    /// Resize an allocation, possibly moving it.
    fn realloc(&mut self, ptr: u32, old_size: u32, new_size: u32, align: u32) -> Result<u32>;

    /// Release an allocation.
    fn free(&mut self, ptr: u32, size: u32, align: u32) -> Result<()>;

    /// Whether [`realloc`](Self::realloc) is available. Selects the string
    /// encoder's growth path.
    fn can_realloc(&self) -> bool;
}

/// A borrow of the guest buffer for the duration of one host call step.
pub struct Linear<'a> {
    data: &'a mut [u8],
    views: &'a mut ViewCache,
}

impl<'a> Linear<'a> {
    /// Pair a buffer with its view cache.
    pub fn new(data: &'a mut [u8], views: &'a mut ViewCache) -> Self {
        Self { data, views }
    }

    /// Current byte length.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Byte-addressed view.
    pub fn bytes(&mut self) -> ByteView<'_> {
        let stamp = self.views.refresh(ViewKind::Byte, self.data);
        ByteView::new(self.data, stamp)
    }

    /// 32-bit word view.
    pub fn words(&mut self) -> WordView<'_> {
        let stamp = self.views.refresh(ViewKind::Word32, self.data);
        WordView::new(self.data, stamp)
    }

    /// Structured little-endian view.
    pub fn data_view(&mut self) -> DataView<'_> {
        let stamp = self.views.refresh(ViewKind::Data, self.data);
        DataView::new(self.data, stamp)
    }
}

/// Validate `offset + len` against `size` and return the byte range.
pub(crate) fn span(offset: u32, len: u32, size: usize) -> Result<Range<usize>> {
    let start = u64::from(offset);
    let end = start + u64::from(len);
    if end > size as u64 {
        return Err(BridgeError::OutOfBounds {
            offset: start,
            len: u64::from(len),
            size: size as u64,
        });
    }
    Ok(start as usize..end as usize)
}

/// Address of a field `offset` bytes past a guest-supplied `base`.
pub fn field_address(base: u32, offset: u32) -> Result<u32> {
    base.checked_add(offset).ok_or(BridgeError::AddressOverflow {
        value: u64::from(base) + u64::from(offset),
    })
}

/// Convert a host length into a guest length.
pub fn guest_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| BridgeError::AddressOverflow { value: len as u64 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_checks_bounds() {
        assert_eq!(span(0, 4, 4).unwrap(), 0..4);
        assert_eq!(span(4, 0, 4).unwrap(), 4..4);
        assert!(matches!(
            span(2, 4, 4),
            Err(BridgeError::OutOfBounds { offset: 2, len: 4, size: 4 })
        ));
        assert!(span(u32::MAX, u32::MAX, 16).is_err());
    }

    #[test]
    fn field_addresses_never_wrap() {
        assert_eq!(field_address(16, 8).unwrap(), 24);
        assert!(matches!(
            field_address(u32::MAX - 1, 4),
            Err(BridgeError::AddressOverflow { value }) if value == u64::from(u32::MAX) + 3
        ));
    }

    #[test]
    fn guest_len_rejects_huge_lengths() {
        assert_eq!(guest_len(12).unwrap(), 12);
        #[cfg(target_pointer_width = "64")]
        assert!(guest_len(usize::MAX).is_err());
    }
}
