//! Typed views over linear memory and the cache that tracks their validity.

use super::span;
use crate::error::Result;

/// The kinds of view tracked independently by the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// Byte-addressed.
    Byte,
    /// 32-bit word addressed.
    Word32,
    /// Structured access at arbitrary offsets.
    Data,
}

impl ViewKind {
    const ALL: [ViewKind; 3] = [ViewKind::Byte, ViewKind::Word32, ViewKind::Data];

    fn index(self) -> usize {
        match self {
            Self::Byte => 0,
            Self::Word32 => 1,
            Self::Data => 2,
        }
    }
}

/// Identity of the buffer a view was built over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewStamp {
    base: usize,
    len: usize,
    generation: u64,
}

impl ViewStamp {
    /// Byte length the view covers.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the view covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Rebuild counter value when this view was created.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Per-kind record of the buffer each view was last built over.
#[derive(Debug, Default)]
pub struct ViewCache {
    entries: [Option<ViewStamp>; 3],
    rebuilds: [u64; 3],
}

impl ViewCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the stamp for `kind`, rebuilding it when the buffer moved,
    /// changed length, or the cached view is empty.
    pub fn refresh(&mut self, kind: ViewKind, data: &[u8]) -> ViewStamp {
        let idx = kind.index();
        let base = data.as_ptr() as usize;
        let len = data.len();
        if let Some(stamp) = self.entries[idx] {
            if stamp.base == base && stamp.len == len && stamp.len != 0 {
                return stamp;
            }
        }
        self.rebuilds[idx] += 1;
        let stamp = ViewStamp {
            base,
            len,
            generation: self.rebuilds[idx],
        };
        tracing::trace!(?kind, len, generation = stamp.generation, "memory view rebuilt");
        self.entries[idx] = Some(stamp);
        stamp
    }

    /// Number of times a view of `kind` has been built.
    pub fn rebuilds(&self, kind: ViewKind) -> u64 {
        self.rebuilds[kind.index()]
    }

    /// The stamp currently cached for `kind`, if any.
    pub fn current(&self, kind: ViewKind) -> Option<ViewStamp> {
        self.entries[kind.index()]
    }

    /// Mark the view of `kind` as detached.
    pub fn detach(&mut self, kind: ViewKind) {
        self.entries[kind.index()] = None;
    }

    /// Drop every cached view. Called when an instance is (re)initialized.
    pub fn invalidate_all(&mut self) {
        for kind in ViewKind::ALL {
            self.detach(kind);
        }
    }
}

/// Byte-addressed view.
pub struct ByteView<'a> {
    data: &'a mut [u8],
    stamp: ViewStamp,
}

impl<'a> ByteView<'a> {
    pub(crate) fn new(data: &'a mut [u8], stamp: ViewStamp) -> Self {
        Self { data, stamp }
    }

    /// Stamp this view was built with.
    pub fn stamp(&self) -> ViewStamp {
        self.stamp
    }

    /// Byte length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the memory is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow a span.
    pub fn read(&self, ptr: u32, len: u32) -> Result<&[u8]> {
        let range = span(ptr, len, self.data.len())?;
        Ok(&self.data[range])
    }

    /// Copy a span out.
    pub fn to_vec(&self, ptr: u32, len: u32) -> Result<Vec<u8>> {
        self.read(ptr, len).map(<[u8]>::to_vec)
    }

    /// Borrow a span mutably.
    pub fn slice_mut(&mut self, ptr: u32, len: u32) -> Result<&mut [u8]> {
        let range = span(ptr, len, self.data.len())?;
        Ok(&mut self.data[range])
    }

    /// Copy bytes in at `ptr`.
    pub fn write(&mut self, ptr: u32, bytes: &[u8]) -> Result<()> {
        let len = super::guest_len(bytes.len())?;
        self.slice_mut(ptr, len)?.copy_from_slice(bytes);
        Ok(())
    }
}

/// 32-bit word view. Indexing is by word; spans are given as a byte
/// pointer that is truncated to word alignment.
pub struct WordView<'a> {
    data: &'a mut [u8],
    stamp: ViewStamp,
}

impl<'a> WordView<'a> {
    pub(crate) fn new(data: &'a mut [u8], stamp: ViewStamp) -> Self {
        Self { data, stamp }
    }

    /// Stamp this view was built with.
    pub fn stamp(&self) -> ViewStamp {
        self.stamp
    }

    /// Number of whole words.
    pub fn len(&self) -> usize {
        self.data.len() / 4
    }

    /// Whether the view holds no whole word.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the word at `index`.
    pub fn get(&self, index: u32) -> Result<u32> {
        let range = span(index.saturating_mul(4), 4, self.data.len())?;
        let w = &self.data[range];
        Ok(u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
    }

    /// Copy `count` words starting at byte pointer `ptr`.
    pub fn span(&self, ptr: u32, count: u32) -> Result<Vec<u32>> {
        let start = ptr / 4 * 4;
        let range = span(start, count.saturating_mul(4), self.data.len())?;
        Ok(self.data[range]
            .chunks_exact(4)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .collect())
    }

    /// Write words starting at byte pointer `ptr`.
    pub fn write(&mut self, ptr: u32, words: &[u32]) -> Result<()> {
        let start = ptr / 4 * 4;
        let count = super::guest_len(words.len())?;
        let range = span(start, count.saturating_mul(4), self.data.len())?;
        for (dst, word) in self.data[range].chunks_exact_mut(4).zip(words) {
            dst.copy_from_slice(&word.to_le_bytes());
        }
        Ok(())
    }
}

/// Structured little-endian access at arbitrary offsets.
pub struct DataView<'a> {
    data: &'a mut [u8],
    stamp: ViewStamp,
}

impl<'a> DataView<'a> {
    pub(crate) fn new(data: &'a mut [u8], stamp: ViewStamp) -> Self {
        Self { data, stamp }
    }

    /// Stamp this view was built with.
    pub fn stamp(&self) -> ViewStamp {
        self.stamp
    }

    fn bytes<const N: usize>(&self, offset: u32) -> Result<[u8; N]> {
        let range = span(offset, N as u32, self.data.len())?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[range]);
        Ok(out)
    }

    fn put<const N: usize>(&mut self, offset: u32, bytes: [u8; N]) -> Result<()> {
        let range = span(offset, N as u32, self.data.len())?;
        self.data[range].copy_from_slice(&bytes);
        Ok(())
    }

    /// Read an `i32`.
    pub fn get_i32(&self, offset: u32) -> Result<i32> {
        self.bytes(offset).map(i32::from_le_bytes)
    }

    /// Write an `i32`.
    pub fn set_i32(&mut self, offset: u32, value: i32) -> Result<()> {
        self.put(offset, value.to_le_bytes())
    }

    /// Read a `u32`.
    pub fn get_u32(&self, offset: u32) -> Result<u32> {
        self.bytes(offset).map(u32::from_le_bytes)
    }

    /// Write a `u32`.
    pub fn set_u32(&mut self, offset: u32, value: u32) -> Result<()> {
        self.put(offset, value.to_le_bytes())
    }

    /// Read an `f64`.
    pub fn get_f64(&self, offset: u32) -> Result<f64> {
        self.bytes(offset).map(f64::from_le_bytes)
    }

    /// Write an `f64`.
    pub fn set_f64(&mut self, offset: u32, value: f64) -> Result<()> {
        self.put(offset, value.to_le_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::memory::Linear;

    #[test]
    fn cached_view_survives_unchanged_buffer() {
        let mut cache = ViewCache::new();
        let mut buf = vec![0u8; 64];
        let first = Linear::new(&mut buf, &mut cache).bytes().stamp();
        let second = Linear::new(&mut buf, &mut cache).bytes().stamp();
        assert_eq!(first, second);
        assert_eq!(cache.rebuilds(ViewKind::Byte), 1);
    }

    #[test]
    fn relocated_buffer_rebuilds_view() {
        let mut cache = ViewCache::new();
        let mut buf = vec![0u8; 64];
        Linear::new(&mut buf, &mut cache).bytes();

        let mut grown = vec![0u8; 128];
        grown[..64].copy_from_slice(&buf);
        drop(buf);
        let stamp = Linear::new(&mut grown, &mut cache).bytes().stamp();
        assert_eq!(stamp.len(), 128);
        assert_eq!(cache.rebuilds(ViewKind::Byte), 2);
    }

    #[test]
    fn kinds_are_tracked_independently() {
        let mut cache = ViewCache::new();
        let mut buf = vec![0u8; 64];
        Linear::new(&mut buf, &mut cache).bytes();
        Linear::new(&mut buf, &mut cache).words();
        Linear::new(&mut buf, &mut cache).words();
        assert_eq!(cache.rebuilds(ViewKind::Byte), 1);
        assert_eq!(cache.rebuilds(ViewKind::Word32), 1);
        assert_eq!(cache.rebuilds(ViewKind::Data), 0);

        cache.detach(ViewKind::Word32);
        Linear::new(&mut buf, &mut cache).words();
        Linear::new(&mut buf, &mut cache).bytes();
        assert_eq!(cache.rebuilds(ViewKind::Word32), 2);
        assert_eq!(cache.rebuilds(ViewKind::Byte), 1);
    }

    #[test]
    fn empty_buffer_is_always_rebuilt() {
        let mut cache = ViewCache::new();
        let mut buf: Vec<u8> = Vec::new();
        Linear::new(&mut buf, &mut cache).bytes();
        Linear::new(&mut buf, &mut cache).bytes();
        assert_eq!(cache.rebuilds(ViewKind::Byte), 2);
    }

    #[test]
    fn data_view_is_little_endian() {
        let mut cache = ViewCache::new();
        let mut buf = vec![0u8; 32];
        let mut linear = Linear::new(&mut buf, &mut cache);
        let mut dv = linear.data_view();
        dv.set_i32(0, 0x0102_0304).unwrap();
        dv.set_f64(8, 2.5).unwrap();
        assert_eq!(dv.get_u32(0).unwrap(), 0x0102_0304);
        assert_eq!(dv.get_f64(8).unwrap(), 2.5);
        assert_eq!(&buf[..4], &[4, 3, 2, 1]);
    }

    #[test]
    fn word_span_reads_le_words() {
        let mut cache = ViewCache::new();
        let mut buf = vec![0u8; 16];
        buf[4..8].copy_from_slice(&7u32.to_le_bytes());
        buf[8..12].copy_from_slice(&9u32.to_le_bytes());
        let mut linear = Linear::new(&mut buf, &mut cache);
        assert_eq!(linear.words().span(4, 2).unwrap(), vec![7, 9]);
        assert_eq!(linear.words().get(2).unwrap(), 9);
    }

    #[test]
    fn out_of_bounds_is_fatal() {
        let mut cache = ViewCache::new();
        let mut buf = vec![0u8; 8];
        let mut linear = Linear::new(&mut buf, &mut cache);
        assert!(matches!(
            linear.bytes().read(6, 4),
            Err(BridgeError::OutOfBounds { .. })
        ));
        assert!(linear.data_view().get_f64(4).is_err());
        assert!(linear.words().span(4, 2).is_err());
    }
}
