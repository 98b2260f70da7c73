//! UTF-8 text crossing the boundary.

use super::{GuestAllocator, GuestMemory, field_address, guest_len};
use crate::error::{BridgeError, Result};

/// A string written into guest memory. The guest owns the allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuestStr {
    /// Start of the encoded bytes.
    pub ptr: u32,
    /// Encoded length in bytes.
    pub len: u32,
}

/// Decode a guest span. Malformed UTF-8 is an error, never replaced.
pub fn decode<M: GuestMemory + ?Sized>(memory: &mut M, ptr: u32, len: u32) -> Result<String> {
    let mut linear = memory.linear();
    let view = linear.bytes();
    let bytes = view.read(ptr, len)?;
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| BridgeError::InvalidUtf8 {
            ptr,
            len,
            valid_up_to: e.valid_up_to(),
        })
}

/// Decode a span whose ownership moved to the host, then release it.
///
/// The span is freed whether or not decoding succeeds.
pub fn take_owned<G>(guest: &mut G, ptr: u32, len: u32) -> Result<String>
where
    G: GuestMemory + GuestAllocator + ?Sized,
{
    let decoded = decode(guest, ptr, len);
    guest.free(ptr, len, 1)?;
    decoded
}

/// Encode text into a fresh guest allocation, choosing the growth path when
/// the guest exports `realloc`.
pub fn encode<G>(guest: &mut G, text: &str) -> Result<GuestStr>
where
    G: GuestMemory + GuestAllocator + ?Sized,
{
    if guest.can_realloc() {
        encode_growing(guest, text)
    } else {
        encode_exact(guest, text)
    }
}

/// Allocate exactly the encoded size and copy once.
pub fn encode_exact<G>(guest: &mut G, text: &str) -> Result<GuestStr>
where
    G: GuestMemory + GuestAllocator + ?Sized,
{
    let bytes = text.as_bytes();
    let len = guest_len(bytes.len())?;
    let ptr = guest.malloc(len, 1)?;
    guest.linear().bytes().write(ptr, bytes)?;
    Ok(GuestStr { ptr, len })
}

/// Allocate one byte per UTF-16 unit and copy the ASCII prefix. On the
/// first non-ASCII character, reallocate to the worst case for the rest
/// (three bytes per unit), encode it, then shrink to the exact length.
pub fn encode_growing<G>(guest: &mut G, text: &str) -> Result<GuestStr>
where
    G: GuestMemory + GuestAllocator + ?Sized,
{
    let units = guest_len(utf16_len(text))?;
    let mut ptr = guest.malloc(units, 1)?;

    let bytes = text.as_bytes();
    let ascii = bytes.iter().take_while(|b| b.is_ascii()).count();
    {
        let mut linear = guest.linear();
        let mut view = linear.bytes();
        view.slice_mut(ptr, guest_len(ascii)?)?
            .copy_from_slice(&bytes[..ascii]);
    }
    if ascii == bytes.len() {
        return Ok(GuestStr { ptr, len: units });
    }

    let rest = &text[ascii..];
    let offset = guest_len(ascii)?;
    let worst = utf16_len(rest)
        .checked_mul(3)
        .and_then(|n| n.checked_add(ascii))
        .ok_or(BridgeError::AddressOverflow {
            value: text.len() as u64,
        })?;
    let capacity = guest_len(worst)?;
    ptr = guest.realloc(ptr, units, capacity, 1)?;
    tracing::trace!(ptr, ascii, capacity, "string encode switched to growth path");

    guest.linear().bytes().write(field_address(ptr, offset)?, rest.as_bytes())?;
    let len = guest_len(bytes.len())?;
    ptr = guest.realloc(ptr, capacity, len, 1)?;
    Ok(GuestStr { ptr, len })
}

/// Write a two-field out-parameter: pointer at `scratch`, length at
/// `scratch + 4`.
///
/// Both fields are checked before either is written.
pub fn write_out_pair<M: GuestMemory + ?Sized>(
    memory: &mut M,
    scratch: u32,
    ptr: u32,
    len: u32,
) -> Result<()> {
    let len_at = field_address(scratch, 4)?;
    let mut linear = memory.linear();
    super::span(scratch, 8, linear.size())?;
    let mut dv = linear.data_view();
    dv.set_i32(len_at, len as i32)?;
    dv.set_i32(scratch, ptr as i32)
}

fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}
