//! Stand-in for the texture transcoder module.
//!
//! Containers use a tiny format instead of real compressed data:
//!
//! ```text
//! "sB" | image count: u8 | per image: level count: u8 | per level: width: u16le height: u16le
//! ```
//!
//! [`MockBasisFile::encode`] builds one. Transcoding fills the destination
//! with a deterministic pattern derived from the image, level and byte
//! index.

use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tether_core::tasks::HostCx;
use tether_core::value::{HostException, HostObject, HostResult, HostValue};

const MAGIC: [u8; 2] = *b"sB";

/// Uncompressed 32-bit RGBA.
pub const FORMAT_RGBA32: u32 = 13;

/// Bytes needed to transcode a `width` x `height` level to `format`.
pub fn transcoded_size(width: u32, height: u32, format: u32) -> u32 {
    let blocks = width.div_ceil(4) * height.div_ceil(4);
    match format {
        FORMAT_RGBA32 => width * height * 4,
        14..=16 => width * height * 2,
        0 | 2 | 4 => blocks * 8,
        _ => blocks * 16,
    }
}

/// The global `BASIS` namespace.
#[derive(Default)]
pub struct MockBasis {
    initialized: Arc<AtomicBool>,
}

impl MockBasis {
    /// An uninitialised module.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `initializeBasis` has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }
}

impl HostObject for MockBasis {
    fn class_name(&self) -> &str {
        "BASIS"
    }

    fn get(&self, _cx: &HostCx, name: &str) -> HostResult<HostValue> {
        Ok(match name {
            "BasisFile" => HostValue::native(BasisFileClass {
                initialized: self.initialized.clone(),
            }),
            _ => HostValue::Undefined,
        })
    }

    fn call(&self, _cx: &HostCx, method: &str, _args: &[HostValue]) -> HostResult<HostValue> {
        match method {
            "initializeBasis" => {
                self.initialized.store(true, Ordering::Release);
                Ok(HostValue::Undefined)
            }
            _ => Err(HostException::type_error(format!("BASIS.{method} is not a function")).into()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct BasisFileClass {
    initialized: Arc<AtomicBool>,
}

impl HostObject for BasisFileClass {
    fn class_name(&self) -> &str {
        "Function"
    }

    fn construct(&self, _cx: &HostCx, args: &[HostValue]) -> HostResult<HostValue> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(HostException::error(
                "initializeBasis() must be called before creating a BasisFile",
            )
            .into());
        }
        let data = match args.first() {
            Some(HostValue::Bytes(bytes)) => bytes.to_vec(),
            _ => return Err(HostException::type_error("BasisFile expects a Uint8Array").into()),
        };
        Ok(HostValue::native(MockBasisFile::parse(&data)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Default)]
struct FileState {
    started: bool,
    closed: bool,
    deleted: bool,
}

/// One opened container.
pub struct MockBasisFile {
    /// Per image, per level: (width, height). `None` when the header is bad.
    images: Option<Vec<Vec<(u32, u32)>>>,
    state: Mutex<FileState>,
}

impl MockBasisFile {
    /// Build a container.
    pub fn encode(images: &[&[(u16, u16)]]) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        out.push(images.len() as u8);
        for levels in images {
            out.push(levels.len() as u8);
            for (w, h) in levels.iter() {
                out.extend_from_slice(&w.to_le_bytes());
                out.extend_from_slice(&h.to_le_bytes());
            }
        }
        out
    }

    fn parse(data: &[u8]) -> Self {
        Self {
            images: parse_images(data),
            state: Mutex::new(FileState::default()),
        }
    }

    /// Whether `delete` was called.
    pub fn is_deleted(&self) -> bool {
        self.state.lock().deleted
    }

    fn level(&self, image: u32, level: u32) -> Option<(u32, u32)> {
        let images = self.images.as_ref()?;
        images.get(image as usize)?.get(level as usize).copied()
    }

    fn transcode(&self, dst: &HostValue, image: u32, level: u32, format: u32) -> HostResult<u32> {
        if !self.state.lock().started {
            return Ok(0);
        }
        let Some((width, height)) = self.level(image, level) else {
            return Ok(0);
        };
        let HostValue::Bytes(dst) = dst else {
            return Err(HostException::type_error(
                "transcodeImage destination must be a Uint8Array",
            )
            .into());
        };
        let needed = transcoded_size(width, height, format) as usize;
        if dst.len() < needed {
            return Ok(0);
        }
        dst.with_mut(|bytes| {
            for (i, b) in bytes[..needed].iter_mut().enumerate() {
                *b = (image as usize * 31 + level as usize * 7 + i) as u8;
            }
        });
        Ok(1)
    }
}

fn parse_images(data: &[u8]) -> Option<Vec<Vec<(u32, u32)>>> {
    let rest = data.strip_prefix(&MAGIC)?;
    let (&count, mut rest) = rest.split_first()?;
    let mut images = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (&levels, tail) = rest.split_first()?;
        rest = tail;
        let mut dims = Vec::with_capacity(levels as usize);
        for _ in 0..levels {
            let (entry, tail) = rest.split_at_checked(4)?;
            rest = tail;
            let w = u16::from_le_bytes([entry[0], entry[1]]);
            let h = u16::from_le_bytes([entry[2], entry[3]]);
            dims.push((u32::from(w), u32::from(h)));
        }
        images.push(dims);
    }
    Some(images)
}

impl HostObject for MockBasisFile {
    fn class_name(&self) -> &str {
        "BasisFile"
    }

    fn call(&self, _cx: &HostCx, method: &str, args: &[HostValue]) -> HostResult<HostValue> {
        let n = |i: usize| args.get(i).map_or(0, HostValue::to_u32);
        if self.state.lock().deleted {
            return Err(HostException::error(format!(
                "BasisFile.{method} called after delete"
            ))
            .into());
        }
        let result = match method {
            "startTranscoding" => {
                let mut state = self.state.lock();
                state.started = self.images.is_some() && !state.closed;
                u32::from(state.started)
            }
            "getNumImages" => self.images.as_ref().map_or(0, |i| i.len() as u32),
            "getNumLevels" => self
                .images
                .as_ref()
                .and_then(|i| i.get(n(0) as usize))
                .map_or(0, |levels| levels.len() as u32),
            "getImageWidth" => self.level(n(0), n(1)).map_or(0, |(w, _)| w),
            "getImageHeight" => self.level(n(0), n(1)).map_or(0, |(_, h)| h),
            "getImageTranscodedSizeInBytes" => self
                .level(n(0), n(1))
                .map_or(0, |(w, h)| transcoded_size(w, h, n(2))),
            "transcodeImage" => {
                let dst = args.first().cloned().unwrap_or_default();
                self.transcode(&dst, n(1), n(2), n(3))?
            }
            "close" => {
                let mut state = self.state.lock();
                state.closed = true;
                state.started = false;
                return Ok(HostValue::Undefined);
            }
            "delete" => {
                self.state.lock().deleted = true;
                return Ok(HostValue::Undefined);
            }
            _ => return Err(HostException::type_error(format!(
                "BasisFile.{method} is not a function"
            ))
            .into()),
        };
        Ok(HostValue::from(result))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::value::HostBytes;

    fn open(cx: &HostCx, data: Vec<u8>) -> HostValue {
        let basis = HostValue::native(MockBasis::new());
        basis.call_method(cx, "initializeBasis", &[]).unwrap();
        let class = basis.get_property(cx, "BasisFile").unwrap();
        class.construct(cx, &[HostValue::Bytes(HostBytes::from_vec(data))]).unwrap()
    }

    #[test]
    fn constructing_before_initialize_throws() {
        let cx = HostCx::default();
        let basis = HostValue::native(MockBasis::new());
        let class = basis.get_property(&cx, "BasisFile").unwrap();
        assert!(class.construct(&cx, &[HostValue::Bytes(HostBytes::zeroed(4))]).is_err());
    }

    #[test]
    fn reports_levels_and_sizes() {
        let cx = HostCx::default();
        let file = open(&cx, MockBasisFile::encode(&[&[(8, 8), (4, 4)]]));
        let call = |m: &str, args: &[u32]| {
            let args: Vec<HostValue> = args.iter().map(|a| HostValue::from(*a)).collect();
            file.call_method(&cx, m, &args).unwrap().to_u32()
        };
        assert_eq!(call("startTranscoding", &[]), 1);
        assert_eq!(call("getNumImages", &[]), 1);
        assert_eq!(call("getNumLevels", &[0]), 2);
        assert_eq!(call("getImageWidth", &[0, 1]), 4);
        assert_eq!(call("getImageTranscodedSizeInBytes", &[0, 0, FORMAT_RGBA32]), 256);
        assert_eq!(call("getImageTranscodedSizeInBytes", &[0, 0, 2]), 32);
        assert_eq!(call("getImageWidth", &[3, 0]), 0);
    }

    #[test]
    fn transcode_fills_destination() {
        let cx = HostCx::default();
        let file = open(&cx, MockBasisFile::encode(&[&[(4, 4)]]));
        file.call_method(&cx, "startTranscoding", &[]).unwrap();
        let dst = HostBytes::zeroed(64);
        let ok = file
            .call_method(
                &cx,
                "transcodeImage",
                &[
                    HostValue::Bytes(dst.clone()),
                    HostValue::from(0u32),
                    HostValue::from(0u32),
                    HostValue::from(FORMAT_RGBA32),
                ],
            )
            .unwrap();
        assert_eq!(ok.to_u32(), 1);
        assert_eq!(dst.to_vec()[..4], [0, 1, 2, 3]);

        let small = HostBytes::zeroed(8);
        let fail = file
            .call_method(
                &cx,
                "transcodeImage",
                &[
                    HostValue::Bytes(small),
                    HostValue::from(0u32),
                    HostValue::from(0u32),
                    HostValue::from(FORMAT_RGBA32),
                ],
            )
            .unwrap();
        assert_eq!(fail.to_u32(), 0);
    }

    #[test]
    fn bad_header_never_starts() {
        let cx = HostCx::default();
        let file = open(&cx, b"nope".to_vec());
        assert_eq!(file.call_method(&cx, "startTranscoding", &[]).unwrap().to_u32(), 0);
        file.call_method(&cx, "delete", &[]).unwrap();
        assert!(file.call_method(&cx, "getNumImages", &[]).is_err());
    }
}
