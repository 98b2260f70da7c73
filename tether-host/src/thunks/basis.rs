//! Texture transcoder imports.
//!
//! The transcoder lives under the global `BASIS` namespace. A `BasisFile`
//! wraps one compressed container; the guest queries its images and levels,
//! then transcodes a level straight into a buffer in its own memory.

use crate::marshal::{Op, Param as P, Ret as R, Thunk};
use crate::thunk;

/// Thunks for the transcoder module and its files.
pub static THUNKS: &[Thunk] = &[
    thunk!("__wbg_initializeBasis" => Op::Invoke("BASIS", "initializeBasis"), [] -> R::Void),
    thunk!("__wbg_new_basis_file" => Op::Construct("BASIS.BasisFile"), [P::Ref] -> R::Ref),
    thunk!("__wbg_startTranscoding" => Op::Method("startTranscoding"), [P::Ref] -> R::U32),
    thunk!("__wbg_getNumImages" => Op::Method("getNumImages"), [P::Ref] -> R::U32),
    thunk!("__wbg_getNumLevels" => Op::Method("getNumLevels"), [P::Ref, P::U32] -> R::U32),
    thunk!(
        "__wbg_getImageWidth" => Op::Method("getImageWidth"),
        [P::Ref, P::U32, P::U32] -> R::U32
    ),
    thunk!(
        "__wbg_getImageHeight" => Op::Method("getImageHeight"),
        [P::Ref, P::U32, P::U32] -> R::U32
    ),
    thunk!(
        "__wbg_getImageTranscodedSizeInBytes" => Op::Method("getImageTranscodedSizeInBytes"),
        [P::Ref, P::U32, P::U32, P::U32] -> R::U32
    ),
    // (file, dst, image, level, format, unused, unused); the destination
    // span is filled in place.
    thunk!(
        "__wbg_transcodeImage" => Op::Method("transcodeImage"),
        [P::Ref, P::U8SpanMut, P::U32, P::U32, P::U32, P::U32, P::U32] -> R::U32
    ),
    thunk!("__wbg_close" => Op::Method("close"), [P::Ref] -> R::Void),
    thunk!("__wbg_delete" => Op::Method("delete"), [P::Ref] -> R::Void),
];
