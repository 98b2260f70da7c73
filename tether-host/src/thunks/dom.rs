//! Window, document, canvas, fetch and timing imports.

use crate::marshal::{Op, Param as P, Ret as R, Thunk};
use crate::thunk;

/// Thunks for the page environment.
pub static THUNKS: &[Thunk] = &[
    // Global object lookups. Each yields the global object or nothing.
    thunk!("__wbg_static_accessor_GLOBAL" => Op::Static("globalThis.global"), [] -> R::OptRef),
    thunk!("__wbg_static_accessor_GLOBAL_THIS" => Op::Static("globalThis"), [] -> R::OptRef),
    thunk!("__wbg_static_accessor_SELF" => Op::Static("globalThis.self"), [] -> R::OptRef),
    thunk!("__wbg_static_accessor_WINDOW" => Op::Static("globalThis.window"), [] -> R::OptRef),
    thunk!("__wbg_Window" => Op::Get("Window"), [P::Ref] -> R::Ref),
    thunk!("__wbg_WorkerGlobalScope" => Op::Get("WorkerGlobalScope"), [P::Ref] -> R::Ref),
    thunk!("__wbg_instanceof_Window" => Op::InstanceOf("Window"), [P::Ref] -> R::Bool),
    // Document and canvas.
    thunk!("__wbg_document" => Op::Get("document"), [P::Ref] -> R::OptRef),
    thunk!("__wbg_getElementById" => Op::Method("getElementById"), [P::Ref, P::Str] -> R::OptRef),
    thunk!(
        "__wbg_querySelectorAll" => Op::Method("querySelectorAll"),
        [P::Ref, P::Str] -> R::Ref, catch
    ),
    thunk!(
        "__wbg_instanceof_HtmlCanvasElement" => Op::InstanceOf("HTMLCanvasElement"),
        [P::Ref] -> R::Bool
    ),
    thunk!("__wbg_getContext" => Op::Method("getContext"), [P::Ref, P::Str] -> R::OptRef, catch),
    // Network.
    thunk!("__wbg_fetch" => Op::Method("fetch"), [P::Ref, P::Str] -> R::Ref),
    thunk!("__wbg_instanceof_Response" => Op::InstanceOf("Response"), [P::Ref] -> R::Bool),
    thunk!("__wbg_ok" => Op::Get("ok"), [P::Ref] -> R::Bool),
    thunk!("__wbg_status" => Op::Get("status"), [P::Ref] -> R::U32),
    thunk!("__wbg_arrayBuffer" => Op::Method("arrayBuffer"), [P::Ref] -> R::Ref, catch),
    // Timing.
    thunk!(
        "__wbg_requestAnimationFrame" => Op::Method("requestAnimationFrame"),
        [P::Ref, P::Ref] -> R::I32, catch
    ),
    thunk!(
        "__wbg_cancelAnimationFrame" => Op::Method("cancelAnimationFrame"),
        [P::Ref, P::I32] -> R::Void, catch
    ),
    thunk!("__wbg_performance" => Op::Get("performance"), [P::Ref] -> R::OptRef),
    thunk!("__wbg_now" => Op::Method("now"), [P::Ref] -> R::F64),
];
