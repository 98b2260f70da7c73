//! Language-level imports: objects, arrays, byte arrays, errors and
//! promises.

use crate::marshal::{Op, Param as P, Ret as R, Thunk};
use crate::thunk;

/// Thunks for built-in objects.
pub static THUNKS: &[Thunk] = &[
    thunk!("__wbg_new_object" => Op::NewObject, [] -> R::Ref),
    thunk!("__wbg_new_array" => Op::NewArray, [] -> R::Ref),
    thunk!("__wbg_new_error" => Op::NewError, [] -> R::Ref),
    thunk!("__wbg_new_error_with_message" => Op::NewError, [P::Str] -> R::Ref),
    thunk!("__wbg_new_uint8array" => Op::NewBytes, [P::Ref] -> R::Ref),
    thunk!(
        "__wbg_newwithbyteoffsetandlength" => Op::NewBytesView,
        [P::Ref, P::U32, P::U32] -> R::Ref
    ),
    thunk!("__wbg_new_uint8array_from_span" => Op::NewBytes, [P::U8Span] -> R::Ref),
    thunk!("__wbg_buffer" => Op::Get("buffer"), [P::Ref] -> R::Ref),
    thunk!("__wbg_length" => Op::Get("length"), [P::Ref] -> R::U32),
    thunk!("__wbg_set_bytes" => Op::Method("set"), [P::Ref, P::Ref, P::U32] -> R::Void),
    thunk!("__wbg_push" => Op::Method("push"), [P::Ref, P::Ref] -> R::U32),
    thunk!("__wbg_get_index" => Op::Index, [P::Ref, P::U32] -> R::OptRef),
    thunk!("__wbg_set" => Op::ReflectSet, [P::Ref, P::Ref, P::Ref] -> R::Bool, catch),
    thunk!("__wbg_valueOf" => Op::Method("valueOf"), [P::Ref] -> R::F64),
    thunk!("__wbg_keys" => Op::Method("keys"), [P::Ref] -> R::Ref),
    thunk!("__wbg_next" => Op::Method("next"), [P::Ref] -> R::Ref, catch),
    thunk!("__wbg_done" => Op::Get("done"), [P::Ref] -> R::Bool),
    thunk!("__wbg_value" => Op::Get("value"), [P::Ref] -> R::Ref),
    thunk!("__wbg_message" => Op::Get("message"), [P::Ref] -> R::StrOut),
    thunk!("__wbg_stack" => Op::Get("stack"), [P::Ref] -> R::StrOut),
    thunk!("__wbg_instanceof_Object" => Op::InstanceOf("Object"), [P::Ref] -> R::Bool),
    thunk!("__wbg_instanceof_Error" => Op::InstanceOf("Error"), [P::Ref] -> R::Bool),
    thunk!("__wbg_resolve" => Op::ResolvePromise, [P::Ref] -> R::Ref),
    thunk!("__wbg_then" => Op::Method("then"), [P::Ref, P::Ref] -> R::Ref),
    thunk!("__wbg_then_with_reject" => Op::Method("then"), [P::Ref, P::Ref, P::Ref] -> R::Ref),
    thunk!("__wbg_catch" => Op::Method("catch"), [P::Ref, P::Ref] -> R::Ref),
    thunk!("__wbg_queueMicrotask" => Op::QueueMicrotask, [P::Ref] -> R::Void),
    thunk!("__wbg_queueMicrotask_get" => Op::Get("queueMicrotask"), [P::Ref] -> R::Ref),
];
