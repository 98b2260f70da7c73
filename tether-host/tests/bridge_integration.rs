//! Integration tests driving real wasm guests through the bridge.
//!
//! Guests are written in WAT and link against the `wbg` import module the
//! same way generated bindings do: they export `memory`, an allocator pair
//! and a function table holding closure trampolines.

use std::io::Write;
use tether_host::prelude::*;
use tether_host::testing::{MockDevice, MockEnvironment};

/// Wrap guest-specific imports and functions with the runtime exports every
/// guest needs.
fn guest(body: &str) -> Vec<u8> {
    let wat = format!(
        r#"
        (module
            {body}
            (memory (export "memory") 1)
            (global $heap (mut i32) (i32.const 1024))
            (func (export "__wbindgen_malloc") (param $size i32) (param $align i32) (result i32)
                (local $ptr i32)
                global.get $heap
                local.set $ptr
                global.get $heap
                local.get $size
                i32.add
                i32.const 7
                i32.add
                i32.const -8
                i32.and
                global.set $heap
                local.get $ptr)
            (func (export "__wbindgen_free") (param i32 i32 i32)))
        "#
    );
    wat::parse_str(&wat).expect("Failed to parse WAT")
}

fn bridge(env: &MockEnvironment) -> Bridge {
    Bridge::builder()
        .config(BridgeConfig::testing())
        .globals(env.globals())
        .build()
        .expect("Failed to build bridge")
}

fn read_memory(bridge: &mut Bridge, ptr: usize, len: usize) -> Vec<u8> {
    let instance = bridge.instance().expect("bridge not initialised");
    let memory = instance
        .get_memory(bridge.store_mut(), "memory")
        .expect("guest exports memory");
    let mut buf = vec![0u8; len];
    memory.read(bridge.store_mut(), ptr, &mut buf).expect("read in bounds");
    buf
}

const COUNTING_GUEST: &str = r#"
    (import "wbg" "__wbindgen_init_externref_table" (func $init_table))
    (global $starts (mut i32) (i32.const 0))
    (func (export "__wbindgen_start")
        call $init_table
        global.get $starts
        i32.const 1
        i32.add
        global.set $starts)
    (func (export "starts") (result i32)
        global.get $starts)
"#;

#[tokio::test]
async fn init_is_idempotent_and_start_runs_once() {
    let env = MockEnvironment::new();
    let mut bridge = bridge(&env);

    bridge.init(guest(COUNTING_GUEST)).await.unwrap();
    bridge.init(guest(COUNTING_GUEST)).await.unwrap();
    assert!(bridge.is_initialized());

    bridge.start().await.unwrap();
    bridge.start().await.unwrap();
    assert!(bridge.is_started());
    assert_eq!(bridge.call::<(), i32>("starts", ()).unwrap(), 1);
}

#[test]
fn loads_guest_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&guest(COUNTING_GUEST)).unwrap();

    let env = MockEnvironment::new();
    let mut bridge = bridge(&env);
    bridge.init_sync(file.path()).unwrap();
    assert_eq!(bridge.call::<(), i32>("starts", ()).unwrap(), 0);
}

#[test]
fn missing_allocator_is_reported() {
    let wasm = wat::parse_str(r#"(module (memory (export "memory") 1))"#).unwrap();
    let env = MockEnvironment::new();
    let mut bridge = bridge(&env);
    let err = bridge.init_sync(wasm).unwrap_err();
    assert!(
        matches!(&err, BridgeError::MissingExport { name, .. } if name == "__wbindgen_malloc"),
        "unexpected error: {err}"
    );
    assert!(!bridge.is_initialized());
}

#[test]
fn strings_cross_in_both_directions() {
    let wasm = guest(
        r#"
        (import "wbg" "__wbindgen_string_new" (func $string_new (param i32 i32) (result i32)))
        (import "wbg" "__wbindgen_string_get" (func $string_get (param i32 i32)))
        (data (i32.const 16) "hello")
        (func (export "make") (result i32)
            i32.const 16
            i32.const 5
            call $string_new)
        (func (export "read_back") (param $handle i32) (result i32)
            i32.const 64
            local.get $handle
            call $string_get
            i32.const 68
            i32.load)
        (func (export "read_ptr") (result i32)
            i32.const 64
            i32.load)
        "#,
    );
    let env = MockEnvironment::new();
    let mut bridge = bridge(&env);
    bridge.init_sync(wasm).unwrap();

    let handle = bridge.call::<(), u32>("make", ()).unwrap();
    assert_eq!(bridge.value(handle).unwrap().as_str(), Some("hello"));

    let host = bridge.intern(HostValue::from("grüße")).unwrap();
    let len = bridge.call::<u32, u32>("read_back", host).unwrap();
    assert_eq!(len, "grüße".len() as u32);
    let ptr = bridge.call::<(), u32>("read_ptr", ()).unwrap();
    assert_eq!(read_memory(&mut bridge, ptr as usize, len as usize), "grüße".as_bytes());
}

const CANVAS_GUEST: &str = r#"
    (import "wbg" "__wbg_static_accessor_WINDOW" (func $window (result i32)))
    (import "wbg" "__wbg_document" (func $document (param i32) (result i32)))
    (import "wbg" "__wbg_getElementById" (func $by_id (param i32 i32 i32) (result i32)))
    (import "wbg" "__wbg_getContext" (func $get_context (param i32 i32 i32) (result i32)))
    (import "wbg" "__wbg_now" (func $now (param i32) (result f64)))
    (import "wbg" "__wbindgen_exn_take" (func $exn_take (result i32)))
    (import "wbg" "__wbindgen_throw" (func $throw (param i32 i32)))
    (data (i32.const 32) "canvas")
    (data (i32.const 48) "bogus")
    (data (i32.const 64) "webgpu")
    (data (i32.const 80) "boom")
    (func $canvas (result i32)
        call $window
        call $document
        i32.const 32
        i32.const 6
        call $by_id)
    (func (export "bad_context") (result i32)
        call $canvas
        i32.const 48
        i32.const 5
        call $get_context
        drop
        call $exn_take)
    (func (export "good_context") (result i32)
        call $canvas
        i32.const 64
        i32.const 6
        call $get_context)
    (func (export "pending_exception") (result i32)
        call $exn_take)
    (func (export "window_now") (result f64)
        call $window
        call $now)
    (func (export "fail")
        i32.const 80
        i32.const 4
        call $throw)
"#;

#[test]
fn catching_imports_hand_the_exception_to_the_guest() {
    let env = MockEnvironment::new();
    let mut bridge = bridge(&env);
    bridge.init_sync(guest(CANVAS_GUEST)).unwrap();

    let exn = bridge.call::<(), u32>("bad_context", ()).unwrap();
    assert_ne!(exn, 0);
    assert!(bridge.value(exn).unwrap().instance_of("TypeError"));
    assert_eq!(bridge.call::<(), u32>("pending_exception", ()).unwrap(), 0);

    let ctx = bridge.call::<(), u32>("good_context", ()).unwrap();
    assert!(bridge.value(ctx).unwrap().instance_of("GPUCanvasContext"));
    assert_eq!(bridge.call::<(), u32>("pending_exception", ()).unwrap(), 0);
}

#[test]
fn non_catching_imports_trap_on_host_errors() {
    let env = MockEnvironment::new();
    let mut bridge = bridge(&env);
    bridge.init_sync(guest(CANVAS_GUEST)).unwrap();

    let err = bridge.call::<(), f64>("window_now", ()).unwrap_err();
    assert!(
        matches!(
            &err,
            BridgeError::UncaughtHostException { message } if message.contains("__wbg_now")
        ),
        "unexpected error: {err}"
    );
}

#[test]
fn guest_throw_surfaces_the_message() {
    let env = MockEnvironment::new();
    let mut bridge = bridge(&env);
    bridge.init_sync(guest(CANVAS_GUEST)).unwrap();

    let err = bridge.call::<(), ()>("fail", ()).unwrap_err();
    assert!(
        matches!(&err, BridgeError::GuestThrow { message } if message == "boom"),
        "unexpected error: {err}"
    );
}

const GPU_GUEST: &str = r#"
    (import "wbg" "__wbindgen_init_externref_table" (func $init_table))
    (import "wbg" "__wbindgen_closure_new" (func $closure_new (param i32 i32 i32 i32) (result i32)))
    (import "wbg" "__wbg_static_accessor_WINDOW" (func $window (result i32)))
    (import "wbg" "__wbg_navigator" (func $navigator (param i32) (result i32)))
    (import "wbg" "__wbg_gpu" (func $gpu (param i32) (result i32)))
    (import "wbg" "__wbg_new_object" (func $new_object (result i32)))
    (import "wbg" "__wbg_requestAdapter" (func $request_adapter (param i32 i32) (result i32)))
    (import "wbg" "__wbg_requestDevice" (func $request_device (param i32 i32) (result i32)))
    (import "wbg" "__wbg_then" (func $then (param i32 i32) (result i32)))
    (import "wbg" "__wbg_requestAnimationFrame" (func $raf (param i32 i32) (result i32)))
    (import "wbg" "__wbg_features" (func $features (param i32) (result i32)))
    (import "wbg" "__wbg_keys" (func $keys (param i32) (result i32)))
    (import "wbg" "__wbg_next" (func $next (param i32) (result i32)))
    (import "wbg" "__wbg_done" (func $done (param i32) (result i32)))
    (import "wbg" "__wbg_popErrorScope" (func $pop_error_scope (param i32) (result i32)))
    (table (export "__indirect_function_table") 4 funcref)
    (elem (i32.const 0) $on_adapter $dtor $on_device $on_frame)
    (global $adapter (mut i32) (i32.const 0))
    (global $device (mut i32) (i32.const 0))
    (global $frames (mut i32) (i32.const 0))
    (global $dropped (mut i32) (i32.const 0))
    (func $on_adapter (param $a i32) (param $b i32) (param $adapter i32)
        local.get $adapter
        global.set $adapter
        local.get $adapter
        call $new_object
        call $request_device
        i32.const 32
        i32.const 0
        i32.const 1
        i32.const 2
        call $closure_new
        call $then
        drop)
    (func $dtor (param i32 i32)
        global.get $dropped
        i32.const 1
        i32.add
        global.set $dropped)
    (func $on_device (param $a i32) (param $b i32) (param $device i32)
        local.get $device
        global.set $device)
    (func $on_frame (param $a i32) (param $b i32) (param $timestamp i32)
        global.get $frames
        i32.const 1
        i32.add
        global.set $frames)
    (func (export "__wbindgen_start")
        call $init_table
        call $window
        call $navigator
        call $gpu
        call $new_object
        call $request_adapter
        i32.const 16
        i32.const 0
        i32.const 1
        i32.const 0
        call $closure_new
        call $then
        drop
        call $window
        i32.const 48
        i32.const 0
        i32.const 1
        i32.const 3
        call $closure_new
        call $raf
        drop)
    (func (export "adapter") (result i32) global.get $adapter)
    (func (export "device") (result i32) global.get $device)
    (func (export "frames") (result i32) global.get $frames)
    (func (export "count_features") (result i32)
        (local $iter i32)
        (local $count i32)
        global.get $adapter
        call $features
        call $keys
        local.set $iter
        (block $end
            (loop $step
                local.get $iter
                call $next
                call $done
                br_if $end
                local.get $count
                i32.const 1
                i32.add
                local.set $count
                br $step))
        local.get $count)
    (func (export "pop_scope") (result i32)
        global.get $device
        call $pop_error_scope)
"#;

#[tokio::test]
async fn device_request_chain_runs_through_promise_reactions() {
    let env = MockEnvironment::new();
    let mut bridge = bridge(&env);
    bridge.init(guest(GPU_GUEST)).await.unwrap();

    let stats = bridge.start().await.unwrap();
    assert!(stats.jobs >= 2, "expected both reactions to run: {stats:?}");
    assert_eq!(stats.unhandled, 0);

    let adapter = bridge.call::<(), u32>("adapter", ()).unwrap();
    assert!(bridge.value(adapter).unwrap().instance_of("GPUAdapter"));
    let device = bridge.call::<(), u32>("device", ()).unwrap();
    let device = bridge.value(device).unwrap();
    let mock = device.downcast::<MockDevice>().expect("device is the mock");
    assert!(std::ptr::eq(mock, env.device().unwrap().as_ref()));
}

#[tokio::test]
async fn adapter_features_enumerate_through_an_iterator() {
    let env = MockEnvironment::new();
    let mut bridge = bridge(&env);
    bridge.init(guest(GPU_GUEST)).await.unwrap();
    bridge.start().await.unwrap();

    assert_eq!(bridge.call::<(), i32>("count_features", ()).unwrap(), 2);
}

#[tokio::test]
async fn unobserved_rejections_are_counted() {
    let env = MockEnvironment::new();
    let mut bridge = bridge(&env);
    bridge.init(guest(GPU_GUEST)).await.unwrap();
    bridge.start().await.unwrap();

    let popped = bridge.call::<(), u32>("pop_scope", ()).unwrap();
    assert!(bridge.value(popped).unwrap().instance_of("Promise"));

    let stats = bridge.run_until_idle().await.unwrap();
    assert_eq!(stats.unhandled, 1);
    assert_eq!(bridge.run_until_idle().await.unwrap().unhandled, 0);
}

#[tokio::test]
async fn animation_frames_fire_on_tick() {
    let env = MockEnvironment::new();
    let mut bridge = bridge(&env);
    bridge.init(guest(GPU_GUEST)).await.unwrap();
    bridge.start().await.unwrap();
    assert_eq!(bridge.call::<(), i32>("frames", ()).unwrap(), 0);

    bridge.tick_frame(16.0).await.unwrap();
    assert_eq!(bridge.call::<(), i32>("frames", ()).unwrap(), 1);

    bridge.tick_frame(32.0).await.unwrap();
    assert_eq!(bridge.call::<(), i32>("frames", ()).unwrap(), 1);
}

#[test]
fn transcoder_fills_guest_memory() {
    let wasm = guest(
        r#"
        (import "wbg" "__wbg_initializeBasis" (func $initialize))
        (import "wbg" "__wbg_new_uint8array_from_span" (func $bytes (param i32 i32) (result i32)))
        (import "wbg" "__wbg_new_basis_file" (func $open (param i32) (result i32)))
        (import "wbg" "__wbg_startTranscoding" (func $start (param i32) (result i32)))
        (import "wbg" "__wbg_transcodeImage"
            (func $transcode (param i32 i32 i32 i32 i32 i32 i32 i32) (result i32)))
        (data (i32.const 256) "sB\01\01\04\00\04\00")
        (func (export "transcode") (result i32)
            (local $file i32)
            call $initialize
            i32.const 256
            i32.const 8
            call $bytes
            call $open
            local.tee $file
            call $start
            drop
            local.get $file
            i32.const 512
            i32.const 64
            i32.const 0
            i32.const 0
            i32.const 13
            i32.const 0
            i32.const 0
            call $transcode)
        "#,
    );
    let env = MockEnvironment::new();
    let mut bridge = bridge(&env);
    bridge.init_sync(wasm).unwrap();

    assert_eq!(bridge.call::<(), u32>("transcode", ()).unwrap(), 1);
    assert!(env.basis().is_initialized());
    let pixels = read_memory(&mut bridge, 512, 64);
    let expected: Vec<u8> = (0..64u8).collect();
    assert_eq!(pixels, expected);
}

#[test]
fn value_of_unwraps_primitives() {
    let wasm = guest(
        r#"
        (import "wbg" "__wbg_valueOf" (func $value_of (param i32) (result f64)))
        (func (export "value_of") (param $handle i32) (result f64)
            local.get $handle
            call $value_of)
        "#,
    );
    let env = MockEnvironment::new();
    let mut bridge = bridge(&env);
    bridge.init_sync(wasm).unwrap();

    let number = bridge.intern(HostValue::from(2.5)).unwrap();
    assert_eq!(bridge.call::<u32, f64>("value_of", number).unwrap(), 2.5);
    let flag = bridge.intern(HostValue::Bool(true)).unwrap();
    assert_eq!(bridge.call::<u32, f64>("value_of", flag).unwrap(), 1.0);
}

const EXN_STORE_GUEST: &str = r#"
    (import "wbg" "__wbg_static_accessor_WINDOW" (func $window (result i32)))
    (import "wbg" "__wbg_document" (func $document (param i32) (result i32)))
    (import "wbg" "__wbg_getElementById" (func $by_id (param i32 i32 i32) (result i32)))
    (import "wbg" "__wbg_getContext" (func $get_context (param i32 i32 i32) (result i32)))
    (import "wbg" "__wbindgen_exn_take" (func $exn_take (result i32)))
    (data (i32.const 32) "canvas")
    (data (i32.const 48) "bogus")
    (global $stored (mut i32) (i32.const 0))
    (func (export "__wbindgen_exn_store") (param $handle i32)
        local.get $handle
        global.set $stored)
    (func (export "bad_context") (result i32)
        call $window
        call $document
        i32.const 32
        i32.const 6
        call $by_id
        i32.const 48
        i32.const 5
        call $get_context)
    (func (export "stored") (result i32) global.get $stored)
    (func (export "pending_exception") (result i32) call $exn_take)
"#;

#[test]
fn exported_exn_store_receives_the_exception() {
    let env = MockEnvironment::new();
    let mut bridge = bridge(&env);
    bridge.init_sync(guest(EXN_STORE_GUEST)).unwrap();

    assert_eq!(bridge.call::<(), u32>("bad_context", ()).unwrap(), 0);
    let stored = bridge.call::<(), u32>("stored", ()).unwrap();
    assert_ne!(stored, 0);
    assert!(bridge.value(stored).unwrap().instance_of("TypeError"));
    assert_eq!(bridge.call::<(), u32>("pending_exception", ()).unwrap(), 0);
}

/// A guest whose allocator starts near the end of its only page and grows
/// memory on demand.
const GROWING_GUEST: &str = r#"
    (module
        (import "wbg" "__wbindgen_string_get" (func $string_get (param i32 i32)))
        (memory (export "memory") 1)
        (global $heap (mut i32) (i32.const 65528))
        (func (export "__wbindgen_malloc") (param $size i32) (param $align i32) (result i32)
            (local $ptr i32)
            global.get $heap
            local.set $ptr
            (block $fits
                (loop $grow
                    local.get $ptr
                    local.get $size
                    i32.add
                    memory.size
                    i32.const 16
                    i32.shl
                    i32.le_u
                    br_if $fits
                    i32.const 1
                    memory.grow
                    i32.const -1
                    i32.eq
                    if
                        unreachable
                    end
                    br $grow))
            local.get $ptr
            local.get $size
            i32.add
            global.set $heap
            local.get $ptr)
        (func (export "__wbindgen_free") (param i32 i32 i32))
        (func (export "read_back") (param $handle i32) (result i32)
            i32.const 64
            local.get $handle
            call $string_get
            i32.const 68
            i32.load)
        (func (export "read_ptr") (result i32)
            i32.const 64
            i32.load)
        (func (export "pages") (result i32)
            memory.size))
"#;

#[test]
fn allocator_growth_rebuilds_memory_views() {
    let env = MockEnvironment::new();
    let mut bridge = bridge(&env);
    bridge.init_sync(wat::parse_str(GROWING_GUEST).unwrap()).unwrap();

    let short = bridge.intern(HostValue::from("tiny")).unwrap();
    assert_eq!(bridge.call::<u32, u32>("read_back", short).unwrap(), 4);
    assert_eq!(bridge.call::<(), u32>("pages", ()).unwrap(), 1);
    let before = bridge.state().views().rebuilds(ViewKind::Byte);

    let text = "x".repeat(200);
    let long = bridge.intern(HostValue::from(text.as_str())).unwrap();
    assert_eq!(bridge.call::<u32, u32>("read_back", long).unwrap(), 200);
    assert_eq!(bridge.call::<(), u32>("pages", ()).unwrap(), 2);
    assert!(bridge.state().views().rebuilds(ViewKind::Byte) > before);

    let ptr = bridge.call::<(), u32>("read_ptr", ()).unwrap();
    assert!(ptr as usize + 200 > 65536);
    assert_eq!(read_memory(&mut bridge, ptr as usize, 200), text.as_bytes());
}

#[test]
fn number_out_param_past_the_address_limit_fails_cleanly() {
    let wasm = guest(
        r#"
        (import "wbg" "__wbindgen_number_get" (func $number_get (param i32 i32)))
        (func (export "number_at") (param $scratch i32) (param $handle i32)
            local.get $scratch
            local.get $handle
            call $number_get)
        "#,
    );
    let env = MockEnvironment::new();
    let mut bridge = bridge(&env);
    bridge.init_sync(wasm).unwrap();

    let number = bridge.intern(HostValue::from(1.5)).unwrap();
    bridge.call::<(u32, u32), ()>("number_at", (128, number)).unwrap();
    assert_eq!(read_memory(&mut bridge, 128, 1), [1]);
    assert!(bridge.call::<(u32, u32), ()>("number_at", (u32::MAX - 3, number)).is_err());
}
