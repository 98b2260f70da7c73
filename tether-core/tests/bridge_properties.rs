//! Cross-module behavior of the core bridge state, driven through
//! `MockGuest` without a wasm engine.

use std::sync::Arc;
use tether_core::enums::gpu::{GPU_TEXTURE_FORMAT, GPU_VERTEX_FORMAT};
use tether_core::memory::{ViewKind, decode, encode, take_owned};
use tether_core::prelude::*;
use tether_core::testing::MockGuest;

#[test]
fn handle_round_trip_and_reuse() {
    let mut table = ExternrefTable::new(TableConfig::testing()).expect("table");
    let obj = HostValue::from(HostDict::new());
    let h = table.alloc(obj.clone()).expect("alloc");
    assert_eq!(table.get(h).expect("get"), &obj);

    let first = table.alloc(HostValue::from("a")).expect("alloc");
    let second = table.alloc(HostValue::from("b")).expect("alloc");
    table.free(first).expect("free");
    assert!(matches!(table.get(first), Err(BridgeError::StaleHandle { .. })));

    let reused = table.alloc(HostValue::from("c")).expect("alloc");
    assert_eq!(reused, first);
    assert_eq!(table.get(second).expect("get").as_str(), Some("b"));
    assert_eq!(table.get(reused).expect("get").as_str(), Some("c"));
}

#[test]
fn reserved_slots_survive_growth_and_reinit() {
    let mut table = ExternrefTable::new(TableConfig::testing()).expect("table");
    let handles: Vec<u32> = (0..200)
        .map(|i| table.alloc(HostValue::from(i as u32)).expect("alloc"))
        .collect();
    assert!(table.stats().grows > 0);
    table.init_reserved();

    assert_eq!(table.get(table.undefined_handle()).expect("get"), &HostValue::Undefined);
    assert_eq!(table.get(table.null_handle()).expect("get"), &HostValue::Null);
    assert_eq!(table.get(table.true_handle()).expect("get"), &HostValue::Bool(true));
    assert_eq!(table.get(table.false_handle()).expect("get"), &HostValue::Bool(false));
    assert_eq!(table.free(table.null_handle()).expect("free"), None);

    for (i, h) in handles.iter().enumerate() {
        assert_eq!(table.get(*h).expect("get").as_f64(), Some(i as f64));
    }
}

#[test]
fn strings_round_trip_in_both_paths() {
    for text in ["", "basis", "Ünïcödé", "漢字", "🦀 crab"] {
        for mut guest in [MockGuest::new(), MockGuest::without_realloc()] {
            let s = encode(&mut guest, text).expect("encode");
            assert_eq!(s.len as usize, text.len());
            assert_eq!(decode(&mut guest, s.ptr, s.len).expect("decode"), text);
        }
    }
}

#[test]
fn views_rebuild_after_memory_growth() {
    let mut guest = MockGuest::new();
    let s = encode(&mut guest, "before growth").expect("encode");
    assert_eq!(guest.views().rebuilds(ViewKind::Byte), 1);

    guest.grow(2);
    assert_eq!(decode(&mut guest, s.ptr, s.len).expect("decode"), "before growth");
    assert_eq!(guest.views().rebuilds(ViewKind::Byte), 2);
    let stamp = guest.views().current(ViewKind::Byte).expect("stamp");
    assert_eq!(stamp.len(), guest.memory_size());
}

#[test]
fn owned_strings_are_freed_even_when_malformed() {
    let mut guest = MockGuest::new();
    guest.write_bytes(2048, &[0xc3]);
    assert!(take_owned(&mut guest, 2048, 1).is_err());
    assert_eq!(guest.freed(), &[(2048, 1)]);
}

#[test]
fn closure_survives_until_last_release() {
    let mut guest = MockGuest::new();
    let closure = GuestClosure::new(64, 65, 2, 1, guest.finalizers());
    let callback = HostValue::Function(Arc::clone(&closure));
    let tasks = TaskQueue::new();

    for _ in 0..3 {
        tasks.queue_microtask(callback.clone());
    }
    while let Some(job) = tasks.pop() {
        run_job(job, &mut guest).expect("job");
    }
    assert_eq!(guest.calls_to(1), 3);
    assert!(closure.drop_ref());

    tasks.queue_microtask(callback);
    while let Some(job) = tasks.pop() {
        run_job(job, &mut guest).expect("job");
    }
    assert_eq!(guest.calls_to(1), 3);
    assert_eq!(guest.calls_to(2), 0);
}

#[test]
fn enum_codes_are_symmetric() {
    for code in 0..GPU_TEXTURE_FORMAT.len() as u32 {
        let name = GPU_TEXTURE_FORMAT.to_host(code).expect("code");
        assert_eq!(GPU_TEXTURE_FORMAT.to_guest(name), code);
    }
    assert_eq!(GPU_VERTEX_FORMAT.to_guest("float64x9"), GPU_VERTEX_FORMAT.unknown());
    assert!(GPU_VERTEX_FORMAT.to_host(GPU_VERTEX_FORMAT.unknown()).is_err());
}

#[test]
fn thrown_exception_is_retrievable_exactly_once() {
    let mut table = ExternrefTable::new(TableConfig::testing()).expect("table");
    let mut slot = ExceptionSlot::new();
    let out: Option<u32> = slot
        .guard(&mut table, || {
            Err(HostException::type_error("Failed to execute 'writeBuffer'").into())
        })
        .expect("capture");
    assert!(out.is_none());

    let h = slot.take().expect("pending");
    let err = table.get(h).expect("get");
    assert!(err.instance_of("TypeError"));
    assert!(slot.take().is_none());
}

#[test]
fn promise_continuation_reaches_guest() {
    let mut guest = MockGuest::new();
    let cx = HostCx::default();
    let on_ok = HostValue::Function(GuestClosure::new(7, 8, 9, 5, guest.finalizers()));
    let promise = cx.promise();
    let derived = promise.then(Some(on_ok), None);
    promise.resolve(HostValue::from("device"));

    while let Some(job) = cx.tasks().pop() {
        run_job(job, &mut guest).expect("job");
    }
    let calls = guest.calls_for(5);
    assert_eq!(calls.len(), 1);
    let handle = calls[0].args[2];
    assert_eq!(guest.table().get(handle).expect("get").as_str(), Some("device"));
    assert_eq!(derived.status(), PromiseStatus::Fulfilled);
}
