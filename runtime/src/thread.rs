//! Thread spawn/join (spec §5 "threads spawned from a call expression,
//! synchronised with a `!` operator").
//!
//! Grounded on `runtime/src/scheduler.rs`'s strand lifecycle bookkeeping,
//! but rebuilt on `std::thread` rather than `may`'s green threads: the
//! source language's sync discipline (a `pending` handle must be synced
//! before its scope closes, enforced entirely at type-check time per
//! DESIGN.md) gives every spawned unit of work a real OS thread's worth of
//! independence, and nothing in the spec requires cooperative scheduling
//! or channels between strands — dropping `may` removes a dependency the
//! transformed language no longer needs.

use crate::arena::RtArena;
use std::ffi::c_void;
use std::thread::JoinHandle;

pub struct RtThreadHandle {
    join: Option<JoinHandle<*mut c_void>>,
    immediate: Option<*mut c_void>,
}

unsafe impl Send for RtThreadHandle {}

struct SendPtr(*mut c_void);
unsafe impl Send for SendPtr {}

/// # Safety
/// `func` must be a valid `extern "C" fn(*mut c_void) -> *mut c_void` and
/// `argbuf` must stay live for the spawned thread's lifetime (the compiler
/// arena-allocates the captured-args struct `argbuf` points at, and the
/// spawning scope cannot close — hence cannot free that arena — before the
/// corresponding sync, per the type checker's pending-at-scope-close rule).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_thread_spawn(
    _arena: *mut RtArena,
    func: extern "C" fn(*mut c_void) -> *mut c_void,
    argbuf: *mut c_void,
) -> *mut RtThreadHandle {
    let arg = SendPtr(argbuf);
    let join = std::thread::spawn(move || {
        let arg = arg;
        func(arg.0)
    });
    Box::into_raw(Box::new(RtThreadHandle { join: Some(join), immediate: None }))
}

/// Wraps an already-computed result as a completed handle, for spawn sites
/// the compiler cannot lower to a captured-args wrapper (e.g. spawning a
/// closure value directly instead of a named function call).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_thread_spawn_sync(_arena: *mut RtArena, result: *mut c_void) -> *mut RtThreadHandle {
    Box::into_raw(Box::new(RtThreadHandle { join: None, immediate: Some(result) }))
}

/// # Safety
/// `handle` must be a live `RtThreadHandle*` from `rt_thread_spawn` or
/// `rt_thread_spawn_sync`, not previously joined.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_thread_join(handle: *mut RtThreadHandle) -> *mut c_void {
    let handle = unsafe { Box::from_raw(handle) };
    match handle.join {
        Some(join) => join.join().unwrap_or_else(|_| panic!("rt_thread_join: spawned thread panicked")),
        None => handle.immediate.unwrap_or(std::ptr::null_mut()),
    }
}

/// # Safety
/// `handles` must point at `count` live `RtThreadHandle*` values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_thread_join_all(
    arena: *mut RtArena,
    count: usize,
    handles: *mut *mut RtThreadHandle,
) -> *mut crate::array::SnArray {
    let slice = unsafe { std::slice::from_raw_parts(handles, count) };
    let results: Vec<u64> = slice.iter().map(|&h| unsafe { rt_thread_join(h) } as u64).collect();
    unsafe { crate::array::rt_array_create_from_slots(arena, &results) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    extern "C" fn doubles(arg: *mut c_void) -> *mut c_void {
        let n = arg as i64;
        (n * 2) as *mut c_void
    }

    #[test]
    fn spawn_and_join_runs_on_another_thread() {
        unsafe {
            let handle = rt_thread_spawn(ptr::null_mut(), doubles, 21 as *mut c_void);
            let result = rt_thread_join(handle) as i64;
            assert_eq!(result, 42);
        }
    }

    #[test]
    fn spawn_sync_roundtrips_precomputed_value() {
        unsafe {
            let handle = rt_thread_spawn_sync(ptr::null_mut(), 7 as *mut c_void);
            assert_eq!(rt_thread_join(handle) as i64, 7);
        }
    }

    #[test]
    fn join_all_collects_every_handle_in_order() {
        unsafe {
            let h1 = rt_thread_spawn(ptr::null_mut(), doubles, 1 as *mut c_void);
            let h2 = rt_thread_spawn(ptr::null_mut(), doubles, 2 as *mut c_void);
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            let mut handles = [h1, h2];
            let array = rt_thread_join_all(arena, 2, handles.as_mut_ptr());
            assert_eq!(crate::array::rt_array_length(array as *const c_void), 2);
            crate::arena::rt_arena_destroy(arena);
        }
    }
}
