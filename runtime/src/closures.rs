//! `__Closure__` (spec §4.6 closures) - a function pointer paired with the
//! `RtArena` it was created under.
//!
//! `codegen::emit_lambda` hoists each lambda to a static top-level C
//! function and wraps it with `rt_closure_make`; `codegen::emit_call` casts
//! `func` back to the statically-known parameter/return signature at every
//! call site, so there is no generic "call with unknown arity" entry point
//! here (the teacher's `create_env`/`env_get`/`env_set`/`make_closure`
//! quartet operated over a boxed `[Value]` environment for an interpreted
//! quotation; `sn` lambdas compile straight to C functions, so capture is
//! handled by the caller-supplied arena rather than a copied environment).

use crate::arena::RtArena;
use std::ffi::c_void;

#[repr(C)]
pub struct __Closure__ {
    pub func: *mut c_void,
    pub arena: *mut RtArena,
}

/// # Safety
/// `func` must be a pointer to a C function compatible with the call sites
/// the compiler generates for this closure's static type; `arena` must be
/// live for as long as the returned closure is reachable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_closure_make(func: *mut c_void, arena: *mut RtArena) -> *mut __Closure__ {
    let arena_ref = unsafe { crate::arena::arena_ref(arena) };
    let slot = arena_ref.alloc_bytes(std::mem::size_of::<__Closure__>()) as *mut __Closure__;
    unsafe { slot.write(__Closure__ { func, arena }) };
    slot
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    extern "C" fn answer(_arena: *mut RtArena) -> i32 {
        42
    }

    #[test]
    fn closure_roundtrips_function_pointer() {
        unsafe {
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            let closure = rt_closure_make(answer as *mut c_void, arena);
            let f: extern "C" fn(*mut RtArena) -> i32 = std::mem::transmute((*closure).func);
            assert_eq!(f(arena), 42);
            crate::arena::rt_arena_destroy(arena);
        }
    }
}
