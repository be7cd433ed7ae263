//! Value-to-string conversions backing string interpolation
//! (`codegen::emit_interpolated` picks one of these per interpolated
//! expression's static type).
//!
//! Grounded on `runtime/src/io.rs`'s `int_to_string`, widened to every
//! primitive the type checker can hand an interpolation hole and rebuilt
//! against `SnString`/`RtArena` instead of the teacher's boxed-`Value`
//! stack.

use crate::arena::{arena_ref, RtArena};
use crate::strings::SnString;
use std::ffi::c_void;

/// # Safety
/// `arena` must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_int_to_string(arena: *mut RtArena, v: i32) -> *mut SnString {
    let arena = unsafe { arena_ref(arena) };
    SnString::alloc_in(arena, &v.to_string())
}

/// # Safety
/// `arena` must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_long_to_string(arena: *mut RtArena, v: i64) -> *mut SnString {
    let arena = unsafe { arena_ref(arena) };
    SnString::alloc_in(arena, &v.to_string())
}

/// # Safety
/// `arena` must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_double_to_string(arena: *mut RtArena, v: f64) -> *mut SnString {
    let arena = unsafe { arena_ref(arena) };
    let rendered = if v.fract() == 0.0 && v.is_finite() { format!("{v:.1}") } else { v.to_string() };
    SnString::alloc_in(arena, &rendered)
}

/// # Safety
/// `arena` must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_bool_to_string(arena: *mut RtArena, v: bool) -> *mut SnString {
    let arena = unsafe { arena_ref(arena) };
    SnString::alloc_in(arena, if v { "true" } else { "false" })
}

/// # Safety
/// `arena` must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_byte_to_string(arena: *mut RtArena, v: u8) -> *mut SnString {
    let arena = unsafe { arena_ref(arena) };
    SnString::alloc_in(arena, &v.to_string())
}

/// # Safety
/// `s` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_parse_int(s: *const SnString) -> i32 {
    let text = unsafe { crate::strings::sn_str(s) };
    text.trim().parse().unwrap_or_else(|e| panic!("rt_parse_int: cannot parse '{text}': {e}"))
}

/// # Safety
/// `s` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_parse_long(s: *const SnString) -> i64 {
    let text = unsafe { crate::strings::sn_str(s) };
    text.trim().parse().unwrap_or_else(|e| panic!("rt_parse_long: cannot parse '{text}': {e}"))
}

/// # Safety
/// `s` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_parse_double(s: *const SnString) -> f64 {
    let text = unsafe { crate::strings::sn_str(s) };
    text.trim().parse().unwrap_or_else(|e| panic!("rt_parse_double: cannot parse '{text}': {e}"))
}

/// Fallback for `Any`/`Nil`/opaque-typed interpolation holes, which the
/// generated C has no type tag for at the call site. Renders a pointer
/// identity, the best a type-erased `void*` can offer.
///
/// # Safety
/// `arena` must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_to_string_any(arena: *mut RtArena, v: *const c_void) -> *mut SnString {
    let arena = unsafe { arena_ref(arena) };
    if v.is_null() {
        return SnString::alloc_in(arena, "nil");
    }
    SnString::alloc_in(arena, &format!("<object {v:p}>"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strings::sn_str;
    use std::ptr;

    #[test]
    fn numeric_conversions_render_expected_text() {
        unsafe {
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            assert_eq!(sn_str(rt_int_to_string(arena, -7)), "-7");
            assert_eq!(sn_str(rt_long_to_string(arena, 9_000_000_000)), "9000000000");
            assert_eq!(sn_str(rt_double_to_string(arena, 3.0)), "3.0");
            assert_eq!(sn_str(rt_double_to_string(arena, 3.5)), "3.5");
            assert_eq!(sn_str(rt_bool_to_string(arena, true)), "true");
            crate::arena::rt_arena_destroy(arena);
        }
    }

    #[test]
    fn parse_functions_round_trip_rendered_values() {
        unsafe {
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            let c = std::ffi::CString::new("42").unwrap();
            let s = crate::strings::rt_string_literal(arena, c.as_ptr());
            assert_eq!(rt_parse_int(s), 42);
            assert_eq!(rt_parse_long(s), 42);
            assert_eq!(rt_parse_double(s), 42.0);
            crate::arena::rt_arena_destroy(arena);
        }
    }

    #[test]
    fn any_fallback_reports_nil_for_null() {
        unsafe {
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            assert_eq!(sn_str(rt_to_string_any(arena, ptr::null())), "nil");
            crate::arena::rt_arena_destroy(arena);
        }
    }
}
