//! SnString - arena-backed, length-prefixed UTF-8 string (spec §4.7 string
//! operations: concat/length/substring/indexOf/split/trim/upper/lower/
//! startsWith/endsWith/contains/replace/charAt).
//!
//! Grounded on `runtime/src/cemstring.rs`'s ownership discipline (a string
//! is either arena-backed or independently owned) but simplified: every
//! `SnString` here is always carved out of an `RtArena` (the spec's compile
//! target has no cross-thread channel primitive requiring a global-owned
//! variant — `thread_spawn`/`thread_sync` capture the spawning arena
//! directly, per spec §5), so there is exactly one allocation discipline
//! instead of two.

use crate::arena::{arena_ref, RtArena};
use std::ffi::{c_char, CStr};

#[repr(C)]
pub struct SnString {
    pub len: usize,
    pub bytes: *const u8,
}

impl SnString {
    pub(crate) fn alloc_in(arena: &RtArena, s: &str) -> *mut SnString {
        let bytes = arena.alloc_bytes(s.len());
        if !s.is_empty() {
            unsafe { std::ptr::copy_nonoverlapping(s.as_ptr(), bytes, s.len()) };
        }
        let header = arena.alloc_bytes(std::mem::size_of::<SnString>()) as *mut SnString;
        unsafe { header.write(SnString { len: s.len(), bytes }) };
        header
    }
}

/// # Safety
/// `s` must be null or point at a live `SnString` whose `bytes`/`len` form
/// valid UTF-8 (guaranteed by every constructor in this module).
pub unsafe fn sn_str<'a>(s: *const SnString) -> &'a str {
    if s.is_null() {
        return "";
    }
    unsafe {
        let s = &*s;
        std::str::from_utf8_unchecked(std::slice::from_raw_parts(s.bytes, s.len))
    }
}

/// # Safety
/// Both arguments must be null or live `SnString*`.
pub unsafe fn sn_string_eq(a: *const SnString, b: *const SnString) -> bool {
    unsafe { sn_str(a) == sn_str(b) }
}

/// # Safety
/// `arena` must be live; `bytes` must be a valid NUL-terminated, UTF-8 C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_string_literal(arena: *mut RtArena, bytes: *const c_char) -> *mut SnString {
    let arena = unsafe { arena_ref(arena) };
    let s = unsafe { CStr::from_ptr(bytes) }.to_string_lossy();
    SnString::alloc_in(arena, &s)
}

/// # Safety
/// `arena` must be live; `a`/`b` must be null or live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_string_concat(arena: *mut RtArena, a: *const SnString, b: *const SnString) -> *mut SnString {
    let arena = unsafe { arena_ref(arena) };
    let mut joined = String::with_capacity(unsafe { sn_str(a) }.len() + unsafe { sn_str(b) }.len());
    joined.push_str(unsafe { sn_str(a) });
    joined.push_str(unsafe { sn_str(b) });
    SnString::alloc_in(arena, &joined)
}

/// # Safety
/// `s` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_string_length(s: *const SnString) -> i64 {
    unsafe { sn_str(s) }.chars().count() as i64
}

/// # Safety
/// `arena` must be live; `s` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_string_substring(arena: *mut RtArena, s: *const SnString, start: i64, end: i64) -> *mut SnString {
    let arena = unsafe { arena_ref(arena) };
    let chars: Vec<char> = unsafe { sn_str(s) }.chars().collect();
    let len = chars.len() as i64;
    let start = start.clamp(0, len) as usize;
    let end = end.clamp(0, len) as usize;
    let sub: String = if start >= end { String::new() } else { chars[start..end].iter().collect() };
    SnString::alloc_in(arena, &sub)
}

/// # Safety
/// `s`/`needle` must be null or live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_string_indexOf(s: *const SnString, needle: *const SnString) -> i64 {
    let haystack = unsafe { sn_str(s) };
    let needle = unsafe { sn_str(needle) };
    match haystack.find(needle) {
        Some(byte_idx) => haystack[..byte_idx].chars().count() as i64,
        None => -1,
    }
}

/// # Safety
/// `s`/`needle` must be null or live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_string_contains(s: *const SnString, needle: *const SnString) -> bool {
    unsafe { sn_str(s) }.contains(unsafe { sn_str(needle) })
}

/// # Safety
/// `s`/`prefix` must be null or live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_string_startsWith(s: *const SnString, prefix: *const SnString) -> bool {
    unsafe { sn_str(s) }.starts_with(unsafe { sn_str(prefix) })
}

/// # Safety
/// `s`/`suffix` must be null or live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_string_endsWith(s: *const SnString, suffix: *const SnString) -> bool {
    unsafe { sn_str(s) }.ends_with(unsafe { sn_str(suffix) })
}

/// # Safety
/// `arena` must be live; `s`, `from`, `to` must be null or live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_string_replace(
    arena: *mut RtArena,
    s: *const SnString,
    from: *const SnString,
    to: *const SnString,
) -> *mut SnString {
    let arena = unsafe { arena_ref(arena) };
    let replaced = unsafe { sn_str(s) }.replace(unsafe { sn_str(from) }, unsafe { sn_str(to) });
    SnString::alloc_in(arena, &replaced)
}

/// # Safety
/// `arena` must be live; `s` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_string_trim(arena: *mut RtArena, s: *const SnString) -> *mut SnString {
    let arena = unsafe { arena_ref(arena) };
    SnString::alloc_in(arena, unsafe { sn_str(s) }.trim())
}

/// # Safety
/// `arena` must be live; `s` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_string_upper(arena: *mut RtArena, s: *const SnString) -> *mut SnString {
    let arena = unsafe { arena_ref(arena) };
    SnString::alloc_in(arena, &unsafe { sn_str(s) }.to_uppercase())
}

/// # Safety
/// `arena` must be live; `s` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_string_lower(arena: *mut RtArena, s: *const SnString) -> *mut SnString {
    let arena = unsafe { arena_ref(arena) };
    SnString::alloc_in(arena, &unsafe { sn_str(s) }.to_lowercase())
}

/// # Safety
/// `s` must be null or a live `SnString*`; `index` must be in bounds.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_string_charAt(s: *const SnString, index: i64) -> c_char {
    unsafe { sn_str(s) }.chars().nth(index.max(0) as usize).map(|c| c as c_char).unwrap_or(0)
}

/// # Safety
/// `s` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_string_is_empty(s: *const SnString) -> bool {
    unsafe { sn_str(s) }.is_empty()
}

/// `split` returns an `SnArray_string` (spec §4.7); implemented here rather
/// than in `array.rs` since it needs both string slicing and array
/// construction, and string semantics (splitting on an arbitrary UTF-8
/// delimiter) own the logic.
///
/// # Safety
/// `arena` must be live; `s`/`delim` must be null or live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_string_split(arena: *mut RtArena, s: *const SnString, delim: *const SnString) -> *mut crate::array::SnArray {
    let arena_struct = unsafe { arena_ref(arena) };
    let haystack = unsafe { sn_str(s) };
    let delim = unsafe { sn_str(delim) };
    let parts: Vec<u64> = if delim.is_empty() {
        haystack.chars().map(|c| SnString::alloc_in(arena_struct, &c.to_string()) as u64).collect()
    } else {
        haystack.split(delim).map(|p| SnString::alloc_in(arena_struct, p) as u64).collect()
    };
    unsafe { crate::array::rt_array_create_from_slots(arena, &parts) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    fn lit(arena: *mut RtArena, s: &str) -> *mut SnString {
        let c = std::ffi::CString::new(s).unwrap();
        unsafe { rt_string_literal(arena, c.as_ptr()) }
    }

    #[test]
    fn concat_joins_both_strings() {
        unsafe {
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            let a = lit(arena, "hello ");
            let b = lit(arena, "world");
            let c = rt_string_concat(arena, a, b);
            assert_eq!(sn_str(c), "hello world");
            crate::arena::rt_arena_destroy(arena);
        }
    }

    #[test]
    fn indexOf_and_contains_agree() {
        unsafe {
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            let s = lit(arena, "hello world");
            let needle = lit(arena, "world");
            assert_eq!(rt_string_indexOf(s, needle), 6);
            assert!(rt_string_contains(s, needle));
            crate::arena::rt_arena_destroy(arena);
        }
    }

    #[test]
    fn split_produces_expected_parts() {
        unsafe {
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            let s = lit(arena, "a,b,c");
            let delim = lit(arena, ",");
            let parts = rt_string_split(arena, s, delim);
            assert_eq!(crate::array::rt_array_length(parts as *const std::ffi::c_void), 3);
            crate::arena::rt_arena_destroy(arena);
        }
    }

    #[test]
    fn trim_upper_lower_roundtrip() {
        unsafe {
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            let s = lit(arena, "  Hi  ");
            assert_eq!(sn_str(rt_string_trim(arena, s)), "Hi");
            assert_eq!(sn_str(rt_string_upper(arena, s)), "  HI  ");
            assert_eq!(sn_str(rt_string_lower(arena, s)), "  hi  ");
            crate::arena::rt_arena_destroy(arena);
        }
    }
}
