//! Byte-array/base64/hex conversions (spec §4.7 "byte-array/base64/hex
//! conversions").
//!
//! No teacher counterpart; grounded on the `base64`/`hex` crates already in
//! the workspace dependency table (added for this purpose, per DESIGN.md).

use crate::arena::{arena_ref, RtArena};
use crate::array::SnArray;
use crate::strings::SnString;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::ffi::c_void;

unsafe fn array_bytes(array: *const c_void) -> Vec<u8> {
    let array = array as *const SnArray;
    if array.is_null() {
        return Vec::new();
    }
    unsafe { std::slice::from_raw_parts((*array).items, (*array).len) }.iter().map(|&s| s as u8).collect()
}

/// # Safety
/// `arena` must be live; `s` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_bytes_from_string(arena: *mut RtArena, s: *const SnString) -> *mut SnArray {
    let bytes = unsafe { crate::strings::sn_str(s) }.as_bytes();
    let slots: Vec<u64> = bytes.iter().map(|&b| b as u64).collect();
    unsafe { crate::array::rt_array_create_from_slots(arena, &slots) }
}

/// # Safety
/// `arena` must be live; `bytes` must be null or a live `SnArray<byte>*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_bytes_to_string(arena: *mut RtArena, bytes: *const c_void) -> *mut SnString {
    let arena = unsafe { arena_ref(arena) };
    let raw = unsafe { array_bytes(bytes) };
    let text = String::from_utf8_lossy(&raw);
    SnString::alloc_in(arena, &text)
}

/// # Safety
/// `arena` must be live; `bytes` must be null or a live `SnArray<byte>*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_bytes_to_base64(arena: *mut RtArena, bytes: *const c_void) -> *mut SnString {
    let arena = unsafe { arena_ref(arena) };
    let encoded = BASE64.encode(unsafe { array_bytes(bytes) });
    SnString::alloc_in(arena, &encoded)
}

/// # Safety
/// `arena` must be live; `s` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_bytes_from_base64(arena: *mut RtArena, s: *const SnString) -> *mut SnArray {
    let text = unsafe { crate::strings::sn_str(s) };
    let decoded = BASE64.decode(text).unwrap_or_else(|e| panic!("rt_bytes_from_base64: invalid base64: {e}"));
    let slots: Vec<u64> = decoded.iter().map(|&b| b as u64).collect();
    unsafe { crate::array::rt_array_create_from_slots(arena, &slots) }
}

/// # Safety
/// `arena` must be live; `bytes` must be null or a live `SnArray<byte>*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_bytes_to_hex(arena: *mut RtArena, bytes: *const c_void) -> *mut SnString {
    let arena = unsafe { arena_ref(arena) };
    let encoded = hex::encode(unsafe { array_bytes(bytes) });
    SnString::alloc_in(arena, &encoded)
}

/// # Safety
/// `arena` must be live; `s` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_bytes_from_hex(arena: *mut RtArena, s: *const SnString) -> *mut SnArray {
    let text = unsafe { crate::strings::sn_str(s) };
    let decoded = hex::decode(text).unwrap_or_else(|e| panic!("rt_bytes_from_hex: invalid hex: {e}"));
    let slots: Vec<u64> = decoded.iter().map(|&b| b as u64).collect();
    unsafe { crate::array::rt_array_create_from_slots(arena, &slots) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strings::sn_str;
    use std::ptr;

    fn lit(arena: *mut RtArena, s: &str) -> *mut SnString {
        let c = std::ffi::CString::new(s).unwrap();
        unsafe { crate::strings::rt_string_literal(arena, c.as_ptr()) }
    }

    #[test]
    fn base64_roundtrips_through_an_array() {
        unsafe {
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            let bytes = crate::array::rt_array_create(arena, 3, [1u8 as *mut c_void, 2 as *mut c_void, 3 as *mut c_void].as_ptr());
            let encoded = rt_bytes_to_base64(arena, bytes as *const c_void);
            let decoded = rt_bytes_from_base64(arena, encoded);
            assert_eq!(crate::array::rt_array_length(decoded as *const c_void), 3);
            crate::arena::rt_arena_destroy(arena);
        }
    }

    #[test]
    fn hex_roundtrips_a_literal_string() {
        unsafe {
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            let s = lit(arena, "hi");
            let encoded = rt_bytes_to_hex(arena, {
                let bytes: Vec<*mut c_void> = "hi".bytes().map(|b| b as *mut c_void).collect();
                crate::array::rt_array_create(arena, bytes.len(), bytes.as_ptr()) as *const c_void
            });
            assert_eq!(sn_str(encoded), "6869");
            let _ = s;
            crate::arena::rt_arena_destroy(arena);
        }
    }

    #[test]
    fn from_string_and_back_roundtrips() {
        unsafe {
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            let s = lit(arena, "hello");
            let bytes = rt_bytes_from_string(arena, s);
            let back = rt_bytes_to_string(arena, bytes as *const c_void);
            assert_eq!(sn_str(back), "hello");
            crate::arena::rt_arena_destroy(arena);
        }
    }
}
