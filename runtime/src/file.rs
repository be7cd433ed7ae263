//! File I/O (spec §4.7 "file I/O (text and binary with static and instance
//! methods)").
//!
//! Grounded on `runtime/src/file.rs`'s `file-slurp`/`file-exists?` pair,
//! widened to the full text/binary surface and re-pointed at `SnString`/
//! `RtArena` instead of the teacher's stack-value `Value::String`.

use crate::arena::{arena_ref, RtArena};
use crate::array::SnArray;
use crate::strings::{sn_str, SnString};
use std::ffi::c_void;
use std::fs;
use std::path::Path;

/// # Safety
/// `arena` must be live; `path` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_file_readText(arena: *mut RtArena, path: *const SnString) -> *mut SnString {
    let arena = unsafe { arena_ref(arena) };
    let p = unsafe { sn_str(path) };
    let contents = fs::read_to_string(p).unwrap_or_else(|e| panic!("rt_file_readText: cannot read '{p}': {e}"));
    SnString::alloc_in(arena, &contents)
}

/// # Safety
/// `arena` must be live; `path`, `contents` must be null or live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_file_writeText(arena: *mut RtArena, path: *const SnString, contents: *const SnString) {
    let _ = arena;
    let p = unsafe { sn_str(path) };
    let c = unsafe { sn_str(contents) };
    fs::write(p, c).unwrap_or_else(|e| panic!("rt_file_writeText: cannot write '{p}': {e}"));
}

/// # Safety
/// `arena` must be live; `path`, `contents` must be null or live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_file_appendText(arena: *mut RtArena, path: *const SnString, contents: *const SnString) {
    use std::io::Write;
    let _ = arena;
    let p = unsafe { sn_str(path) };
    let c = unsafe { sn_str(contents) };
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(p)
        .unwrap_or_else(|e| panic!("rt_file_appendText: cannot open '{p}': {e}"));
    f.write_all(c.as_bytes()).unwrap_or_else(|e| panic!("rt_file_appendText: cannot write '{p}': {e}"));
}

/// # Safety
/// `arena` must be live; `path` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_file_readBytes(arena: *mut RtArena, path: *const SnString) -> *mut SnArray {
    let p = unsafe { sn_str(path) };
    let bytes = fs::read(p).unwrap_or_else(|e| panic!("rt_file_readBytes: cannot read '{p}': {e}"));
    let slots: Vec<u64> = bytes.iter().map(|&b| b as u64).collect();
    unsafe { crate::array::rt_array_create_from_slots(arena, &slots) }
}

/// # Safety
/// `path` must be null or a live `SnString*`; `data` must be null or a live `SnArray*` of bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_file_writeBytes(path: *const SnString, data: *const c_void) {
    let p = unsafe { sn_str(path) };
    let data = data as *const SnArray;
    let bytes: Vec<u8> = if data.is_null() {
        Vec::new()
    } else {
        unsafe { std::slice::from_raw_parts((*data).items, (*data).len) }.iter().map(|&s| s as u8).collect()
    };
    fs::write(p, &bytes).unwrap_or_else(|e| panic!("rt_file_writeBytes: cannot write '{p}': {e}"));
}

/// # Safety
/// `path` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_file_exists(path: *const SnString) -> bool {
    Path::new(unsafe { sn_str(path) }).exists()
}

/// # Safety
/// `path` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_file_remove(path: *const SnString) {
    let p = unsafe { sn_str(path) };
    let _ = fs::remove_file(p);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::ptr;
    use tempfile::NamedTempFile;

    fn lit(arena: *mut RtArena, s: &str) -> *mut SnString {
        let c = std::ffi::CString::new(s).unwrap();
        unsafe { crate::strings::rt_string_literal(arena, c.as_ptr()) }
    }

    #[test]
    fn read_text_roundtrips_utf8() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "Hello, 世界!").unwrap();
        unsafe {
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            let path = lit(arena, f.path().to_str().unwrap());
            let contents = rt_file_readText(arena, path);
            assert_eq!(sn_str(contents), "Hello, 世界!");
            crate::arena::rt_arena_destroy(arena);
        }
    }

    #[test]
    fn exists_reflects_filesystem() {
        unsafe {
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            let missing = lit(arena, "/nonexistent/path/to/file.txt");
            assert!(!rt_file_exists(missing));
            crate::arena::rt_arena_destroy(arena);
        }
    }

    #[test]
    fn write_then_read_text() {
        let f = NamedTempFile::new().unwrap();
        unsafe {
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            let path = lit(arena, f.path().to_str().unwrap());
            let contents = lit(arena, "written by rt_file_writeText");
            rt_file_writeText(arena, path, contents);
            let back = rt_file_readText(arena, path);
            assert_eq!(sn_str(back), "written by rt_file_writeText");
            crate::arena::rt_arena_destroy(arena);
        }
    }
}
