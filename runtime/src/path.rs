//! Path and directory utilities (spec §4.7 "path and directory utilities").
//!
//! No direct teacher counterpart (the concatenative language had no
//! filesystem-path vocabulary beyond `file.rs`'s slurp/exists pair);
//! grounded on the same `std::path`/`std::fs` idiom `file.rs` already uses,
//! widened to the operations a static source-to-C compiler's runtime needs
//! for project-relative includes and build artefacts.

use crate::arena::{arena_ref, RtArena};
use crate::strings::{sn_str, SnString};
use std::fs;
use std::path::Path;

/// # Safety
/// `arena` must be live; `a`/`b` must be null or live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_path_join(arena: *mut RtArena, a: *const SnString, b: *const SnString) -> *mut SnString {
    let arena = unsafe { arena_ref(arena) };
    let joined = Path::new(unsafe { sn_str(a) }).join(unsafe { sn_str(b) });
    SnString::alloc_in(arena, &joined.to_string_lossy())
}

/// # Safety
/// `arena` must be live; `path` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_path_dirname(arena: *mut RtArena, path: *const SnString) -> *mut SnString {
    let arena = unsafe { arena_ref(arena) };
    let parent = Path::new(unsafe { sn_str(path) }).parent().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default();
    SnString::alloc_in(arena, &parent)
}

/// # Safety
/// `arena` must be live; `path` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_path_basename(arena: *mut RtArena, path: *const SnString) -> *mut SnString {
    let arena = unsafe { arena_ref(arena) };
    let name = Path::new(unsafe { sn_str(path) }).file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    SnString::alloc_in(arena, &name)
}

/// # Safety
/// `arena` must be live; `path` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_path_extension(arena: *mut RtArena, path: *const SnString) -> *mut SnString {
    let arena = unsafe { arena_ref(arena) };
    let ext = Path::new(unsafe { sn_str(path) }).extension().map(|e| e.to_string_lossy().into_owned()).unwrap_or_default();
    SnString::alloc_in(arena, &ext)
}

/// # Safety
/// `path` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_path_is_dir(path: *const SnString) -> bool {
    Path::new(unsafe { sn_str(path) }).is_dir()
}

/// # Safety
/// `path` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_path_mkdir(path: *const SnString) {
    let p = unsafe { sn_str(path) };
    fs::create_dir_all(p).unwrap_or_else(|e| panic!("rt_path_mkdir: cannot create '{p}': {e}"));
}

/// # Safety
/// `arena` must be live; `path` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_path_list_dir(arena: *mut RtArena, path: *const SnString) -> *mut crate::array::SnArray {
    let arena_struct = unsafe { arena_ref(arena) };
    let p = unsafe { sn_str(path) };
    let entries: Vec<u64> = fs::read_dir(p)
        .unwrap_or_else(|e| panic!("rt_path_list_dir: cannot read '{p}': {e}"))
        .filter_map(Result::ok)
        .map(|entry| SnString::alloc_in(arena_struct, &entry.file_name().to_string_lossy()) as u64)
        .collect();
    unsafe { crate::array::rt_array_create_from_slots(arena, &entries) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    fn lit(arena: *mut RtArena, s: &str) -> *mut SnString {
        let c = std::ffi::CString::new(s).unwrap();
        unsafe { crate::strings::rt_string_literal(arena, c.as_ptr()) }
    }

    #[test]
    fn join_and_filename_roundtrip() {
        unsafe {
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            let a = lit(arena, "/tmp/project");
            let b = lit(arena, "main.sn");
            let joined = rt_path_join(arena, a, b);
            assert_eq!(sn_str(joined), "/tmp/project/main.sn");
            assert_eq!(sn_str(rt_path_basename(arena, joined)), "main.sn");
            assert_eq!(sn_str(rt_path_extension(arena, joined)), "sn");
            crate::arena::rt_arena_destroy(arena);
        }
    }

    #[test]
    fn parent_of_root_relative_path_is_directory() {
        unsafe {
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            let p = lit(arena, "/tmp/project/main.sn");
            assert_eq!(sn_str(rt_path_dirname(arena, p)), "/tmp/project");
            crate::arena::rt_arena_destroy(arena);
        }
    }
}
