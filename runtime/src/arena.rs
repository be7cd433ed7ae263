//! RtArena - explicit create/destroy bump allocator for generated-program memory
//!
//! Every value a compiled Sn program allocates at runtime (strings, arrays,
//! closures, string builders) is carved out of an `RtArena`. Arenas form a
//! parent chain mirroring the code generator's lexical arena-plumbing table
//! (spec §4.6): a function's own arena is created from its caller's and
//! destroyed on every return path; a `shared` function or block reuses the
//! caller's arena directly and never destroys it.
//!
//! Unlike the compile-time `Arena` (`compiler/src/arena.rs`), which lives for
//! the whole compilation and is dropped once at exit, `RtArena` instances are
//! created and destroyed continuously over the lifetime of the generated
//! program, paired 1:1 with the generated `rt_arena_create`/`rt_arena_destroy`
//! call sites.

use bumpalo::Bump;
use std::ffi::{c_char, c_void, CStr};
use std::ptr;

/// An arena handle returned to generated C code as an opaque pointer.
///
/// `parent` is retained only so nested arenas can be introspected for
/// debugging; destruction is always explicit and never cascades to the
/// parent (the parent outlives everything allocated from it by construction
/// of the arena-plumbing discipline, so it is destroyed separately by its
/// own owner).
pub struct RtArena {
    bump: Bump,
    parent: *mut RtArena,
}

impl RtArena {
    fn new(parent: *mut RtArena) -> Box<RtArena> {
        Box::new(RtArena { bump: Bump::new(), parent })
    }

    /// Bump-allocate `nbytes` with 8-byte alignment (spec §4.1).
    pub fn alloc_bytes(&self, nbytes: usize) -> *mut u8 {
        if nbytes == 0 {
            return self.bump.alloc([0u8; 0]).as_mut_ptr();
        }
        let layout = std::alloc::Layout::from_size_align(nbytes, 8).expect("bad arena layout");
        self.bump.alloc_layout(layout).as_ptr()
    }

    /// Copy a NUL-terminated C string into the arena, returning a fresh
    /// NUL-terminated copy (spec §4.1 `strdup`).
    pub fn strdup(&self, s: &str) -> *const c_char {
        let bytes = s.as_bytes();
        let dst = self.alloc_bytes(bytes.len() + 1);
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len());
            *dst.add(bytes.len()) = 0;
        }
        dst as *const c_char
    }

    /// Copy `len` bytes starting at `ptr` into the arena, NUL-terminating
    /// the copy (spec §4.1 `strndup`).
    ///
    /// # Safety
    /// `ptr` must be valid for `len` bytes.
    pub unsafe fn strndup_raw(&self, ptr: *const c_char, len: usize) -> *const c_char {
        let slice = unsafe { std::slice::from_raw_parts(ptr as *const u8, len) };
        let dst = self.alloc_bytes(len + 1);
        unsafe {
            std::ptr::copy_nonoverlapping(slice.as_ptr(), dst, len);
            *dst.add(len) = 0;
        }
        dst as *const c_char
    }
}

/// Create a child arena. `parent` may be null (root arena for `main`).
///
/// # Safety
/// `parent`, if non-null, must be a live `RtArena*` previously returned by
/// this function and not yet destroyed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_arena_create(parent: *mut RtArena) -> *mut RtArena {
    Box::into_raw(RtArena::new(parent))
}

/// Bump-allocate `nbytes` from `arena`. Out-of-memory aborts the process
/// (spec §4.1 "allocation never fails except by abort").
///
/// # Safety
/// `arena` must be a live, non-null `RtArena*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_arena_alloc(arena: *mut RtArena, nbytes: usize) -> *mut c_void {
    assert!(!arena.is_null(), "rt_arena_alloc: null arena");
    let arena = unsafe { &*arena };
    arena.alloc_bytes(nbytes) as *mut c_void
}

/// Destroy `arena`, releasing every allocation made from it in one shot.
/// Never destroys `arena`'s parent.
///
/// # Safety
/// `arena` must have been returned by `rt_arena_create` and not already
/// destroyed; no pointer allocated from `arena` may be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_arena_destroy(arena: *mut RtArena) {
    if arena.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(arena) });
}

/// `sprintf`-style formatted allocation into `arena` (spec §4.1).
///
/// # Safety
/// `arena` must be live and non-null; `fmt` must be a valid NUL-terminated
/// C string understood by [`printf_like`]; variadic arguments are not
/// supported from Rust callers — this entry point accepts a single
/// pre-rendered string and exists for parity with the spec's named
/// operation, used internally by the generator's interpolation lowering.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_arena_sprintf(arena: *mut RtArena, rendered: *const c_char) -> *const c_char {
    assert!(!arena.is_null(), "rt_arena_sprintf: null arena");
    let arena = unsafe { &*arena };
    let s = unsafe { CStr::from_ptr(rendered) }.to_string_lossy();
    arena.strdup(&s)
}

/// Helper for Rust-side callers (string/array modules within this crate)
/// needing a safe reference to an arena pointer.
///
/// # Safety
/// `arena` must be a live, non-null `RtArena*`.
pub unsafe fn arena_ref<'a>(arena: *mut RtArena) -> &'a RtArena {
    assert!(!arena.is_null(), "null RtArena pointer");
    unsafe { &*arena }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_alloc_destroy_roundtrip() {
        unsafe {
            let a = rt_arena_create(ptr::null_mut());
            assert!(!a.is_null());
            let p = rt_arena_alloc(a, 64);
            assert!(!p.is_null());
            rt_arena_destroy(a);
        }
    }

    #[test]
    fn child_arena_keeps_parent_pointer() {
        unsafe {
            let parent = rt_arena_create(ptr::null_mut());
            let child = rt_arena_create(parent);
            assert_eq!((*child).parent, parent);
            rt_arena_destroy(child);
            rt_arena_destroy(parent);
        }
    }

    #[test]
    fn strdup_copies_and_nul_terminates() {
        unsafe {
            let a = rt_arena_create(ptr::null_mut());
            let arena = arena_ref(a);
            let s = arena.strdup("hello");
            let back = CStr::from_ptr(s).to_str().unwrap();
            assert_eq!(back, "hello");
            rt_arena_destroy(a);
        }
    }
}
