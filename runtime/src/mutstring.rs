//! `RtStringBuilder` - the mutable accumulator `codegen::emit_interpolated`
//! lowers each `"... ${expr} ..."` literal into.
//!
//! The source language's strings are immutable (spec §2 GLOSSARY), so there
//! is no user-facing builder type; this exists purely as a codegen target,
//! the way the teacher's `cemstring.rs` used an interior `Vec<u8>` scratch
//! buffer while assembling a `SeqString` before freezing it.

use crate::arena::{arena_ref, RtArena};
use crate::strings::{sn_str, SnString};

pub struct RtStringBuilder {
    buf: String,
}

/// # Safety
/// `arena` must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_mutstring_new(arena: *mut RtArena) -> *mut RtStringBuilder {
    let arena = unsafe { arena_ref(arena) };
    let slot = arena.alloc_bytes(std::mem::size_of::<RtStringBuilder>()) as *mut RtStringBuilder;
    unsafe { slot.write(RtStringBuilder { buf: String::new() }) };
    slot
}

/// # Safety
/// `builder` must be a live `RtStringBuilder*` from `rt_mutstring_new`;
/// `piece` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_mutstring_append(_arena: *mut RtArena, builder: *mut RtStringBuilder, piece: *const SnString) {
    let builder = unsafe { &mut *builder };
    builder.buf.push_str(unsafe { sn_str(piece) });
}

/// Freezes the builder's current contents into an immutable `SnString`.
///
/// # Safety
/// `arena` must be live; `builder` must be a live `RtStringBuilder*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_mutstring_to_string(arena: *mut RtArena, builder: *const RtStringBuilder) -> *mut SnString {
    let arena = unsafe { arena_ref(arena) };
    let builder = unsafe { &*builder };
    SnString::alloc_in(arena, &builder.buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn append_then_freeze_concatenates_pieces() {
        unsafe {
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            let builder = rt_mutstring_new(arena);
            let hello = crate::strings::rt_string_literal(arena, c"hello ".as_ptr());
            let world = crate::strings::rt_string_literal(arena, c"world".as_ptr());
            rt_mutstring_append(arena, builder, hello);
            rt_mutstring_append(arena, builder, world);
            let frozen = rt_mutstring_to_string(arena, builder);
            assert_eq!(sn_str(frozen), "hello world");
            crate::arena::rt_arena_destroy(arena);
        }
    }
}
