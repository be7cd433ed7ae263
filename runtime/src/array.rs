//! SnArray - arena-backed dynamic array shared by every element type the
//! generator emits (spec §3 `array(element)`, §4.6 "Runtime types selected
//! by element type").
//!
//! The C header exposes one named type per element kind (`SnArray_long`,
//! `SnArray_string`, ...) so generated code gets static typing at call
//! sites, but underneath every one of those names aliases the same
//! `SnArray`: elements are stored as 8-byte slots whose bit pattern is
//! either a scalar value (`long`, `double`, `bool`, `byte`, `char`) or a
//! pointer (`SnString*` for `string`, anything else for `ptr`). This keeps
//! the Rust side to one generic implementation instead of the C original's
//! one-struct-per-element-kind duplication, while the suffix-dispatch
//! functions below (grounded on `runtime/src/variant_ops.rs` /
//! `runtime/src/map_ops.rs`'s per-kind dispatch idiom) still give callers a
//! typed, suffix-named surface matching spec §4.7.

use crate::arena::{arena_ref, RtArena};
use crate::strings::SnString;
use std::ffi::c_void;

#[repr(C)]
pub struct SnArray {
    pub len: usize,
    cap: usize,
    pub items: *mut u64,
}

impl SnArray {
    fn as_slice(&self) -> &[u64] {
        if self.items.is_null() {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(self.items, self.len) }
        }
    }

    fn alloc_in(arena: &RtArena, slots: &[u64]) -> *mut SnArray {
        let items = if slots.is_empty() {
            std::ptr::null_mut()
        } else {
            let bytes = arena.alloc_bytes(slots.len() * 8) as *mut u64;
            unsafe {
                std::ptr::copy_nonoverlapping(slots.as_ptr(), bytes, slots.len());
            }
            bytes
        };
        let header = arena.alloc_bytes(std::mem::size_of::<SnArray>()) as *mut SnArray;
        unsafe {
            header.write(SnArray { len: slots.len(), cap: slots.len(), items });
        }
        header
    }
}

unsafe fn slots_of<'a>(array: *const SnArray) -> &'a [u64] {
    assert!(!array.is_null(), "array operation on null array");
    unsafe { (*array).as_slice() }
}

/// # Safety
/// `arena` must be live; `items` must point to `count` valid `void*` slots
/// (spec §4.6 array literal lowering).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_array_create(arena: *mut RtArena, count: usize, items: *const *mut c_void) -> *mut SnArray {
    let arena = unsafe { arena_ref(arena) };
    let slots: Vec<u64> = if count == 0 {
        Vec::new()
    } else {
        unsafe { std::slice::from_raw_parts(items, count) }.iter().map(|p| *p as u64).collect()
    };
    SnArray::alloc_in(arena, &slots)
}

/// Internal helper for other runtime modules (e.g. `strings::rt_string_split`)
/// that already have slot values in hand and don't need to go through the
/// `void*[]` literal-array ABI.
///
/// # Safety
/// `arena` must be live.
pub(crate) unsafe fn rt_array_create_from_slots(arena: *mut RtArena, slots: &[u64]) -> *mut SnArray {
    let arena = unsafe { arena_ref(arena) };
    SnArray::alloc_in(arena, slots)
}

/// # Safety
/// `arena` must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_array_sized(arena: *mut RtArena, _elem_size: usize, count: i64, default: u64) -> *mut SnArray {
    let arena = unsafe { arena_ref(arena) };
    let count = count.max(0) as usize;
    let slots = vec![default; count];
    SnArray::alloc_in(arena, &slots)
}

/// # Safety
/// `array` must be null or a live `SnArray*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_array_length(array: *const c_void) -> i64 {
    if array.is_null() {
        return 0;
    }
    unsafe { (*(array as *const SnArray)).len as i64 }
}

/// # Safety
/// `arena` must be live; `array` must be null or a live `SnArray*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_array_slice(arena: *mut RtArena, array: *const c_void, start: i64, end: i64) -> *mut SnArray {
    let arena = unsafe { arena_ref(arena) };
    let array = array as *const SnArray;
    let slots = if array.is_null() { &[][..] } else { unsafe { slots_of(array) } };
    let len = slots.len() as i64;
    let start = start.clamp(0, len) as usize;
    let end = end.clamp(0, len) as usize;
    if start >= end {
        return SnArray::alloc_in(arena, &[]);
    }
    SnArray::alloc_in(arena, &slots[start..end])
}

/// # Safety
/// `arena` must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_array_range(arena: *mut RtArena, start: i64, end: i64) -> *mut SnArray {
    let arena = unsafe { arena_ref(arena) };
    let slots: Vec<u64> = (start..end).map(|v| v as u64).collect();
    SnArray::alloc_in(arena, &slots)
}

/// Returns the array with `item` appended (spec S2: `arr.push(1)`).
///
/// # Safety
/// `arena` must be live; `array` must be null or a live `SnArray*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_array_push(arena: *mut RtArena, array: *mut c_void, item: u64) -> *mut SnArray {
    let arena = unsafe { arena_ref(arena) };
    let array = array as *const SnArray;
    let mut slots = if array.is_null() { Vec::new() } else { unsafe { slots_of(array) }.to_vec() };
    slots.push(item);
    SnArray::alloc_in(arena, &slots)
}

/// Removes and returns the last element's slot value.
///
/// # Safety
/// `arena` must be live; `array` must point at a non-empty `SnArray`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_array_pop(arena: *mut RtArena, array: *mut c_void) -> u64 {
    let _ = arena;
    let array = array as *mut SnArray;
    assert!(!array.is_null(), "pop on null array");
    unsafe {
        let len = (*array).len;
        assert!(len > 0, "pop on empty array");
        let slots = std::slice::from_raw_parts((*array).items, len);
        let last = slots[len - 1];
        (*array).len = len - 1;
        last
    }
}

/// # Safety
/// `arena` must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_array_clear(arena: *mut RtArena, _array: *mut c_void) -> *mut SnArray {
    let arena = unsafe { arena_ref(arena) };
    SnArray::alloc_in(arena, &[])
}

/// # Safety
/// `arena` must be live; both arrays must be null or live `SnArray*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_array_concat(arena: *mut RtArena, a: *const c_void, b: *const c_void) -> *mut SnArray {
    let arena = unsafe { arena_ref(arena) };
    let a = a as *const SnArray;
    let b = b as *const SnArray;
    let mut slots = if a.is_null() { Vec::new() } else { unsafe { slots_of(a) }.to_vec() };
    if !b.is_null() {
        slots.extend_from_slice(unsafe { slots_of(b) });
    }
    SnArray::alloc_in(arena, &slots)
}

/// # Safety
/// `array` must be null or a live `SnArray*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_array_eq(a: *const c_void, b: *const c_void) -> bool {
    let a = a as *const SnArray;
    let b = b as *const SnArray;
    let sa = if a.is_null() { &[][..] } else { unsafe { slots_of(a) } };
    let sb = if b.is_null() { &[][..] } else { unsafe { slots_of(b) } };
    sa == sb
}

/// Generic `Any`-typed array ops (spec §4.7 `array_sort`/`array_reverse`/
/// `array_contains`). Sort and reverse mutate in place since neither grows
/// the backing allocation; contains compares by raw slot bit pattern, which
/// is correct for scalar element kinds and pointer identity for
/// reference-typed ones.
///
/// # Safety
/// `array` must be null or a live `SnArray*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_array_sort(array: *mut c_void) {
    let array = array as *mut SnArray;
    if array.is_null() {
        return;
    }
    unsafe {
        let len = (*array).len;
        let slots = std::slice::from_raw_parts_mut((*array).items, len);
        slots.sort_unstable_by_key(|&s| s as i64);
    }
}

/// # Safety
/// `array` must be null or a live `SnArray*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_array_reverse(array: *mut c_void) {
    let array = array as *mut SnArray;
    if array.is_null() {
        return;
    }
    unsafe {
        let len = (*array).len;
        let slots = std::slice::from_raw_parts_mut((*array).items, len);
        slots.reverse();
    }
}

/// # Safety
/// `array` must be null or a live `SnArray*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_array_contains(array: *const c_void, needle: u64) -> bool {
    let array = array as *const SnArray;
    if array.is_null() {
        return false;
    }
    unsafe { slots_of(array) }.contains(&needle)
}

/// Suffix-named convenience wrappers over the generic core above (spec
/// §4.7's full `rt_array_*_<suffix>` surface). Each suffix corresponds to
/// one of the element kinds the code generator dispatches on in
/// `array_suffix` (`long, double, char, bool, byte, string, ptr`); one
/// macro invocation per suffix spells out the four ops that don't need
/// element-kind-aware logic (those — `indexOf`/`contains`/`join` — follow
/// below, written out per kind instead).
macro_rules! array_suffix_ops {
    ($suffix:ident) => {
        ::paste::paste! {
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<rt_array_push_ $suffix>](arena: *mut RtArena, array: *mut c_void, item: u64) -> *mut SnArray {
                unsafe { rt_array_push(arena, array, item) }
            }

            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<rt_array_pop_ $suffix>](arena: *mut RtArena, array: *mut c_void) -> u64 {
                unsafe { rt_array_pop(arena, array) }
            }

            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<rt_array_clear_ $suffix>](arena: *mut RtArena, array: *mut c_void) -> *mut SnArray {
                unsafe { rt_array_clear(arena, array) }
            }

            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<rt_array_concat_ $suffix>](arena: *mut RtArena, a: *const c_void, b: *const c_void) -> *mut SnArray {
                unsafe { rt_array_concat(arena, a, b) }
            }

            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<rt_array_clone_ $suffix>](arena: *mut RtArena, array: *const c_void) -> *mut SnArray {
                let arena_ref = unsafe { crate::arena::arena_ref(arena) };
                let slots = unsafe { slots_of(array as *const SnArray) };
                SnArray::alloc_in(arena_ref, slots)
            }

            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<rt_array_rev_ $suffix>](arena: *mut RtArena, array: *const c_void) -> *mut SnArray {
                let arena_ref = unsafe { crate::arena::arena_ref(arena) };
                let mut slots = unsafe { slots_of(array as *const SnArray) }.to_vec();
                slots.reverse();
                SnArray::alloc_in(arena_ref, &slots)
            }

            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<rt_array_rem_ $suffix>](arena: *mut RtArena, array: *const c_void, index: i64) -> *mut SnArray {
                let arena_ref = unsafe { crate::arena::arena_ref(arena) };
                let mut slots = unsafe { slots_of(array as *const SnArray) }.to_vec();
                let idx = index as usize;
                if idx < slots.len() {
                    slots.remove(idx);
                }
                SnArray::alloc_in(arena_ref, &slots)
            }

            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<rt_array_ins_ $suffix>](arena: *mut RtArena, array: *const c_void, index: i64, value: u64) -> *mut SnArray {
                let arena_ref = unsafe { crate::arena::arena_ref(arena) };
                let mut slots = unsafe { slots_of(array as *const SnArray) }.to_vec();
                let idx = (index as usize).min(slots.len());
                slots.insert(idx, value);
                SnArray::alloc_in(arena_ref, &slots)
            }

            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<rt_array_push_copy_ $suffix>](arena: *mut RtArena, array: *const c_void, item: u64) -> *mut SnArray {
                unsafe { rt_array_push(arena, array as *mut c_void, item) }
            }

            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<rt_array_eq_ $suffix>](a: *const c_void, b: *const c_void) -> bool {
                unsafe { rt_array_eq(a, b) }
            }
        }
    };
}

array_suffix_ops!(long);
array_suffix_ops!(double);
array_suffix_ops!(char);
array_suffix_ops!(bool);
array_suffix_ops!(byte);
array_suffix_ops!(string);
array_suffix_ops!(ptr);

/// `indexOf`/`contains` need element-kind-aware comparison (scalar bit
/// pattern vs. `SnString*` content), so these two are written out, not
/// forwarded, per suffix.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_array_indexOf_long(array: *const c_void, needle: i64) -> i64 {
    let slots = unsafe { slots_of(array as *const SnArray) };
    slots.iter().position(|&s| s as i64 == needle).map(|i| i as i64).unwrap_or(-1)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_array_contains_long(array: *const c_void, needle: i64) -> bool {
    unsafe { rt_array_indexOf_long(array, needle) } >= 0
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_array_indexOf_string(array: *const c_void, needle: *const SnString) -> i64 {
    let slots = unsafe { slots_of(array as *const SnArray) };
    for (i, &slot) in slots.iter().enumerate() {
        let candidate = slot as *const SnString;
        if unsafe { crate::strings::sn_string_eq(candidate, needle) } {
            return i as i64;
        }
    }
    -1
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_array_contains_string(array: *const c_void, needle: *const SnString) -> bool {
    unsafe { rt_array_indexOf_string(array, needle) } >= 0
}

/// # Safety
/// `arena`, `array` must be live; `sep` must be a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_array_join_string(arena: *mut RtArena, array: *const c_void, sep: *const SnString) -> *mut SnString {
    let arena_ref = unsafe { crate::arena::arena_ref(arena) };
    let slots = unsafe { slots_of(array as *const SnArray) };
    let sep_str = unsafe { crate::strings::sn_str(sep) };
    let joined = slots
        .iter()
        .map(|&s| unsafe { crate::strings::sn_str(s as *const SnString) })
        .collect::<Vec<_>>()
        .join(sep_str);
    SnString::alloc_in(arena_ref, &joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn create_and_length() {
        unsafe {
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            let items: [*mut c_void; 3] = [1 as *mut c_void, 2 as *mut c_void, 3 as *mut c_void];
            let arr = rt_array_create(arena, 3, items.as_ptr());
            assert_eq!(rt_array_length(arr as *const c_void), 3);
            crate::arena::rt_arena_destroy(arena);
        }
    }

    #[test]
    fn push_grows_and_pop_shrinks() {
        unsafe {
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            let arr = rt_array_create(arena, 0, ptr::null());
            let arr = rt_array_push(arena, arr as *mut c_void, 42);
            assert_eq!(rt_array_length(arr as *const c_void), 1);
            let v = rt_array_pop(arena, arr as *mut c_void);
            assert_eq!(v, 42);
            assert_eq!((*arr).len, 0);
            crate::arena::rt_arena_destroy(arena);
        }
    }

    #[test]
    fn concat_combines_both_arrays() {
        unsafe {
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            let a_items: [*mut c_void; 2] = [1 as *mut c_void, 2 as *mut c_void];
            let b_items: [*mut c_void; 1] = [3 as *mut c_void];
            let a = rt_array_create(arena, 2, a_items.as_ptr());
            let b = rt_array_create(arena, 1, b_items.as_ptr());
            let c = rt_array_concat(arena, a as *const c_void, b as *const c_void);
            assert_eq!(rt_array_length(c as *const c_void), 3);
            crate::arena::rt_arena_destroy(arena);
        }
    }

    #[test]
    fn sort_reverse_and_contains_operate_in_place() {
        unsafe {
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            let items: [*mut c_void; 3] = [3 as *mut c_void, 1 as *mut c_void, 2 as *mut c_void];
            let arr = rt_array_create(arena, 3, items.as_ptr());
            assert!(rt_array_contains(arr as *const c_void, 2));
            assert!(!rt_array_contains(arr as *const c_void, 9));
            rt_array_sort(arr as *mut c_void);
            assert_eq!(slots_of(arr as *const SnArray), &[1, 2, 3]);
            rt_array_reverse(arr as *mut c_void);
            assert_eq!(slots_of(arr as *const SnArray), &[3, 2, 1]);
            crate::arena::rt_arena_destroy(arena);
        }
    }

    #[test]
    fn range_produces_ascending_longs() {
        unsafe {
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            let r = rt_array_range(arena, 2, 5);
            let slots = slots_of(r as *const SnArray);
            let vals: Vec<i64> = slots.iter().map(|&s| s as i64).collect();
            assert_eq!(vals, vec![2, 3, 4]);
            crate::arena::rt_arena_destroy(arena);
        }
    }
}
