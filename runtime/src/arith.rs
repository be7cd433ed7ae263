//! Checked arithmetic (spec §4.6/§4.7 `rt_add/sub/mul/div/mod/neg_long/double`).
//!
//! `codegen::emit_expr` routes every `Long`/`Double` binary and unary-minus
//! expression through these instead of a bare C operator, so overflow and
//! division-by-zero abort with a message pointing at the arena instead of
//! silently wrapping or trapping with `SIGFPE`. Grounded on the checked
//! paths in `runtime/src/arithmetic.rs`, generalized from the teacher's
//! single tagged `Value::Int` to the two fixed C types the generated code
//! actually carries.

use crate::arena::RtArena;

/// # Safety
/// `arena` is unused but kept for signature symmetry with other `rt_*`
/// entry points the generator always passes `__arena` to.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_add_long(_arena: *mut RtArena, a: i64, b: i64) -> i64 {
    a.checked_add(b).unwrap_or_else(|| panic!("rt_add_long: overflow ({a} + {b})"))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_sub_long(_arena: *mut RtArena, a: i64, b: i64) -> i64 {
    a.checked_sub(b).unwrap_or_else(|| panic!("rt_sub_long: overflow ({a} - {b})"))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_mul_long(_arena: *mut RtArena, a: i64, b: i64) -> i64 {
    a.checked_mul(b).unwrap_or_else(|| panic!("rt_mul_long: overflow ({a} * {b})"))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_div_long(_arena: *mut RtArena, a: i64, b: i64) -> i64 {
    if b == 0 {
        panic!("rt_div_long: division by zero");
    }
    a.checked_div(b).unwrap_or_else(|| panic!("rt_div_long: overflow ({a} / {b})"))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_mod_long(_arena: *mut RtArena, a: i64, b: i64) -> i64 {
    if b == 0 {
        panic!("rt_mod_long: modulo by zero");
    }
    a.checked_rem(b).unwrap_or_else(|| panic!("rt_mod_long: overflow ({a} % {b})"))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_neg_long(_arena: *mut RtArena, a: i64) -> i64 {
    a.checked_neg().unwrap_or_else(|| panic!("rt_neg_long: overflow (-{a})"))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_add_double(_arena: *mut RtArena, a: f64, b: f64) -> f64 {
    a + b
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_sub_double(_arena: *mut RtArena, a: f64, b: f64) -> f64 {
    a - b
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_mul_double(_arena: *mut RtArena, a: f64, b: f64) -> f64 {
    a * b
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_div_double(_arena: *mut RtArena, a: f64, b: f64) -> f64 {
    if b == 0.0 {
        panic!("rt_div_double: division by zero");
    }
    a / b
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_mod_double(_arena: *mut RtArena, a: f64, b: f64) -> f64 {
    if b == 0.0 {
        panic!("rt_mod_double: modulo by zero");
    }
    a % b
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_neg_double(_arena: *mut RtArena, a: f64) -> f64 {
    -a
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn long_add_sub_mul_roundtrip() {
        unsafe {
            assert_eq!(rt_add_long(ptr::null_mut(), 2, 3), 5);
            assert_eq!(rt_sub_long(ptr::null_mut(), 5, 3), 2);
            assert_eq!(rt_mul_long(ptr::null_mut(), 4, 3), 12);
        }
    }

    #[test]
    #[should_panic(expected = "division by zero")]
    fn long_div_by_zero_panics() {
        unsafe {
            rt_div_long(ptr::null_mut(), 1, 0);
        }
    }

    #[test]
    #[should_panic(expected = "overflow")]
    fn long_add_overflow_panics() {
        unsafe {
            rt_add_long(ptr::null_mut(), i64::MAX, 1);
        }
    }

    #[test]
    fn double_div_and_mod() {
        unsafe {
            assert_eq!(rt_div_double(ptr::null_mut(), 7.0, 2.0), 3.5);
            assert_eq!(rt_mod_double(ptr::null_mut(), 7.0, 2.0), 1.0);
        }
    }
}
