//! Standard I/O (spec §4.7 "print", "println", stdin line reads) and process
//! exit.
//!
//! Grounded on `runtime/src/io.rs`'s `write_line`/`read_line`/`exit_op`
//! trio, re-pointed at `SnString` and a plain `std::sync::Mutex` guarding
//! stdout (the teacher's `may::sync::Mutex` existed to cooperate with its
//! green-thread scheduler; `thread.rs` here spawns real OS threads via
//! `std::thread`, so a standard `Mutex` serializes writes the same way
//! without a coroutine runtime to yield to).

use crate::strings::{sn_str, SnString};
use std::io::{self, BufRead, Write};
use std::sync::LazyLock;

static STDOUT_MUTEX: LazyLock<std::sync::Mutex<()>> = LazyLock::new(|| std::sync::Mutex::new(()));

/// # Safety
/// `s` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_print(s: *const SnString) {
    let text = unsafe { sn_str(s) };
    let _guard = STDOUT_MUTEX.lock().unwrap();
    let mut out = io::stdout().lock();
    let _ = out.write_all(text.as_bytes());
    let _ = out.flush();
}

/// # Safety
/// `s` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_println(s: *const SnString) {
    let text = unsafe { sn_str(s) };
    let _guard = STDOUT_MUTEX.lock().unwrap();
    let mut out = io::stdout().lock();
    let _ = out.write_all(text.as_bytes());
    let _ = out.write_all(b"\n");
    let _ = out.flush();
}

/// # Safety
/// `s` must be null or a live `SnString*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_eprintln(s: *const SnString) {
    let text = unsafe { sn_str(s) };
    let _guard = STDOUT_MUTEX.lock().unwrap();
    let mut err = io::stderr().lock();
    let _ = err.write_all(text.as_bytes());
    let _ = err.write_all(b"\n");
    let _ = err.flush();
}

/// Reads one line from stdin, stripping the trailing `\n`/`\r\n`. Returns an
/// empty string at EOF (mirrors the teacher's `read_line`, minus the
/// preserved-newline convention since `sn` source has no `string-chomp`
/// builtin to undo it).
///
/// # Safety
/// `arena` must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_read_line(arena: *mut crate::arena::RtArena) -> *mut SnString {
    let arena = unsafe { crate::arena::arena_ref(arena) };
    let mut line = String::new();
    let _ = io::stdin().lock().read_line(&mut line);
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    SnString::alloc_in(arena, &line)
}

/// Terminates the process. Never returns.
#[unsafe(no_mangle)]
pub extern "C" fn rt_exit(code: i32) -> ! {
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn print_does_not_panic_on_empty_string() {
        unsafe {
            let arena = crate::arena::rt_arena_create(ptr::null_mut());
            let s = crate::strings::rt_string_literal(arena, c"".as_ptr());
            rt_print(s);
            rt_println(s);
            crate::arena::rt_arena_destroy(arena);
        }
    }
}
