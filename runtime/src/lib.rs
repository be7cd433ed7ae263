//! Sn runtime: the C-ABI library every `snc`-generated translation unit
//! links against (spec §4.6 "Runtime interface").
//!
//! Organized by concern rather than by source-language feature, mirroring
//! how `codegen.rs` groups its own `extern` declarations: arena lifecycle,
//! closures, strings, arrays, checked arithmetic, value-to-string
//! conversions, standard I/O, files, paths, byte encodings, threads, and
//! time. Every `pub` item in these modules is either `#[repr(C)]` or an
//! `extern "C"` function — this crate has no internal-only public API.

pub mod arena;
pub mod arith;
pub mod array;
pub mod bytes;
pub mod closures;
pub mod convert;
pub mod file;
pub mod io;
pub mod mutstring;
pub mod path;
pub mod strings;
pub mod thread;
pub mod time;

pub use arena::{rt_arena_alloc, rt_arena_create, rt_arena_destroy, RtArena};
pub use array::SnArray;
pub use closures::{rt_closure_make, __Closure__};
pub use mutstring::RtStringBuilder;
pub use strings::SnString;
pub use thread::RtThreadHandle;
