//! Native function signatures
//!
//! Every function the language exposes without a user-written `native`
//! declaration: the two always-injected symbol-table built-ins
//! (`print`/`to_string`, see `symbol.rs`) plus the standard library of
//! native functions backed by the runtime crate. Each entry pairs a source
//! name with its `ast::Type` signature and the `rt_*` C symbol the code
//! generator emits a call to (spec §4.6 "Runtime interface").
//!
//! `needs_arena` tells the code generator whether `__arena` is prepended as
//! the call's first argument. Most runtime entry points allocate out of the
//! caller's arena and need it; a handful of read-only queries (string/array
//! length, existence checks, the process clock) take no allocator and must
//! be called without one.

use crate::ast::{MemQual, Type};
use std::collections::HashMap;
use std::sync::LazyLock;

#[derive(Debug, Clone)]
pub struct BuiltinSignature {
    pub symbol: &'static str,
    pub ty: Type,
    pub needs_arena: bool,
}

fn func(ret: Type, params: Vec<Type>) -> Type {
    let mem_quals = vec![MemQual::None; params.len()];
    Type::function(ret, params, mem_quals, false, true)
}

static SIGNATURES: LazyLock<HashMap<&'static str, BuiltinSignature>> = LazyLock::new(|| {
    let mut m = HashMap::new();
    let mut add = |name: &'static str, symbol: &'static str, ty: Type| {
        m.insert(name, BuiltinSignature { symbol, ty, needs_arena: true });
    };
    let mut add_bare = |name: &'static str, symbol: &'static str, ty: Type| {
        m.insert(name, BuiltinSignature { symbol, ty, needs_arena: false });
    };

    // Strings
    add_bare("string_length", "rt_string_length", func(Type::Int, vec![Type::String]));
    add("string_concat", "rt_string_concat", func(Type::String, vec![Type::String, Type::String]));
    add_bare("string_contains", "rt_string_contains", func(Type::Bool, vec![Type::String, Type::String]));
    add_bare("string_starts_with", "rt_string_startsWith", func(Type::Bool, vec![Type::String, Type::String]));
    add_bare("string_ends_with", "rt_string_endsWith", func(Type::Bool, vec![Type::String, Type::String]));
    add("string_trim", "rt_string_trim", func(Type::String, vec![Type::String]));
    add("string_to_upper", "rt_string_upper", func(Type::String, vec![Type::String]));
    add("string_to_lower", "rt_string_lower", func(Type::String, vec![Type::String]));
    add("string_split", "rt_string_split", func(Type::array(Type::String), vec![Type::String, Type::String]));
    add_bare("string_char_at", "rt_string_charAt", func(Type::Char, vec![Type::String, Type::Int]));
    add("string_substring", "rt_string_substring", func(Type::String, vec![Type::String, Type::Int, Type::Int]));
    add_bare("string_index_of", "rt_string_indexOf", func(Type::Int, vec![Type::String, Type::String]));
    add_bare("string_is_empty", "rt_string_is_empty", func(Type::Bool, vec![Type::String]));

    // Mutable string builder
    add("mutstring_new", "rt_mutstring_new", func(Type::Opaque("RtStringBuilder".into()), vec![]));
    add(
        "mutstring_append",
        "rt_mutstring_append",
        func(Type::Void, vec![Type::Opaque("RtStringBuilder".into()), Type::String]),
    );
    add(
        "mutstring_to_string",
        "rt_mutstring_to_string",
        func(Type::String, vec![Type::Opaque("RtStringBuilder".into())]),
    );

    // Conversions
    add_bare("parse_int", "rt_parse_int", func(Type::Int, vec![Type::String]));
    add_bare("parse_long", "rt_parse_long", func(Type::Long, vec![Type::String]));
    add_bare("parse_double", "rt_parse_double", func(Type::Double, vec![Type::String]));
    add("int_to_string", "rt_int_to_string", func(Type::String, vec![Type::Int]));
    add("long_to_string", "rt_long_to_string", func(Type::String, vec![Type::Long]));
    add("double_to_string", "rt_double_to_string", func(Type::String, vec![Type::Double]));
    add("bool_to_string", "rt_bool_to_string", func(Type::String, vec![Type::Bool]));

    // Arrays
    add_bare("array_length", "rt_array_length", func(Type::Int, vec![Type::array(Type::Any)]));
    add("array_push", "rt_array_push", func(Type::Void, vec![Type::array(Type::Any), Type::Any]));
    add("array_pop", "rt_array_pop", func(Type::Any, vec![Type::array(Type::Any)]));
    add_bare("array_sort", "rt_array_sort", func(Type::Void, vec![Type::array(Type::Any)]));
    add_bare("array_reverse", "rt_array_reverse", func(Type::Void, vec![Type::array(Type::Any)]));
    add_bare("array_contains", "rt_array_contains", func(Type::Bool, vec![Type::array(Type::Any), Type::Any]));

    // Byte arrays / encodings
    add("bytes_from_string", "rt_bytes_from_string", func(Type::array(Type::Byte), vec![Type::String]));
    add("bytes_to_string", "rt_bytes_to_string", func(Type::String, vec![Type::array(Type::Byte)]));
    add("bytes_to_base64", "rt_bytes_to_base64", func(Type::String, vec![Type::array(Type::Byte)]));
    add("bytes_from_base64", "rt_bytes_from_base64", func(Type::array(Type::Byte), vec![Type::String]));
    add("bytes_to_hex", "rt_bytes_to_hex", func(Type::String, vec![Type::array(Type::Byte)]));
    add("bytes_from_hex", "rt_bytes_from_hex", func(Type::array(Type::Byte), vec![Type::String]));

    // Files / paths / standard streams
    add("file_read_all", "rt_file_readText", func(Type::String, vec![Type::String]));
    add("file_write_all", "rt_file_writeText", func(Type::Void, vec![Type::String, Type::String]));
    add("file_append", "rt_file_appendText", func(Type::Void, vec![Type::String, Type::String]));
    add_bare("file_exists", "rt_file_exists", func(Type::Bool, vec![Type::String]));
    add_bare("file_remove", "rt_file_remove", func(Type::Void, vec![Type::String]));
    add("path_join", "rt_path_join", func(Type::String, vec![Type::String, Type::String]));
    add("path_basename", "rt_path_basename", func(Type::String, vec![Type::String]));
    add("path_dirname", "rt_path_dirname", func(Type::String, vec![Type::String]));
    add("read_line", "rt_read_line", func(Type::String, vec![]));

    // Time
    add_bare("time_now_millis", "rt_time_now_millis", func(Type::Long, vec![]));
    add_bare("time_sleep_millis", "rt_time_sleep_millis", func(Type::Void, vec![Type::Long]));

    m
});

pub fn builtin_signature(name: &str) -> Option<&'static BuiltinSignature> {
    SIGNATURES.get(name)
}

pub fn is_builtin(name: &str) -> bool {
    SIGNATURES.contains_key(name)
}

pub fn all_builtin_names() -> impl Iterator<Item = &'static str> {
    SIGNATURES.keys().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_length_has_expected_signature() {
        let sig = builtin_signature("string_length").unwrap();
        assert_eq!(sig.symbol, "rt_string_length");
        assert!(!sig.needs_arena);
        match &sig.ty {
            Type::Function { ret, params, .. } => {
                assert_eq!(**ret, Type::Int);
                assert_eq!(params, &vec![Type::String]);
            }
            _ => panic!("expected function type"),
        }
    }

    #[test]
    fn unknown_name_is_not_builtin() {
        assert!(!is_builtin("definitely_not_a_builtin"));
        assert!(builtin_signature("definitely_not_a_builtin").is_none());
    }

    #[test]
    fn array_contains_signature_takes_any_element() {
        let sig = builtin_signature("array_contains").unwrap();
        assert!(!sig.needs_arena);
        match &sig.ty {
            Type::Function { ret, .. } => assert_eq!(**ret, Type::Bool),
            _ => panic!("expected function type"),
        }
    }

    #[test]
    fn string_concat_allocates_and_needs_arena() {
        let sig = builtin_signature("string_concat").unwrap();
        assert!(sig.needs_arena);
    }
}
