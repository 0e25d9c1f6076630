//! Diagnostic messages shared by several evaluation paths.

use std::fmt::Display;

use inox_support::{a_or_an, join_prefixed};

use crate::pattern::Pattern;

pub(crate) const INT_ASSIGNMENT_LHS_NOT_INT: &str =
    "invalid assignment: left hand side is not an integer";
pub(crate) const INT_ASSIGNMENT_RHS_NOT_INT: &str =
    "invalid assignment: right hand side is not an integer";
pub(crate) const MISSING_RETURN: &str = "missing return in function";
pub(crate) const MISSING_UNCONDITIONAL_RETURN: &str = "missing unconditional return in function";
pub(crate) const SPREAD_ARGS_NOT_SUPPORTED: &str =
    "spread arguments are not supported when calling non-variadic functions";
pub(crate) const RECURSIVE_CALL_WITHOUT_RETURN_TYPE: &str =
    "functions called recursively should have a return type";
pub(crate) const NESTED_RECURSIVE_FUNCTION_DECLARATION: &str =
    "nested recursive function declarations are not allowed";
pub(crate) const TUPLE_ELEMENTS_SHOULD_BE_IMMUTABLE: &str = "elements of a tuple should be immutable";
pub(crate) const OPTIONAL_PATTERN_MATCHING_NIL: &str =
    "cannot create optional pattern with pattern matching nil";
pub(crate) const SPREAD_OF_ANY_OBJECT_PATTERN: &str =
    "cannot spread an object pattern that matches any object";
pub(crate) const MISPLACED_DOUBLE_COLON: &str = "misplaced double-colon expression: it should be an assignment target or the callee of a call";
pub(crate) const INVALID_SPREAD_IN_CONCATENATION: &str =
    "a spread element in a concatenation should be an iterable whose elements have the same kind as the first element";
pub(crate) const IMPOSSIBLE_TO_KNOW_UPDATED_ELEMENT: &str =
    "impossible to know the updated element";
pub(crate) const IMPOSSIBLE_TO_KNOW_UPDATED_ELEMENTS: &str =
    "impossible to know the updated elements";
pub(crate) const INDEX_OUT_OF_BOUNDS: &str = "index is out of bounds";
pub(crate) const EXTENSION_METHOD_OUTSIDE_CALL: &str =
    "methods of type extensions can only be referenced in call position";

pub(crate) fn variable_not_declared(name: &str) -> String {
    format!("variable '{name}' is not declared")
}

pub(crate) fn variable_not_declared_but_pattern_exists(name: &str) -> String {
    format!("variable '{name}' is not declared, did you mean the pattern %{name} ?")
}

pub(crate) fn local_variable_not_declared(name: &str) -> String {
    format!("local variable '{name}' is not declared")
}

pub(crate) fn global_variable_not_declared(name: &str) -> String {
    format!("global variable '{name}' is not declared")
}

pub(crate) fn attempt_to_assign_constant_global(name: &str) -> String {
    format!("attempt to assign constant global '{name}'")
}

pub(crate) fn not_assignable_to_variable_of_type(value: impl Display, static_type: &Pattern) -> String {
    format!(
        "{} is not assignable to a variable of type {}",
        a_or_an(value),
        static_type.symbolic_value()
    )
}

pub(crate) fn not_assignable_to_property_of_type(value: impl Display, expected: impl Display) -> String {
    format!(
        "{} is not assignable to a property of type {expected}",
        a_or_an(value)
    )
}

pub(crate) fn cannot_assign_property_of(value: impl Display) -> String {
    format!("cannot assign property of {}", a_or_an(value))
}

pub(crate) fn cannot_add_property_to_exact_object(name: &str) -> String {
    format!("cannot add new property .{name} to an exact object")
}

pub(crate) fn readonly_object_property(name: &str) -> String {
    format!("property .{name} cannot be assigned: the object is readonly")
}

pub(crate) fn not_serializable_property_value(value: impl Display) -> String {
    format!("{} cannot be stored in a serializable container", a_or_an(value))
}

pub(crate) fn not_watchable_property_value(value: impl Display) -> String {
    format!(
        "{} is mutable but not watchable, it cannot be stored in a watchable container",
        a_or_an(value)
    )
}

pub(crate) fn not_mutable_sequence(value: impl Display) -> String {
    format!("{} is not a mutable sequence", a_or_an(value))
}

pub(crate) fn index_not_int(value: impl Display) -> String {
    format!("index is not an integer but {}", a_or_an(value))
}

pub(crate) fn start_index_not_int(value: impl Display) -> String {
    format!("start index is not an integer but {}", a_or_an(value))
}

pub(crate) fn end_index_not_int(value: impl Display) -> String {
    format!("end index is not an integer but {}", a_or_an(value))
}

pub(crate) fn list_expected(value: impl Display) -> String {
    format!("a list was expected but value is {}", a_or_an(value))
}

pub(crate) fn synchronized_value_not_sharable(value: impl Display) -> String {
    format!(
        "synchronized value should be a sharable or immutable value not {}",
        a_or_an(value)
    )
}

pub(crate) fn group_not_routine_group(value: impl Display) -> String {
    format!(
        "value of .group should be a routine group, not {}",
        a_or_an(value)
    )
}

pub(crate) fn spawn_globals_invalid(value: impl Display) -> String {
    format!(
        "value of .globals should be an object or a key list, not {}",
        a_or_an(value)
    )
}

pub(crate) fn spawn_global_not_sharable(name: &str, value: impl Display) -> String {
    format!(
        "global '{name}' passed to a routine should be sharable or immutable, not {}",
        a_or_an(value)
    )
}

pub(crate) fn record_value_not_immutable(key: &str) -> String {
    format!("invalid value for key '{key}', values of a record should be immutable")
}

pub(crate) fn unexpected_element_in_annotated_list(element: impl Display, expected: impl Display) -> String {
    format!("unexpected element of type {element} in a list of {expected} (annotation)")
}

pub(crate) fn unexpected_property(name: &str, suggestion: Option<&str>) -> String {
    match suggestion {
        Some(closest) => format!("unexpected property {name}, did you mean {closest} ?"),
        None => format!("unexpected property {name}"),
    }
}

pub(crate) fn list_should_have_len_geq(required: usize) -> String {
    match required {
        2 => "list should have a length greater or equal to two".to_string(),
        _ => format!("list should have a length greater or equal to {required}"),
    }
}

pub(crate) fn duplicate_key(name: &str) -> String {
    format!("duplicate key '{name}'")
}

pub(crate) fn spread_should_be_object(value: impl Display) -> String {
    format!(
        "a spread element in an object literal should be an object, not {}",
        a_or_an(value)
    )
}

pub(crate) fn if_test_not_bool(value: impl Display) -> String {
    format!("if statement test is not a boolean but a {value}")
}

pub(crate) fn if_expression_test_not_bool(value: impl Display) -> String {
    format!("if expression test is not a boolean but a {value}")
}

pub(crate) fn not_iterable(value: impl Display) -> String {
    format!("{} is not iterable", a_or_an(value))
}

pub(crate) fn not_walkable(value: impl Display) -> String {
    format!("{} is not walkable", a_or_an(value))
}

pub(crate) fn not_group_matching_pattern(pattern: impl Display) -> String {
    format!("{} is not a group matching pattern", a_or_an(pattern))
}

pub(crate) fn negate_operand(value: impl Display) -> String {
    format!("operand of '-' should should be an integer or float but is a {value}")
}

pub(crate) fn not_operand(value: impl Display) -> String {
    format!("operand of ! should should be a boolean but is a {value}")
}

pub(crate) fn left_operand(operator: impl Display, expected: &str, actual: impl Display) -> String {
    format!("left operand of binary {operator} should be a(n) {expected} but is {actual}")
}

pub(crate) fn right_operand(operator: impl Display, expected: &str, actual: impl Display) -> String {
    format!("right operand of binary {operator} should be a(n) {expected} but is {actual}")
}

pub(crate) fn invalid_return_value(value: impl Display, expected: impl Display) -> String {
    format!("invalid return value: {} is not assignable to {expected}", a_or_an(value))
}

pub(crate) fn cannot_call(value: impl Display) -> String {
    format!("cannot call {value}")
}

pub(crate) fn spread_argument_not_list(value: impl Display) -> String {
    format!("a spread argument should be a list not {}", a_or_an(value))
}

pub(crate) fn invalid_number_of_args(actual: usize, expected: usize) -> String {
    format!("invalid number of arguments : {actual}, {expected} was expected")
}

pub(crate) fn invalid_number_of_non_spread_args(actual: usize, expected: usize) -> String {
    format!("invalid number of non-spread arguments : {actual}, at least {expected} were expected")
}

pub(crate) fn invalid_argument(position: usize, actual: impl Display, expected: impl Display) -> String {
    format!(
        "invalid value for argument at position {position}: type is {actual}, but {expected} was expected"
    )
}

pub(crate) fn property_does_not_exist(name: &str, value: impl Display, suggestion: Option<&str>) -> String {
    match suggestion {
        Some(closest) => {
            format!("property .{name} does not exist in {value} maybe you meant .{closest}")
        }
        None => format!("property .{name} does not exist in {value}"),
    }
}

pub(crate) fn value_has_no_properties(value: impl Display) -> String {
    format!("value has no properties: {value}")
}

pub(crate) fn not_indexable(value: impl Display) -> String {
    format!("{} is not indexable", a_or_an(value))
}

pub(crate) fn sequence_expected(value: impl Display) -> String {
    format!("a sequence was expected but value is {}", a_or_an(value))
}

pub(crate) fn pattern_not_declared(name: &str, suggestion: Option<&str>) -> String {
    match suggestion {
        Some(closest) => format!("pattern %{name} is not declared, did you mean %{closest} ?"),
        None => format!("pattern %{name} is not declared"),
    }
}

pub(crate) fn pattern_namespace_not_declared(name: &str) -> String {
    format!("pattern namespace %{name}. is not declared")
}

pub(crate) fn pattern_namespace_member_not_declared(namespace: &str, member: &str) -> String {
    format!("pattern namespace %{namespace}. has no member .{member}")
}

pub(crate) fn pattern_already_declared(name: &str) -> String {
    format!("pattern %{name} is already declared")
}

pub(crate) fn pattern_namespace_initializer(value: impl Display) -> String {
    format!(
        "a pattern namespace should be initialized with an object or a record not {}",
        a_or_an(value)
    )
}

pub(crate) fn spread_should_be_object_pattern(value: impl Display) -> String {
    format!(
        "a pattern that is a spread in an object pattern should be an object pattern not {}",
        a_or_an(value)
    )
}

pub(crate) fn duplicate_pattern_entry(name: &str) -> String {
    format!("entry '{name}' is defined more than once in the object pattern")
}

pub(crate) fn pattern_entry_not_serializable(name: &str) -> String {
    format!("entry '{name}' of the pattern should only match serializable values")
}

pub(crate) fn record_pattern_entry_not_immutable(name: &str) -> String {
    format!("entry '{name}' of a record pattern should only match immutable values")
}

pub(crate) fn not_a_pattern(value: impl Display) -> String {
    format!("a pattern was expected but value is {}", a_or_an(value))
}

pub(crate) fn concatenation_invalid_element(kind: &str, value: impl Display) -> String {
    format!("{kind} concatenation: invalid element of type {value}")
}

pub(crate) fn asserted_value_not_bool(value: impl Display) -> String {
    format!("asserted value should be a boolean not a {value}")
}

pub(crate) fn cannot_interpolate_missing_namespace(namespace: &str) -> String {
    format!("cannot interpolate: pattern namespace '{namespace}' does not exist")
}

pub(crate) fn cannot_interpolate_missing_member(member: &str, namespace: &str) -> String {
    format!("cannot interpolate: member .{member} of pattern namespace '{namespace}' does not exist")
}

pub(crate) fn interpolation_not_string(value: impl Display) -> String {
    format!(
        "result of interpolation expression should be a string but is {}",
        a_or_an(value)
    )
}

pub(crate) fn method_cycle(names: &[String]) -> String {
    format!(
        "method cycle detected between: {}",
        join_prefixed(names, ".")
    )
}

pub(crate) fn cannot_initialize_metaproperty(name: &str) -> String {
    format!("cannot initialize metaproperty '{name}'")
}

pub(crate) fn lifetime_job_subject_not_object_pattern(value: impl Display) -> String {
    format!("the subject pattern of a lifetime job should be an object pattern not an {value}")
}

pub(crate) fn self_should_match_lifetime_job_subject(pattern: impl Display) -> String {
    format!("self should match subject pattern of lifetime job ({pattern})")
}

pub(crate) fn missing_permission(permission: impl Display) -> String {
    format!("missing permission: {permission}")
}

pub(crate) fn cyclic_inclusion(source: &str) -> String {
    format!("cyclic inclusion of '{source}'")
}

pub(crate) fn module_not_loaded(source: &str, reason: impl Display) -> String {
    format!("failed to load '{source}': {reason}")
}

pub(crate) fn import_source_not_path_or_url(value: impl Display) -> String {
    format!("the source of an import should be a path or a URL, not {}", a_or_an(value))
}

pub(crate) fn no_extension_member(name: &str, value: impl Display) -> String {
    format!("no type extension provides a member .{name} for {}", a_or_an(value))
}

pub(crate) fn extension_subject_not_pattern(value: impl Display) -> String {
    format!("the subject of a type extension should be a pattern, not {}", a_or_an(value))
}

pub(crate) fn xml_namespace_has_no_factory(value: impl Display) -> String {
    format!("{} has no callable .from_xml_factory property", a_or_an(value))
}

pub(crate) fn in_operand_not_iterable(value: impl Display) -> String {
    format!("right operand of 'in' should be iterable but is {}", a_or_an(value))
}

pub(crate) fn keyof_operand_not_object(value: impl Display) -> String {
    format!("right operand of 'keyof' should be an object but is {}", a_or_an(value))
}

pub(crate) fn match_operand_not_pattern(value: impl Display) -> String {
    format!("right operand of 'match' should be a pattern but is {}", a_or_an(value))
}

pub(crate) fn self_not_available() -> &'static str {
    "self is not available outside of methods, extensions and lifetime jobs"
}

pub(crate) fn secret_pattern_argument(value: impl Display) -> String {
    format!("a secret can only be created from a string, not {}", a_or_an(value))
}

pub(crate) fn unknown_unit(unit: &str) -> String {
    format!("unknown unit '{unit}'")
}
