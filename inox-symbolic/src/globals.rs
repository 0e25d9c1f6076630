use std::collections::BTreeMap;
use std::sync::Arc;

use crate::options::ValueDescription;
use crate::value::{HostFunction, Value};

#[derive(Debug, Clone, Copy)]
struct BaseFunction {
    name: &'static str,
    parameters: &'static [ValueDescription],
    variadic: Option<ValueDescription>,
    result: ValueDescription,
}

const fn base_function(
    name: &'static str,
    parameters: &'static [ValueDescription],
    result: ValueDescription,
) -> BaseFunction {
    BaseFunction {
        name,
        parameters,
        variadic: None,
        result,
    }
}

const fn variadic_base_function(
    name: &'static str,
    parameters: &'static [ValueDescription],
    variadic: ValueDescription,
    result: ValueDescription,
) -> BaseFunction {
    BaseFunction {
        name,
        parameters,
        variadic: Some(variadic),
        result,
    }
}

/// Host functions available to every module checked with the base globals.
const BASE_FUNCTIONS: &[BaseFunction] = &[
    variadic_base_function("print", &[], ValueDescription::Any, ValueDescription::Nil),
    base_function("tostr", &[ValueDescription::Any], ValueDescription::String),
    base_function("typeof", &[ValueDescription::Any], ValueDescription::String),
    base_function("len", &[ValueDescription::Any], ValueDescription::Int),
    base_function("sleep", &[ValueDescription::Any], ValueDescription::Nil),
    base_function("rand", &[ValueDescription::Any], ValueDescription::Any),
    base_function("parse_int", &[ValueDescription::String], ValueDescription::Int),
    base_function("parse_float", &[ValueDescription::String], ValueDescription::Float),
    base_function("read", &[ValueDescription::Path], ValueDescription::Any),
    base_function("fetch", &[ValueDescription::Url], ValueDescription::Any),
    variadic_base_function(
        "append",
        &[ValueDescription::List],
        ValueDescription::Any,
        ValueDescription::List,
    ),
    base_function("keys", &[ValueDescription::Object], ValueDescription::List),
    base_function("is_nil", &[ValueDescription::Any], ValueDescription::Bool),
];

/// The base global set: each base function as a [`Value::HostFunction`].
pub fn base_globals() -> BTreeMap<String, Value> {
    BASE_FUNCTIONS
        .iter()
        .map(|function| {
            let mut host = HostFunction::new(
                function.name,
                function.parameters.iter().map(|parameter| parameter.value()).collect(),
                function.result.value(),
            );
            if let Some(element) = function.variadic {
                host = host.variadic(element.value());
            }
            (function.name.to_string(), Value::HostFunction(Arc::new(host)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_globals_are_host_functions() {
        let globals = base_globals();
        assert_eq!(globals.len(), BASE_FUNCTIONS.len());
        let Some(Value::HostFunction(print)) = globals.get("print") else {
            panic!("print should be a host function: {globals:?}");
        };
        assert!(print.variadic.is_some());
        assert_eq!(print.result, Value::Nil);
    }
}
