//! Dependency graph between the methods of an object literal.
//!
//! A method depends on another when its body reads `self.<other>`. Methods are
//! checked dependencies first so that a method calling another one sees its
//! inferred return value instead of a placeholder.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

#[derive(Debug, Default)]
pub(crate) struct MethodGraph {
    /// Methods in declaration order with the methods they depend on.
    methods: Vec<(String, Vec<String>)>,
}

/// Evaluation order of the methods and the dependency cycles found on the way.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct MethodOrder {
    pub order: Vec<String>,
    pub cycles: Vec<Vec<String>>,
}

impl MethodGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_method(&mut self, name: &str, dependencies: Vec<String>) {
        self.methods.push((name.to_string(), dependencies));
    }

    /// Depth-first post-order over the methods. An edge leading back to a method on the
    /// current path closes a cycle: the cycle is recorded and the edge is not followed.
    pub fn order(&self) -> MethodOrder {
        let edges: BTreeMap<&str, &[String]> = self
            .methods
            .iter()
            .map(|(name, dependencies)| (name.as_str(), dependencies.as_slice()))
            .collect();
        let mut marks = BTreeMap::new();
        let mut path = Vec::new();
        let mut result = MethodOrder {
            order: Vec::with_capacity(self.methods.len()),
            cycles: Vec::new(),
        };

        for (name, _) in &self.methods {
            visit(name, &edges, &mut marks, &mut path, &mut result);
        }
        result
    }
}

fn visit<'a>(
    name: &'a str,
    edges: &BTreeMap<&'a str, &'a [String]>,
    marks: &mut BTreeMap<&'a str, Mark>,
    path: &mut Vec<&'a str>,
    result: &mut MethodOrder,
) {
    match marks.get(name) {
        Some(Mark::Done) => return,
        Some(Mark::Visiting) => {
            if let Some(start) = path.iter().position(|method| *method == name) {
                result
                    .cycles
                    .push(path[start..].iter().map(|method| method.to_string()).collect());
            }
            return;
        }
        None => {}
    }

    marks.insert(name, Mark::Visiting);
    path.push(name);
    if let Some(dependencies) = edges.get(name) {
        for dependency in dependencies.iter() {
            // reads of plain properties are not edges
            if let Some((dependency, _)) = edges.get_key_value(dependency.as_str()) {
                visit(dependency, edges, marks, path, result);
            }
        }
    }
    path.pop();
    marks.insert(name, Mark::Done);
    result.order.push(name.to_string());
}
