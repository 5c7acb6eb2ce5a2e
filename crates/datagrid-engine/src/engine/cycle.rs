//! Circular dependency detection for formula columns.
//!
//! Formula columns declare the columns they read. A declaration such as
//! `total -> subtotal -> total` could never be evaluated, so the registry
//! rejects it up front with a depth-first search.

use std::collections::{HashMap, HashSet};

/// Detect circular dependencies starting from a column.
/// Returns Some(cycle_path) if a cycle is found, None otherwise.
pub fn detect_cycle(start: &str, deps: &HashMap<String, Vec<String>>) -> Option<Vec<String>> {
    let mut visiting = HashSet::new();
    let mut path = Vec::new();

    if detect_cycle_dfs(start, deps, &mut visiting, &mut path) {
        Some(path)
    } else {
        None
    }
}

fn detect_cycle_dfs(
    current: &str,
    deps: &HashMap<String, Vec<String>>,
    visiting: &mut HashSet<String>,
    path: &mut Vec<String>,
) -> bool {
    if visiting.contains(current) {
        path.push(current.to_string());
        return true;
    }

    let Some(next) = deps.get(current) else {
        return false;
    };

    visiting.insert(current.to_string());
    path.push(current.to_string());

    for dep in next {
        if detect_cycle_dfs(dep, deps, visiting, path) {
            return true;
        }
    }

    path.pop();
    visiting.remove(current);
    false
}
