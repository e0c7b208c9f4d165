use std::collections::HashSet;

use crate::ast::Node;
use crate::parser::MAX_PARSE_DEPTH;
use crate::synthetic::is_synthetic_temporary;

/// Names referenced by top-level statements that no top-level statement
/// defines, in order of first reference. Function bodies have their own scope
/// and contribute nothing. Expressions deeper than [`MAX_PARSE_DEPTH`], which
/// the parser never produces, are only visited down to that depth.
pub fn free_identifiers(nodes: &[Node]) -> Vec<String> {
    let mut defined = HashSet::new();
    for node in nodes {
        match node {
            Node::Assignment(assignment) => {
                defined.insert(assignment.target.name.as_str());
                let mut value = assignment.value.as_ref();
                while let Node::Assignment(inner) = value {
                    defined.insert(inner.target.name.as_str());
                    value = inner.value.as_ref();
                }
            }
            Node::FunctionDef(function) => {
                defined.insert(function.name.as_str());
            }
            _ => {}
        }
    }

    let mut free = Vec::new();
    for node in nodes {
        if let Node::Assignment(assignment) = node {
            let mut value = assignment.value.as_ref();
            while let Node::Assignment(inner) = value {
                value = inner.value.as_ref();
            }
            collect(value, 1, &defined, &mut free);
        }
    }
    free
}

fn collect(node: &Node, depth: usize, defined: &HashSet<&str>, free: &mut Vec<String>) {
    if depth > MAX_PARSE_DEPTH {
        return;
    }
    let depth = depth + 1;
    match node {
        Node::Number(_) | Node::String(_) | Node::Boolean(_) | Node::Null => {}
        Node::Identifier(id) => {
            if !defined.contains(id.name.as_str())
                && !is_synthetic_temporary(&id.name)
                && !free.contains(&id.name)
            {
                free.push(id.name.clone());
            }
            if let Some(index) = &id.index {
                collect(index, depth, defined, free);
            }
        }
        Node::List(items) => {
            for item in items {
                collect(item, depth, defined, free);
            }
        }
        Node::Index { base, index } => {
            collect(base, depth, defined, free);
            collect(index, depth, defined, free);
        }
        Node::Call { args, .. } => {
            for arg in args {
                collect(arg, depth, defined, free);
            }
        }
        Node::DotCall { target, call } => {
            collect(target, depth, defined, free);
            collect(call, depth, defined, free);
        }
        Node::Conditional {
            condition,
            true_branch,
            false_branch,
        } => {
            collect(condition, depth, defined, free);
            collect(true_branch, depth, defined, free);
            collect(false_branch, depth, defined, free);
        }
        Node::Range { start, end, step } => {
            collect(start, depth, defined, free);
            collect(end, depth, defined, free);
            if let Some(step) = step {
                collect(step, depth, defined, free);
            }
        }
        Node::Assignment(assignment) => collect(&assignment.value, depth, defined, free),
        Node::FunctionDef(_) => {}
    }
}
