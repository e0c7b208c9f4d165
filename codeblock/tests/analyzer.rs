use blocklang::ast::{FunctionDef, Node};
use blocklang::{MAX_PARSE_DEPTH, is_synthetic_temporary};
use codeblock::analyzer::{MAX_NESTING_DEPTH, analyze};
use codeblock::{CodeBlockError, Statement, StatementKind};

fn analyze_source(source: &str) -> Vec<Statement> {
    let block = blocklang::Parser::new(source.to_string(), 0)
        .parse()
        .expect("parse failed");
    block
        .nodes
        .iter()
        .map(|node| analyze(node).expect("analysis failed"))
        .collect()
}

fn one(source: &str) -> Statement {
    let mut statements = analyze_source(source);
    assert_eq!(statements.len(), 1, "{:#?}", statements);
    statements.remove(0)
}

fn positions(statement: &Statement) -> Vec<(&str, usize, Option<usize>)> {
    statement
        .referenced_variables()
        .iter()
        .map(|v| (v.name(), v.row(), v.start_column()))
        .collect()
}

#[test]
fn classifies_statements() {
    let cases = [
        ("a = 1;", StatementKind::Expression),
        ("a = b + 1;", StatementKind::Expression),
        ("5;", StatementKind::Literal),
        ("\"text\";", StatementKind::Literal),
        ("{1, 2};", StatementKind::Collection),
        ("x;", StatementKind::AssignmentVar),
        ("x + 1;", StatementKind::None),
        ("f(x);", StatementKind::None),
        ("true;", StatementKind::None),
        ("def f(x) = x;", StatementKind::FuncDeclaration),
    ];
    for (source, kind) in cases {
        assert_eq!(one(source).kind(), kind, "{}", source);
    }
}

#[test]
fn user_assignment_defines_target() {
    let statement = one("total = a + b;");
    let defined = statement.defined_variables();
    assert_eq!(defined.len(), 1);
    assert_eq!(defined[0].name(), "total");
    assert_eq!((defined[0].row(), defined[0].start_column()), (1, Some(1)));
    assert_eq!(defined[0].end_column(), Some(6));
    assert_eq!(positions(&statement), vec![("a", 1, Some(9)), ("b", 1, Some(13))]);
}

#[test]
fn chained_assignment_defines_every_target() {
    let statement = one("a = b = c;");
    let names: Vec<&str> = statement.defined_variables().iter().map(|v| v.name()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(positions(&statement), vec![("c", 1, Some(9))]);
}

#[test]
fn repeated_chain_target_is_defined_once() {
    let statement = one("a = a = 1;");
    assert_eq!(statement.defined_variables().len(), 1);
}

#[test]
fn synthetic_definition_has_no_column() {
    let statement = one("x + 1;");
    let defined = &statement.defined_variables()[0];
    assert!(is_synthetic_temporary(defined.name()));
    assert_eq!(defined.row(), 1);
    assert_eq!(defined.start_column(), None);
}

#[test]
fn bare_expression_columns_are_corrected_on_first_line_only() {
    let statement = one("x +\n  y;");
    assert_eq!(positions(&statement), vec![("x", 1, Some(1)), ("y", 2, Some(3))]);
}

#[test]
fn correction_applies_to_later_statements_on_a_line() {
    let statements = analyze_source("a = 1; b;");
    assert_eq!(positions(&statements[1]), vec![("b", 1, Some(8))]);
}

#[test]
fn earlier_bare_expressions_do_not_shift_columns() {
    let statements = analyze_source("x; y;");
    assert_eq!(positions(&statements[0]), vec![("x", 1, Some(1))]);
    assert_eq!(positions(&statements[1]), vec![("y", 1, Some(4))]);

    let statements = analyze_source("x; a = y;");
    assert_eq!(positions(&statements[1]), vec![("y", 1, Some(8))]);

    let statements = analyze_source("x; y; z + w;");
    assert_eq!(positions(&statements[2]), vec![("z", 1, Some(7)), ("w", 1, Some(11))]);
}

#[test]
fn user_assignments_are_not_corrected() {
    let statement = one("y = x;");
    assert_eq!(positions(&statement), vec![("x", 1, Some(5))]);
}

#[test]
fn references_include_index_expressions() {
    let statement = one("v = a[i] + m[0][j];");
    let names: Vec<&str> = statement.referenced_variables().iter().map(|v| v.name()).collect();
    assert_eq!(names, vec!["a", "i", "m", "j"]);
}

#[test]
fn dotted_call_references_only_arguments() {
    let statement = one("p = pt.Translate(dx, dy);");
    let names: Vec<&str> = statement.referenced_variables().iter().map(|v| v.name()).collect();
    assert_eq!(names, vec!["dx", "dy"]);
}

#[test]
fn function_declaration_recurses_into_body() {
    let statement = one("def f(x)\n{\n    y = x * 2;\n    return = y;\n}");
    assert_eq!(statement.kind(), StatementKind::FuncDeclaration);
    assert_eq!(statement.start_line(), 1);
    assert_eq!(statement.end_line(), 5);
    assert!(statement.defined_variables().is_empty());
    assert!(statement.referenced_variables().is_empty());

    let body = statement.sub_statements();
    assert_eq!(body.len(), 2);
    assert_eq!(body[0].kind(), StatementKind::Expression);
    assert_eq!(body[0].defined_variables()[0].name(), "y");
    assert_eq!(body[0].start_line(), 3);
    assert_eq!(body[1].defined_variables()[0].name(), "return");
}

#[test]
fn nested_function_declarations() {
    let statement = one("def outer(a) {\n  def inner(b) = b + 1;\n  return = inner(a);\n}");
    let body = statement.sub_statements();
    assert_eq!(body[0].kind(), StatementKind::FuncDeclaration);
    assert_eq!(body[0].sub_statements().len(), 1);
}

#[test]
fn statement_lines_span_the_source() {
    let statements = analyze_source("a = 1;\n\nb = a +\n    2;");
    assert_eq!((statements[0].start_line(), statements[0].end_line()), (1, 1));
    assert_eq!((statements[1].start_line(), statements[1].end_line()), (3, 4));
}

#[test]
fn bare_expression_node_is_structural_error() {
    let node = Node::Number(1.0);
    assert_eq!(
        analyze(&node),
        Err(CodeBlockError::Structural { shape: "number literal" })
    );
    assert!(!CodeBlockError::Structural { shape: "x" }.is_recoverable());
}

#[test]
fn structural_error_inside_function_body() {
    let node = Node::FunctionDef(FunctionDef {
        name: "f".to_string(),
        params: Vec::new(),
        body: vec![Node::Null],
        start_line: 1,
        end_line: 1,
        body_end_line: None,
    });
    assert!(matches!(analyze(&node), Err(CodeBlockError::Structural { .. })));
}

#[test]
fn deep_nesting_is_rejected() {
    let mut node = Node::assign("x", Node::Number(1.0), 1);
    for depth in 0..=MAX_NESTING_DEPTH {
        node = Node::FunctionDef(FunctionDef {
            name: format!("f{}", depth),
            params: Vec::new(),
            body: vec![node],
            start_line: 1,
            end_line: 1,
            body_end_line: None,
        });
    }
    assert_eq!(
        analyze(&node),
        Err(CodeBlockError::TooDeep { limit: MAX_NESTING_DEPTH })
    );
}

#[test]
fn nested_functions_from_source_hit_the_depth_limit() {
    let depth = MAX_NESTING_DEPTH + 36;
    let mut source = String::new();
    for i in 0..depth {
        source.push_str(&format!("def f{}() {{\n", i));
    }
    source.push_str("x = 1;\n");
    source.push_str(&"}\n".repeat(depth));

    let block = blocklang::Parser::new(source, 0).parse().expect("parse failed");
    assert_eq!(
        analyze(&block.nodes[0]),
        Err(CodeBlockError::TooDeep { limit: MAX_NESTING_DEPTH })
    );
}

#[test]
fn deep_expressions_are_rejected() {
    let mut value = Node::Identifier(blocklang::ast::Identifier::new("x", 1, 5));
    for _ in 0..MAX_PARSE_DEPTH * 2 {
        value = Node::Call {
            name: "f".to_string(),
            args: vec![value],
        };
    }
    let node = Node::assign("y", value, 1);
    assert_eq!(
        analyze(&node),
        Err(CodeBlockError::TooDeep { limit: MAX_PARSE_DEPTH })
    );
}
