use codeblock::analyzer::analyze;
use codeblock::ports::{self, PLACEHOLDER_LABEL, requires_output_port};
use codeblock::{PortLayout, PortPlan, PortSpec, Statement};

fn plan_with(source: &str, layout: &PortLayout) -> PortPlan {
    let block = blocklang::Parser::new(source.to_string(), 0)
        .parse()
        .expect("parse failed");
    let statements: Vec<Statement> = block
        .nodes
        .iter()
        .map(|node| analyze(node).expect("analysis failed"))
        .collect();
    ports::plan(&statements, &block.free_identifiers, layout)
}

fn plan(source: &str) -> PortPlan {
    plan_with(source, &PortLayout::default())
}

fn outputs(plan: &PortPlan) -> Vec<(&str, Option<f64>)> {
    plan.outputs
        .iter()
        .map(|port| (port.display_name.as_str(), port.vertical_offset))
        .collect()
}

fn input_names(plan: &PortPlan) -> Vec<&str> {
    plan.inputs.iter().map(|port| port.tooltip_key.as_str()).collect()
}

#[test]
fn empty_block_has_no_ports() {
    assert!(plan("").is_empty());
}

#[test]
fn free_identifier_becomes_input() {
    let plan = plan("y = x + 1;");
    assert_eq!(input_names(&plan), vec!["x"]);
    assert_eq!(plan.inputs[0].display_name, "x");
    assert_eq!(plan.inputs[0].vertical_offset, None);
    assert_eq!(outputs(&plan), vec![("y", Some(8.0))]);
}

#[test]
fn later_definition_shadows_earlier_output() {
    let plan = plan("a = 1;\nb = 2;\na = 3;");
    assert_eq!(outputs(&plan), vec![("b", Some(28.0)), ("a", Some(0.0))]);
}

#[test]
fn bare_expression_gets_placeholder_output() {
    let plan = plan("x + 1;");
    assert_eq!(input_names(&plan), vec!["x"]);
    assert_eq!(plan.outputs.len(), 1);
    let port = &plan.outputs[0];
    assert_eq!(port.display_name, PLACEHOLDER_LABEL);
    assert!(blocklang::is_synthetic_temporary(&port.tooltip_key));
    assert!(port.is_placeholder());
}

#[test]
fn outputs_are_aligned_to_statement_lines() {
    let plan = plan("a = 1;\n\n\nb = 2;\nc = 3;");
    assert_eq!(
        outputs(&plan),
        vec![("a", Some(8.0)), ("b", Some(40.0)), ("c", Some(0.0))]
    );
}

#[test]
fn statements_sharing_a_line_stack_without_margin() {
    let plan = plan("a = 1; b = 2;\nc = 3;");
    assert_eq!(
        outputs(&plan),
        vec![("a", Some(8.0)), ("b", Some(0.0)), ("c", Some(0.0))]
    );
}

#[test]
fn layout_is_configurable() {
    let layout = PortLayout {
        line_height: 10.0,
        initial_offset: 2.0,
    };
    let plan = plan_with("\na = 1;\n\nb = 2;", &layout);
    assert_eq!(outputs(&plan), vec![("a", Some(12.0)), ("b", Some(10.0))]);
}

#[test]
fn function_declarations_have_no_output() {
    let plan = plan("def f(v) = v * 2;\ny = f(x);");
    assert_eq!(outputs(&plan), vec![("y", Some(28.0))]);
    assert_eq!(input_names(&plan), vec!["x"]);
}

#[test]
fn chained_assignment_is_labelled_by_first_target() {
    let plan = plan("a = b = 1;");
    assert_eq!(outputs(&plan), vec![("a", Some(8.0))]);
}

#[test]
fn long_input_names_are_truncated() {
    let name = "a_very_long_input_variable_name";
    let port = PortSpec::input(name);
    assert_eq!(port.display_name, "a_very_long_input_var...");
    assert_eq!(port.display_name.chars().count(), 24);
    assert_eq!(port.tooltip_key, name);

    let exact = "exactly_twenty_four_char";
    assert_eq!(PortSpec::input(exact).display_name, exact);
}

#[test]
fn duplicate_free_identifiers_make_one_input() {
    let inputs = ports::plan_inputs(&["a".to_string(), "b".to_string(), "a".to_string()]);
    let names: Vec<&str> = inputs.iter().map(|port| port.tooltip_key.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn output_requirement_per_statement() {
    let block = blocklang::Parser::new("a = 1;\nb = a;\na = 2;".to_string(), 0)
        .parse()
        .expect("parse failed");
    let statements: Vec<Statement> = block.nodes.iter().map(|n| analyze(n).expect("analysis failed")).collect();
    assert!(!requires_output_port(&statements, 0));
    assert!(requires_output_port(&statements, 1));
    assert!(requires_output_port(&statements, 2));
}

#[test]
fn layout_reads_from_toml() {
    #[derive(serde::Deserialize)]
    struct Config {
        layout: PortLayout,
    }
    let config: Config = toml::from_str("[layout]\nline_height = 16.0\n").expect("invalid config");
    assert_eq!(config.layout.line_height, 16.0);
    assert_eq!(config.layout.initial_offset, 8.0);
}
