use std::sync::{Arc, Mutex};

use blocklang::{Node, ParseError, ParsedBlock};
use codeblock::graph::{Endpoint, MemoryGraph};
use codeblock::transaction::{UndoLog, UndoRecorder, UndoStep};
use codeblock::{
    BlockState, BlockStatus, CodeBlock, CodeBlockError, MatchPhase, PortLayout, PortSide, SourceParser,
};
use log::Level;

type Records = Arc<Mutex<Vec<(Level, String, String)>>>;

struct CaptureLog(Records);

impl log::Log for CaptureLog {
    fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        self.0.lock().unwrap().push((
            record.level(),
            record.target().to_string(),
            record.args().to_string(),
        ));
    }

    fn flush(&self) {}
}

fn block_with_log(parser: Box<dyn SourceParser>) -> (CodeBlock, Records) {
    let records = Records::default();
    let block = CodeBlock::with_parts(parser, Box::new(CaptureLog(records.clone())), PortLayout::default());
    (block, records)
}

fn names(ports: &[codeblock::PortSpec]) -> Vec<&str> {
    ports.iter().map(|port| port.display_name.as_str()).collect()
}

#[test]
fn edit_builds_ports_in_one_undo_group() {
    let mut block = CodeBlock::new();
    let mut graph = MemoryGraph::new();
    let mut undo = UndoLog::new();

    block.set_code("y = x + 1", &mut graph, &mut undo).unwrap();

    assert_eq!(block.status(), &BlockStatus::Ready);
    assert_eq!(block.code(), "y = x + 1");
    assert_eq!(block.free_identifiers(), ["x"]);
    assert_eq!(block.statements().len(), 1);
    assert_eq!(names(block.input_ports()), vec!["x"]);
    assert_eq!(names(block.output_ports()), vec!["y"]);
    assert_eq!(graph.inputs(), block.input_ports());
    assert_eq!(graph.outputs(), block.output_ports());
    assert_eq!(graph.commits(), 1);

    assert!(!undo.is_open());
    assert_eq!(undo.groups().len(), 1);
    let group = &undo.groups()[0];
    assert_eq!(group.description, "Edit code block");
    assert_eq!(
        group.steps,
        vec![
            UndoStep::CodeChanged {
                previous: String::new(),
                current: "y = x + 1".to_string()
            },
            UndoStep::PortsReplaced { inputs: 1, outputs: 1 },
        ]
    );
}

#[test]
fn empty_code_has_no_ports() {
    let mut block = CodeBlock::new();
    let mut graph = MemoryGraph::new();
    block.set_code("  \n", &mut graph, &mut UndoLog::new()).unwrap();
    assert_eq!(block.status(), &BlockStatus::Ready);
    assert!(block.input_ports().is_empty());
    assert!(block.output_ports().is_empty());
    assert_eq!(graph.commits(), 1);
}

#[test]
fn syntax_error_leaves_committed_empty_error_state() {
    let mut block = CodeBlock::new();
    let mut graph = MemoryGraph::new();
    let mut undo = UndoLog::new();
    block.set_code("a = 1;\nb = a;", &mut graph, &mut undo).unwrap();
    graph.connect(PortSide::Output, 0, Endpoint::new("sink", 0));

    let result = block.set_code("a = ;\nb = a;", &mut graph, &mut undo);

    assert!(matches!(result, Err(CodeBlockError::Syntax(_))));
    assert!(block.is_error());
    assert!(block.statements().is_empty());
    assert!(block.free_identifiers().is_empty());
    assert!(block.input_ports().is_empty());
    assert!(block.output_ports().is_empty());
    assert!(graph.outputs().is_empty());
    assert!(graph.wires().is_empty());
    assert_eq!(graph.commits(), 2);
    assert_eq!(block.last_reconnection().outputs.dropped, 1);

    // the failed edit still produced exactly one closed undo entry
    assert!(!undo.is_open());
    assert_eq!(undo.groups().len(), 2);
}

#[test]
fn fixing_the_error_restores_ready_state() {
    let mut block = CodeBlock::new();
    let mut graph = MemoryGraph::new();
    let mut undo = UndoLog::new();
    assert!(block.set_code("a = (1;", &mut graph, &mut undo).is_err());
    block.set_code("a = (1);", &mut graph, &mut undo).unwrap();
    assert_eq!(block.status(), &BlockStatus::Ready);
    assert_eq!(names(block.output_ports()), vec!["a"]);
}

#[test]
fn deeply_nested_code_is_a_syntax_error() {
    let mut block = CodeBlock::new();
    let mut graph = MemoryGraph::new();
    let mut undo = UndoLog::new();
    let depth = 20_000;
    let code = format!("a = {}1{};", "(".repeat(depth), ")".repeat(depth));

    match block.set_code(&code, &mut graph, &mut undo) {
        Err(CodeBlockError::Syntax(message)) => assert!(message.contains("nesting too deep"), "{}", message),
        other => panic!("expected a syntax error, got {:?}", other),
    }
    assert!(block.is_error());
    assert!(!undo.is_open());
    assert_eq!(undo.groups().len(), 1);
}

#[test]
fn redefinition_is_reported_by_name() {
    let mut block = CodeBlock::new();
    let mut graph = MemoryGraph::new();
    graph.define_elsewhere("y");

    let result = block.set_code("x = 1;\ny = 2;", &mut graph, &mut UndoLog::new());

    assert_eq!(result, Err(CodeBlockError::Redefinition { name: "y".to_string() }));
    assert_eq!(block.status(), &BlockStatus::Error("y is already defined".to_string()));
    assert!(graph.outputs().is_empty());
}

#[test]
fn synthetic_temporaries_are_not_checked_for_redefinition() {
    let mut block = CodeBlock::new();
    let mut graph = MemoryGraph::new();
    graph.define_elsewhere("x");
    // `x` is only read here, and the bare expression's temporary is never shared
    block.set_code("x + 1;", &mut graph, &mut UndoLog::new()).unwrap();
    assert_eq!(names(block.output_ports()), vec![">"]);
}

#[test]
fn output_wires_follow_reordered_statements() {
    let mut block = CodeBlock::new();
    let mut graph = MemoryGraph::new();
    let mut undo = UndoLog::new();
    block.set_code("a = 1;\nb = 2;", &mut graph, &mut undo).unwrap();
    graph.connect(PortSide::Output, 1, Endpoint::new("sink", 3));

    block.set_code("b = 2;\na = 1;", &mut graph, &mut undo).unwrap();

    assert_eq!(names(block.output_ports()), vec!["b", "a"]);
    assert_eq!(graph.wires_at(PortSide::Output, 0), vec![&Endpoint::new("sink", 3)]);
    assert!(graph.wires_at(PortSide::Output, 1).is_empty());
    assert!(undo.groups()[1].steps.contains(&UndoStep::Relinked {
        side: PortSide::Output,
        port: 0,
        phase: MatchPhase::Exact,
    }));
}

#[test]
fn input_wires_follow_their_identifier() {
    let mut block = CodeBlock::new();
    let mut graph = MemoryGraph::new();
    let mut undo = UndoLog::new();
    block.set_code("y = x + w;", &mut graph, &mut undo).unwrap();
    graph.connect(PortSide::Input, 1, Endpoint::new("source", 0));

    block.set_code("y = w * 2;", &mut graph, &mut undo).unwrap();

    assert_eq!(names(block.input_ports()), vec!["w"]);
    assert_eq!(graph.wires_at(PortSide::Input, 0), vec![&Endpoint::new("source", 0)]);
    assert_eq!(block.last_reconnection().inputs.exact, 1);
}

#[test]
fn placeholder_wire_survives_edit_of_expression() {
    let mut block = CodeBlock::new();
    let mut graph = MemoryGraph::new();
    let mut undo = UndoLog::new();
    block.set_code("x + 1;", &mut graph, &mut undo).unwrap();
    graph.connect(PortSide::Output, 0, Endpoint::new("watch", 0));

    block.set_code("x + 2;", &mut graph, &mut undo).unwrap();

    assert_eq!(graph.wires_at(PortSide::Output, 0), vec![&Endpoint::new("watch", 0)]);
}

#[test]
fn restore_creates_no_undo_entry() {
    let mut original = CodeBlock::new();
    let mut graph = MemoryGraph::new();
    original.set_code("y = x;", &mut graph, &mut UndoLog::new()).unwrap();
    original.set_should_focus(true);

    let saved = toml::to_string(&original.state()).unwrap();
    let state: BlockState = toml::from_str(&saved).unwrap();
    assert_eq!(state, BlockState { code: "y = x;".to_string(), should_focus: true });

    let mut restored = CodeBlock::new();
    let mut other = MemoryGraph::new();
    restored.restore(&state, &mut other).unwrap();

    assert!(restored.should_focus());
    assert_eq!(restored.input_ports(), original.input_ports());
    assert_eq!(restored.output_ports(), original.output_ports());
    assert_eq!(other.commits(), 1);
}

#[test]
fn restore_accepts_state_without_focus_flag() {
    let state: BlockState = toml::from_str("code = \"a = 1;\"").unwrap();
    assert!(!state.should_focus);
}

#[test]
fn edit_inside_an_open_group_joins_it() {
    let mut block = CodeBlock::new();
    let mut graph = MemoryGraph::new();
    let mut undo = UndoLog::new();

    undo.begin_group("Paste nodes");
    block.set_code("a = 1;", &mut graph, &mut undo).unwrap();
    assert!(undo.is_open());
    undo.end_group();

    assert_eq!(undo.groups().len(), 1);
    assert_eq!(undo.groups()[0].description, "Paste nodes");
}

#[test]
fn bind_inputs_prepends_assignments() {
    let mut block = CodeBlock::new();
    block.set_code("y = x + n;", &mut MemoryGraph::new(), &mut UndoLog::new()).unwrap();

    let nodes = block.bind_inputs(vec![Node::Number(2.0), Node::Number(3.0)]).unwrap();

    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[0], Node::assign("x", Node::Number(2.0), 0));
    assert_eq!(nodes[1], Node::assign("n", Node::Number(3.0), 0));
    assert!(matches!(&nodes[2], Node::Assignment(assignment) if assignment.target.name == "y"));
}

#[test]
fn bind_inputs_rejects_wrong_count() {
    let mut block = CodeBlock::new();
    block.set_code("y = x;", &mut MemoryGraph::new(), &mut UndoLog::new()).unwrap();
    assert_eq!(
        block.bind_inputs(Vec::new()),
        Err(CodeBlockError::MissingInputs { expected: 1, supplied: 0 })
    );
    assert!(!CodeBlockError::MissingInputs { expected: 1, supplied: 0 }.is_recoverable());
}

#[test]
fn logs_through_injected_logger() {
    let (mut block, records) = block_with_log(Box::new(codeblock::BlockLangParser));
    let mut graph = MemoryGraph::new();
    let mut undo = UndoLog::new();

    block.set_code("a = 1;", &mut graph, &mut undo).unwrap();
    let _ = block.set_code("a = ;", &mut graph, &mut undo);

    let records = records.lock().unwrap();
    assert!(records.iter().all(|(_, target, _)| target == "codeblock"));
    assert!(records.iter().any(|(level, _, message)| *level == Level::Info && message.contains("1 output")));
    assert!(records.iter().any(|(level, _, _)| *level == Level::Warn));
    assert!(!records.iter().any(|(level, _, _)| *level == Level::Error));
}

struct BareNodeParser;

impl SourceParser for BareNodeParser {
    fn parse(&self, _source: &str) -> Result<ParsedBlock, Vec<ParseError>> {
        Ok(ParsedBlock {
            nodes: vec![Node::Number(1.0)],
            free_identifiers: Vec::new(),
            source_id: 0,
        })
    }
}

#[test]
fn structural_error_from_parser_is_logged_as_error() {
    let (mut block, records) = block_with_log(Box::new(BareNodeParser));
    let mut graph = MemoryGraph::new();
    let mut undo = UndoLog::new();

    let result = block.set_code("1;", &mut graph, &mut undo);

    assert_eq!(result, Err(CodeBlockError::Structural { shape: "number literal" }));
    assert!(block.is_error());
    assert!(!undo.is_open());
    let records = records.lock().unwrap();
    assert!(records.iter().any(|(level, _, _)| *level == Level::Error));
}
