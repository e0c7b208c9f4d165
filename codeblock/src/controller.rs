use std::fmt;

use blocklang::{Node, is_synthetic_temporary};
use log::{Level, Log, Metadata, Record};
use serde::{Deserialize, Serialize};

use crate::analyzer::analyze;
use crate::error::CodeBlockError;
use crate::host::{BlockHost, BlockLangParser, PortSide, SourceParser};
use crate::normalize::normalize;
use crate::ports::{self, PortLayout, PortPlan, PortSpec};
use crate::reconcile::{ConnectionSnapshot, RestoreReport};
use crate::statement::Statement;
use crate::transaction::{TransactionGuard, UndoRecorder, UndoStep, Untracked};

/// Description of the undo entry an edit creates.
pub const EDIT_DESCRIPTION: &str = "Edit code block";

const LOG_TARGET: &str = "codeblock";

#[derive(Debug, Clone, PartialEq)]
pub enum BlockStatus {
    Ready,
    /// The last edit failed; the message is shown to the user.
    Error(String),
}

/// The persisted part of a block: its raw text and whether the editor should
/// take focus when the block is loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockState {
    pub code: String,
    #[serde(default)]
    pub should_focus: bool,
}

/// [`Log`] that drops every record. Blocks built with [`CodeBlock::new`] log
/// nowhere; hand a logger to [`CodeBlock::with_parts`] to see their records.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl Log for Discard {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        false
    }

    fn log(&self, _record: &Record<'_>) {}

    fn flush(&self) {}
}

/// How the wires fared in the last rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconnection {
    pub inputs: RestoreReport,
    pub outputs: RestoreReport,
}

/// A textual code block: its source, its analysis, and the ports it exposes.
pub struct CodeBlock {
    code: String,
    should_focus: bool,
    statements: Vec<Statement>,
    free_identifiers: Vec<String>,
    inputs: Vec<PortSpec>,
    outputs: Vec<PortSpec>,
    status: BlockStatus,
    reconnection: Reconnection,
    layout: PortLayout,
    parser: Box<dyn SourceParser>,
    logger: Box<dyn Log>,
}

impl Default for CodeBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeBlock {
    pub fn new() -> Self {
        Self::with_parts(Box::new(BlockLangParser), Box::new(Discard), PortLayout::default())
    }

    pub fn with_parts(parser: Box<dyn SourceParser>, logger: Box<dyn Log>, layout: PortLayout) -> Self {
        CodeBlock {
            code: String::new(),
            should_focus: false,
            statements: Vec::new(),
            free_identifiers: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            status: BlockStatus::Ready,
            reconnection: Reconnection::default(),
            layout,
            parser,
            logger,
        }
    }

    /// The raw text as last entered.
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn free_identifiers(&self) -> &[String] {
        &self.free_identifiers
    }

    pub fn input_ports(&self) -> &[PortSpec] {
        &self.inputs
    }

    pub fn output_ports(&self) -> &[PortSpec] {
        &self.outputs
    }

    pub fn status(&self) -> &BlockStatus {
        &self.status
    }

    pub fn is_error(&self) -> bool {
        matches!(self.status, BlockStatus::Error(_))
    }

    pub fn last_reconnection(&self) -> Reconnection {
        self.reconnection
    }

    pub fn should_focus(&self) -> bool {
        self.should_focus
    }

    pub fn set_should_focus(&mut self, should_focus: bool) {
        self.should_focus = should_focus;
    }

    pub fn state(&self) -> BlockState {
        BlockState {
            code: self.code.clone(),
            should_focus: self.should_focus,
        }
    }

    /// Replace the block's text and rebuild its ports inside one undo group.
    ///
    /// On error the block is left in [`BlockStatus::Error`] with no ports; the
    /// change is still committed and the undo group still closed.
    pub fn set_code<H, U>(&mut self, text: &str, host: &mut H, undo: &mut U) -> Result<(), CodeBlockError>
    where
        H: BlockHost,
        U: UndoRecorder + ?Sized,
    {
        let mut transaction = TransactionGuard::begin(undo, EDIT_DESCRIPTION);
        self.rebuild(text, host, &mut transaction)
    }

    /// Load persisted state. Runs the same pipeline as an edit but leaves the
    /// undo history alone.
    pub fn restore<H: BlockHost>(&mut self, state: &BlockState, host: &mut H) -> Result<(), CodeBlockError> {
        self.should_focus = state.should_focus;
        let mut untracked = Untracked;
        let mut transaction = TransactionGuard::begin(&mut untracked, EDIT_DESCRIPTION);
        self.rebuild(&state.code, host, &mut transaction)
    }

    /// The statements to run for this block, preceded by one assignment per
    /// free identifier binding it to the matching input value.
    pub fn bind_inputs(&self, values: Vec<Node>) -> Result<Vec<Node>, CodeBlockError> {
        if values.len() != self.free_identifiers.len() {
            return Err(CodeBlockError::MissingInputs {
                expected: self.free_identifiers.len(),
                supplied: values.len(),
            });
        }
        let parsed = self.parser.parse(&normalize(&self.code)).map_err(syntax_error)?;

        let mut nodes: Vec<Node> = self
            .free_identifiers
            .iter()
            .zip(values)
            .map(|(name, value)| Node::assign(name.clone(), value, 0))
            .collect();
        nodes.extend(parsed.nodes);
        Ok(nodes)
    }

    fn rebuild<H, U>(
        &mut self,
        text: &str,
        host: &mut H,
        transaction: &mut TransactionGuard<'_, U>,
    ) -> Result<(), CodeBlockError>
    where
        H: BlockHost,
        U: UndoRecorder + ?Sized,
    {
        let previous = std::mem::replace(&mut self.code, text.to_string());
        transaction.record(UndoStep::CodeChanged {
            previous,
            current: text.to_string(),
        });

        let normalized = normalize(text);
        self.log(Level::Debug, format_args!("normalized source: {:?}", normalized));

        let inputs_before = ConnectionSnapshot::capture(&self.inputs, |port| host.endpoints(PortSide::Input, port));
        let outputs_before = ConnectionSnapshot::capture(&self.outputs, |port| host.endpoints(PortSide::Output, port));

        let result = self.analyze(&normalized, host);
        let plan = match &result {
            Ok(plan) => {
                self.status = BlockStatus::Ready;
                plan.clone()
            }
            Err(error) => {
                self.enter_error(error);
                PortPlan::default()
            }
        };

        self.inputs = plan.inputs;
        self.outputs = plan.outputs;
        host.set_input_ports(self.inputs.clone());
        host.set_output_ports(self.outputs.clone());
        host.commit_ports();
        transaction.record(UndoStep::PortsReplaced {
            inputs: self.inputs.len(),
            outputs: self.outputs.len(),
        });

        let inputs = inputs_before.restore(&self.inputs, |port, endpoint, phase| {
            host.link(PortSide::Input, port, endpoint);
            transaction.record(UndoStep::Relinked {
                side: PortSide::Input,
                port,
                phase,
            });
        });
        let outputs = outputs_before.restore(&self.outputs, |port, endpoint, phase| {
            host.link(PortSide::Output, port, endpoint);
            transaction.record(UndoStep::Relinked {
                side: PortSide::Output,
                port,
                phase,
            });
        });
        self.reconnection = Reconnection { inputs, outputs };

        let dropped = inputs.dropped + outputs.dropped;
        if dropped > 0 {
            self.log(Level::Debug, format_args!("{} wire(s) could not be reconnected", dropped));
        }
        self.log(
            Level::Info,
            format_args!(
                "code block rebuilt: {} input(s), {} output(s), {} wire(s) reconnected",
                self.inputs.len(),
                self.outputs.len(),
                inputs.relinked() + outputs.relinked()
            ),
        );

        result.map(|_| ())
    }

    /// Parse, analyze, check for redefinitions, and plan the ports.
    fn analyze<H: BlockHost>(&mut self, normalized: &str, host: &H) -> Result<PortPlan, CodeBlockError> {
        let parsed = self.parser.parse(normalized).map_err(syntax_error)?;

        let statements = parsed.nodes.iter().map(analyze).collect::<Result<Vec<_>, _>>()?;
        self.log(Level::Debug, format_args!("analyzed {} statement(s)", statements.len()));

        let defined: Vec<String> = statements
            .iter()
            .flat_map(|statement| statement.defined_variables())
            .map(|variable| variable.name())
            .filter(|name| !is_synthetic_temporary(name))
            .map(str::to_string)
            .collect();
        if let Some(name) = host.find_redefinition(&defined) {
            return Err(CodeBlockError::Redefinition { name });
        }

        let plan = ports::plan(&statements, &parsed.free_identifiers, &self.layout);
        self.statements = statements;
        self.free_identifiers = parsed.free_identifiers;
        Ok(plan)
    }

    fn enter_error(&mut self, error: &CodeBlockError) {
        self.statements.clear();
        self.free_identifiers.clear();
        self.status = BlockStatus::Error(error.to_string());
        if error.is_recoverable() {
            self.log(Level::Warn, format_args!("code block error: {}", error));
        } else {
            self.log(Level::Error, format_args!("code block analysis failed: {}", error));
        }
    }

    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        self.logger.log(&Record::builder().level(level).target(LOG_TARGET).args(args).build());
    }
}

fn syntax_error(errors: Vec<blocklang::ParseError>) -> CodeBlockError {
    let messages: Vec<&str> = errors.iter().map(|error| error.message.as_str()).collect();
    CodeBlockError::Syntax(messages.join("\n"))
}
