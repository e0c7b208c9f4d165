use blocklang::is_synthetic_temporary;
use serde::{Deserialize, Serialize};

use crate::statement::Statement;

/// Labels longer than this are truncated.
pub const MAX_LABEL_LEN: usize = 24;
/// Characters kept from a truncated label, before [`ELLIPSIS`].
pub const TRUNCATED_LABEL_LEN: usize = 21;
pub const ELLIPSIS: &str = "...";
/// Label of an output whose variable is a synthetic temporary.
pub const PLACEHOLDER_LABEL: &str = ">";

/// One port to be registered on the block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSpec {
    pub display_name: String,
    /// Stable identity of the port, used to carry wires across rebuilds.
    pub tooltip_key: String,
    /// Distance from the previous output port. Inputs are not aligned.
    pub vertical_offset: Option<f64>,
}

impl PortSpec {
    pub fn input(name: &str) -> Self {
        PortSpec {
            display_name: truncate_label(name),
            tooltip_key: name.to_string(),
            vertical_offset: None,
        }
    }

    pub fn output(name: &str, vertical_offset: f64) -> Self {
        PortSpec {
            display_name: output_label(name).to_string(),
            tooltip_key: name.to_string(),
            vertical_offset: Some(vertical_offset),
        }
    }

    /// Whether the port stands for an unnamed statement result.
    pub fn is_placeholder(&self) -> bool {
        self.tooltip_key == PLACEHOLDER_LABEL || is_synthetic_temporary(&self.tooltip_key)
    }
}

/// Vertical spacing of output ports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortLayout {
    /// Height of one source line, in the host's units.
    pub line_height: f64,
    /// Extra offset applied above the first output port only.
    pub initial_offset: f64,
}

impl Default for PortLayout {
    fn default() -> Self {
        PortLayout {
            line_height: 20.0,
            initial_offset: 8.0,
        }
    }
}

/// The ports a block should expose, in display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortPlan {
    pub inputs: Vec<PortSpec>,
    pub outputs: Vec<PortSpec>,
}

impl PortPlan {
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }
}

pub fn plan(statements: &[Statement], free_identifiers: &[String], layout: &PortLayout) -> PortPlan {
    PortPlan {
        inputs: plan_inputs(free_identifiers),
        outputs: plan_outputs(statements, layout),
    }
}

/// One input per distinct free identifier, in first-seen order.
pub fn plan_inputs(free_identifiers: &[String]) -> Vec<PortSpec> {
    let mut inputs: Vec<PortSpec> = Vec::with_capacity(free_identifiers.len());
    for name in free_identifiers {
        if !inputs.iter().any(|port| port.tooltip_key == *name) {
            inputs.push(PortSpec::input(name));
        }
    }
    inputs
}

/// One output per statement whose definitions are not shadowed, aligned to
/// the statement's first line.
pub fn plan_outputs(statements: &[Statement], layout: &PortLayout) -> Vec<PortSpec> {
    let mut outputs = Vec::new();
    let mut cursor = 1;
    let mut initial_offset = layout.initial_offset;

    for (index, statement) in statements.iter().enumerate() {
        if !requires_output_port(statements, index) {
            continue;
        }
        let Some(first) = statement.first_defined() else {
            continue;
        };

        let margin = if statement.start_line >= cursor {
            let margin = (statement.start_line - cursor) as f64 * layout.line_height;
            cursor = statement.start_line + 1;
            margin
        } else {
            // overlapping lines, e.g. several statements on one line
            cursor += 1;
            0.0
        };

        outputs.push(PortSpec::output(first.name(), margin + initial_offset));
        initial_offset = 0.0;
    }

    outputs
}

/// Statement `index` needs an output port when it defines something and no
/// later top-level statement redefines any of its names.
pub fn requires_output_port(statements: &[Statement], index: usize) -> bool {
    let statement = &statements[index];
    !statement.defined_variables.is_empty()
        && !statement.defined_variables.iter().any(|variable| {
            statements[index + 1..]
                .iter()
                .any(|later| later.defines(variable.name()))
        })
}

pub fn output_label(name: &str) -> &str {
    if is_synthetic_temporary(name) {
        PLACEHOLDER_LABEL
    } else {
        name
    }
}

fn truncate_label(name: &str) -> String {
    if name.chars().count() > MAX_LABEL_LEN {
        let mut label: String = name.chars().take(TRUNCATED_LABEL_LEN).collect();
        label.push_str(ELLIPSIS);
        label
    } else {
        name.to_string()
    }
}
