//! What a code block needs from the graph it lives in.

use blocklang::{ParseError, ParsedBlock};
use serde::{Deserialize, Serialize};

use crate::ports::PortSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortSide {
    Input,
    Output,
}

/// The graph around one code block: its port registration, its wires, and
/// the names other blocks define.
pub trait BlockHost {
    /// The far end of a wire attached to one of this block's ports.
    type Endpoint;

    /// The first of `names` already defined by another block, if any.
    fn find_redefinition(&self, names: &[String]) -> Option<String>;

    /// Endpoints wired to the given port of the currently committed set.
    fn endpoints(&self, side: PortSide, port: usize) -> Vec<Self::Endpoint>;

    fn set_input_ports(&mut self, ports: Vec<PortSpec>);

    fn set_output_ports(&mut self, ports: Vec<PortSpec>);

    /// Replace the visible ports with the ones last set. Wires attached to the
    /// old ports are torn down.
    fn commit_ports(&mut self);

    fn link(&mut self, side: PortSide, port: usize, endpoint: Self::Endpoint);
}

/// Turns normalized block text into AST nodes and free identifiers.
pub trait SourceParser {
    fn parse(&self, source: &str) -> Result<ParsedBlock, Vec<ParseError>>;
}

/// [`SourceParser`] backed by the `blocklang` parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockLangParser;

impl SourceParser for BlockLangParser {
    fn parse(&self, source: &str) -> Result<ParsedBlock, Vec<ParseError>> {
        blocklang::Parser::new(source.to_string(), 0).parse()
    }
}
