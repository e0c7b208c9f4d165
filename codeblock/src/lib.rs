//! The textual code block of a dataflow graph: turns the block's source into
//! input and output ports and keeps existing wires attached across edits.

pub mod analyzer;
pub mod controller;
pub mod error;
pub mod graph;
pub mod host;
pub mod normalize;
pub mod ports;
pub mod reconcile;
pub mod statement;
pub mod transaction;
pub mod variable;

pub use controller::{BlockState, BlockStatus, CodeBlock, Discard, Reconnection};
pub use error::CodeBlockError;
pub use host::{BlockHost, BlockLangParser, PortSide, SourceParser};
pub use ports::{PortLayout, PortPlan, PortSpec};
pub use reconcile::{MatchKey, MatchPhase, RestoreReport};
pub use statement::{Statement, StatementKind};
pub use variable::VariableRef;
