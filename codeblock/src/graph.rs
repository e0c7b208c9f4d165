//! An in-memory [`BlockHost`]: one code block's ports and the wires on them.

use serde::{Deserialize, Serialize};

use crate::host::{BlockHost, PortSide};
use crate::ports::PortSpec;

/// A port on some other node of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Endpoint {
    pub node: String,
    pub port: usize,
}

impl Endpoint {
    pub fn new(node: impl Into<String>, port: usize) -> Self {
        Endpoint {
            node: node.into(),
            port,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wire {
    pub side: PortSide,
    pub port: usize,
    pub remote: Endpoint,
}

#[derive(Debug, Default)]
pub struct MemoryGraph {
    /// Names defined by the other blocks of the graph.
    defined_elsewhere: Vec<String>,
    inputs: Vec<PortSpec>,
    outputs: Vec<PortSpec>,
    pending_inputs: Vec<PortSpec>,
    pending_outputs: Vec<PortSpec>,
    wires: Vec<Wire>,
    commits: usize,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define_elsewhere(&mut self, name: impl Into<String>) {
        self.defined_elsewhere.push(name.into());
    }

    /// Wire a remote endpoint to one of the committed ports.
    pub fn connect(&mut self, side: PortSide, port: usize, remote: Endpoint) {
        self.wires.push(Wire { side, port, remote });
    }

    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    pub fn wires_at(&self, side: PortSide, port: usize) -> Vec<&Endpoint> {
        self.wires
            .iter()
            .filter(|wire| wire.side == side && wire.port == port)
            .map(|wire| &wire.remote)
            .collect()
    }

    pub fn inputs(&self) -> &[PortSpec] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[PortSpec] {
        &self.outputs
    }

    /// How many times the port set has been replaced.
    pub fn commits(&self) -> usize {
        self.commits
    }
}

impl BlockHost for MemoryGraph {
    type Endpoint = Endpoint;

    fn find_redefinition(&self, names: &[String]) -> Option<String> {
        names
            .iter()
            .find(|name| self.defined_elsewhere.contains(name))
            .cloned()
    }

    fn endpoints(&self, side: PortSide, port: usize) -> Vec<Endpoint> {
        self.wires_at(side, port).into_iter().cloned().collect()
    }

    fn set_input_ports(&mut self, ports: Vec<PortSpec>) {
        self.pending_inputs = ports;
    }

    fn set_output_ports(&mut self, ports: Vec<PortSpec>) {
        self.pending_outputs = ports;
    }

    fn commit_ports(&mut self) {
        self.inputs = std::mem::take(&mut self.pending_inputs);
        self.outputs = std::mem::take(&mut self.pending_outputs);
        self.wires.clear();
        self.commits += 1;
    }

    fn link(&mut self, side: PortSide, port: usize, endpoint: Endpoint) {
        self.wires.push(Wire {
            side,
            port,
            remote: endpoint,
        });
    }
}
