//! Carrying wires across a port rebuild.
//!
//! Before the old ports are torn down, [`ConnectionSnapshot::capture`] records
//! the remote endpoints attached to each of them. After the new ports are
//! committed, [`ConnectionSnapshot::restore`] reattaches them in three passes:
//!
//! 1. exact: the new port's [`MatchKey`] equals a captured key;
//! 2. positional: the captured entry at the new port's index is still unused;
//! 3. leftover: remaining entries, in capture order, go to the remaining new
//!    ports, in port order, until either runs out.
//!
//! The leftover pass can attach a wire to a port that has nothing to do with
//! where it used to end. Entries beyond the shorter list are dropped.

use crate::ports::{PLACEHOLDER_LABEL, PortSpec};

/// Identity of a port for reconnection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatchKey {
    Name(String),
    /// Placeholder ports cannot be told apart by name once there are several
    /// of them, so they are keyed by position instead.
    Index(usize),
}

pub fn match_keys(ports: &[PortSpec]) -> Vec<MatchKey> {
    let placeholders = ports.iter().filter(|port| port.is_placeholder()).count();
    ports
        .iter()
        .enumerate()
        .map(|(index, port)| {
            if !port.is_placeholder() {
                MatchKey::Name(port.tooltip_key.clone())
            } else if placeholders > 1 {
                MatchKey::Index(index)
            } else {
                MatchKey::Name(PLACEHOLDER_LABEL.to_string())
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchPhase {
    Exact,
    Positional,
    Leftover,
}

/// Endpoint counts per restore pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub exact: usize,
    pub positional: usize,
    pub leftover: usize,
    /// Endpoints whose wires could not be placed anywhere.
    pub dropped: usize,
}

impl RestoreReport {
    pub fn relinked(&self) -> usize {
        self.exact + self.positional + self.leftover
    }

    fn count(&mut self, phase: MatchPhase, endpoints: usize) {
        match phase {
            MatchPhase::Exact => self.exact += endpoints,
            MatchPhase::Positional => self.positional += endpoints,
            MatchPhase::Leftover => self.leftover += endpoints,
        }
    }
}

/// The endpoints attached to each port of one side, in port order.
#[derive(Debug, Clone)]
pub struct ConnectionSnapshot<E> {
    entries: Vec<(MatchKey, Vec<E>)>,
}

impl<E> ConnectionSnapshot<E> {
    pub fn capture(ports: &[PortSpec], mut endpoints: impl FnMut(usize) -> Vec<E>) -> Self {
        let entries = match_keys(ports)
            .into_iter()
            .enumerate()
            .map(|(index, key)| (key, endpoints(index)))
            .collect();
        ConnectionSnapshot { entries }
    }

    pub fn endpoint_count(&self) -> usize {
        self.entries.iter().map(|(_, endpoints)| endpoints.len()).sum()
    }

    /// Reattach the captured endpoints to `ports`; `link` is called once per
    /// endpoint with the new port index.
    pub fn restore(self, ports: &[PortSpec], mut link: impl FnMut(usize, E, MatchPhase)) -> RestoreReport {
        let keys = match_keys(ports);
        let mut entries: Vec<Option<(MatchKey, Vec<E>)>> = self.entries.into_iter().map(Some).collect();
        let mut matched = vec![false; ports.len()];
        let mut report = RestoreReport::default();

        let mut relink = |port: usize, endpoints: Vec<E>, phase: MatchPhase, report: &mut RestoreReport| {
            report.count(phase, endpoints.len());
            for endpoint in endpoints {
                link(port, endpoint, phase);
            }
        };

        for (port, key) in keys.iter().enumerate() {
            let slot = entries
                .iter_mut()
                .find(|entry| matches!(entry, Some((captured, _)) if captured == key));
            if let Some((_, endpoints)) = slot.and_then(Option::take) {
                relink(port, endpoints, MatchPhase::Exact, &mut report);
                matched[port] = true;
            }
        }

        for port in 0..ports.len() {
            if matched[port] {
                continue;
            }
            if let Some((_, endpoints)) = entries.get_mut(port).and_then(Option::take) {
                relink(port, endpoints, MatchPhase::Positional, &mut report);
                matched[port] = true;
            }
        }

        let mut leftovers = entries.into_iter().flatten();
        for port in (0..ports.len()).filter(|&port| !matched[port]) {
            match leftovers.next() {
                Some((_, endpoints)) => relink(port, endpoints, MatchPhase::Leftover, &mut report),
                None => break,
            }
        }
        report.dropped = leftovers.map(|(_, endpoints)| endpoints.len()).sum();

        report
    }
}
