use std::collections::HashSet;

use num_complex::Complex64;
use num_traits::Zero;

use super::phase::{PhaseMatrix, Phasor3};
use super::system::NetworkSnapshot;
use super::units::{Pair, KV};
use crate::error::{ReductionError, Result};

/// A backbone branch together with its orientation along the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackboneBranch {
    /// Index into [`NetworkSnapshot::branches`].
    pub index: usize,
    /// `true` when the branch is declared `to → from` relative to the path direction.
    pub reversed: bool,
}

/// The validated simple path of `n` buses and `n − 1` branches being collapsed.
///
/// Position 0 is the source end, position `n − 1` the load end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backbone {
    buses: Vec<usize>,
    branches: Vec<BackboneBranch>,
}

impl Backbone {
    /// Resolves bus and branch names against `snapshot` and checks that branch `k`
    /// joins buses `k` and `k + 1`.
    ///
    /// All checks run before any numeric work.
    pub fn new<S: AsRef<str>>(snapshot: &NetworkSnapshot, buses: &[S], branches: &[S]) -> Result<Self> {
        if buses.len() < 2 {
            return Err(ReductionError::TopologyMismatch(format!(
                "a backbone needs at least two buses, got {}",
                buses.len()
            )));
        }
        if branches.len() + 1 != buses.len() {
            return Err(ReductionError::TopologyMismatch(format!(
                "{} buses need {} branches, got {}",
                buses.len(),
                buses.len() - 1,
                branches.len()
            )));
        }

        let mut seen = HashSet::new();
        for name in buses {
            if !seen.insert(name.as_ref()) {
                return Err(ReductionError::TopologyMismatch(format!(
                    "bus `{}` appears twice, the backbone must be a simple path",
                    name.as_ref()
                )));
            }
        }

        let bus_idx = buses
            .iter()
            .map(|b| snapshot.bus_index(b.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut path = Vec::with_capacity(branches.len());
        for (k, name) in branches.iter().enumerate() {
            let index = snapshot.branch_index(name.as_ref())?;
            let br = &snapshot.branches[index];
            let (up, down) = (buses[k].as_ref(), buses[k + 1].as_ref());
            let reversed = if br.from_bus == up && br.to_bus == down {
                false
            } else if br.from_bus == down && br.to_bus == up {
                true
            } else {
                return Err(ReductionError::TopologyMismatch(format!(
                    "branch `{}` joins `{}`-`{}` but position {} expects `{}`-`{}`",
                    br.name, br.from_bus, br.to_bus, k, up, down
                )));
            };
            path.push(BackboneBranch { index, reversed });
        }

        Ok(Backbone {
            buses: bus_idx,
            branches: path,
        })
    }

    /// Number of buses `n`.
    pub fn len(&self) -> usize {
        self.buses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
    }

    /// Snapshot bus indices in path order.
    pub fn buses(&self) -> &[usize] {
        &self.buses
    }

    pub fn branches(&self) -> &[BackboneBranch] {
        &self.branches
    }

    /// Snapshot index of the source-end bus.
    pub fn source(&self) -> usize {
        self.buses[0]
    }

    /// Snapshot index of the load-end bus.
    pub fn load(&self) -> usize {
        self.buses[self.buses.len() - 1]
    }

    /// Backbone position of a bus given by name, if it lies on the path.
    pub fn position(&self, snapshot: &NetworkSnapshot, bus: &str) -> Option<usize> {
        self.buses.iter().position(|idx| snapshot.buses[*idx].name == bus)
    }

    /// `Zs`: sum of the series impedances of every backbone branch, in Ω.
    pub fn series_impedance(&self, snapshot: &NetworkSnapshot) -> PhaseMatrix {
        self.branches
            .iter()
            .fold(PhaseMatrix::zeros(), |acc, b| acc + snapshot.branches[b.index].z)
    }

    /// `ΔV = V[source] − V[load]`, in kV.
    pub fn voltage_drop(&self, snapshot: &NetworkSnapshot) -> Pair<Phasor3, KV> {
        let v_source = &snapshot.buses[self.source()].v;
        let v_load = &snapshot.buses[self.load()].v;
        Pair::new(v_source.0 - v_load.0)
    }

    /// `DS_tot`: losses of every backbone branch plus `extra` elements, in kVA.
    pub fn total_loss<S: AsRef<str>>(&self, snapshot: &NetworkSnapshot, extra: &[S]) -> Result<Complex64> {
        let mut total = Complex64::zero();
        for b in &self.branches {
            total += snapshot.loss(&snapshot.branches[b.index].element_name())?;
        }
        for element in extra {
            total += snapshot.loss(element.as_ref())?;
        }
        Ok(total)
    }

    pub fn bus_names<'a>(&self, snapshot: &'a NetworkSnapshot) -> Vec<&'a str> {
        self.buses.iter().map(|i| snapshot.buses[*i].name.as_str()).collect()
    }
}
