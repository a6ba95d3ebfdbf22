use std::{fmt, str::FromStr};

use nalgebra::{Matrix3, Vector3};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{ReductionError, Result};

/// Three-phase complex vector (voltages, currents or powers), phase `a` at index 0.
pub type Phasor3 = Vector3<Complex64>;

/// Three-phase complex matrix in the fixed `abc` frame.
pub type PhaseMatrix = Matrix3<Complex64>;

/// Placeholder value (Ω) put on the diagonal of absent-phase rows/columns of a series
/// impedance. Keeps the 3×3 matrix invertible while carrying no practical current.
pub const INERT_OHMS: f64 = 1e6;

/// Set of conductor phases (1, 2, 3) present on an element or bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct PhaseSet(u8);

impl PhaseSet {
    pub const ABC: PhaseSet = PhaseSet(0b111);
    pub const EMPTY: PhaseSet = PhaseSet(0);

    /// Builds a set from 1-based phase numbers; node 0 (ground) and anything above 3 are ignored.
    pub fn from_nodes(nodes: &[u8]) -> Self {
        PhaseSet(
            nodes
                .iter()
                .filter(|n| (1..=3).contains(*n))
                .fold(0, |acc, n| acc | (1 << (n - 1))),
        )
    }

    /// Builds a set from 0-based phase indices.
    pub fn from_indices(indices: &[usize]) -> Self {
        PhaseSet(
            indices
                .iter()
                .filter(|i| **i < 3)
                .fold(0, |acc, i| acc | (1 << i)),
        )
    }

    pub fn contains(&self, index: usize) -> bool {
        index < 3 && self.0 & (1 << index) != 0
    }

    /// 0-based indices of the present phases in ascending order.
    pub fn indices(&self) -> Vec<usize> {
        (0..3).filter(|i| self.contains(*i)).collect()
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for PhaseSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.indices().iter().map(|i| (i + 1).to_string()).collect();
        write!(f, "{}", names.join("."))
    }
}

/// A terminal attachment of the form `bus.node1.node2...`.
///
/// The node list keeps the order given by the engine, since element current vectors are
/// reported in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub bus: String,
    pub nodes: Vec<u8>,
}

impl Attachment {
    /// 0-based phase indices in attachment order. A bare bus name means phases 1, 2, 3.
    pub fn phases(&self) -> Vec<usize> {
        if self.nodes.is_empty() {
            return vec![0, 1, 2];
        }
        self.nodes
            .iter()
            .filter(|n| (1..=3).contains(*n))
            .map(|n| (*n - 1) as usize)
            .collect()
    }

    pub fn phase_set(&self) -> PhaseSet {
        PhaseSet::from_indices(&self.phases())
    }
}

impl FromStr for Attachment {
    type Err = ReductionError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().split('.');
        let bus = match parts.next() {
            Some(bus) if !bus.is_empty() => bus.to_owned(),
            _ => return Err(ReductionError::InvalidAttachment(s.to_owned())),
        };
        let nodes = parts
            .map(|p| p.parse::<u8>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| ReductionError::InvalidAttachment(s.to_owned()))?;
        Ok(Attachment { bus, nodes })
    }
}

impl fmt::Display for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bus)?;
        for n in &self.nodes {
            write!(f, ".{}", n)?;
        }
        Ok(())
    }
}

/// Embeds a row-major `n × n` matrix (`n = phases.len()`) into the 3×3 `abc` frame.
///
/// Row `i` of `values` lands on row `phases[i]`, columns likewise. Every entry not
/// covered keeps `0`, except absent-phase diagonals which take `fill`. Returns `None`
/// when the shape does not match or a phase is listed twice.
pub fn embed_phase_matrix(values: &[f64], phases: &[usize], fill: f64) -> Option<Matrix3<f64>> {
    let n = phases.len();
    if n == 0 || n > 3 || values.len() != n * n || phases.iter().any(|p| *p >= 3) {
        return None;
    }
    if (0..n).any(|i| phases[i + 1..].contains(&phases[i])) {
        return None;
    }
    let mut m = Matrix3::from_diagonal_element(fill);
    for p in phases {
        m[(*p, *p)] = 0.0;
    }
    for (i, row) in phases.iter().enumerate() {
        for (j, col) in phases.iter().enumerate() {
            m[(*row, *col)] = values[i * n + j];
        }
    }
    Some(m)
}
