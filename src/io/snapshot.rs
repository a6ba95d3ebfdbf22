use std::collections::HashMap;
use std::fs;
use std::path::Path;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::basic::phase::{PhaseSet, Phasor3};
use crate::basic::system::{
    Branch, BusVoltage, ElementCurrents, LineParams, NetworkSnapshot, DEFAULT_FREQUENCY_HZ,
};
use crate::basic::units::{Pair, VOLTS_PER_KV};
use crate::error::{ReductionError, Result};

use super::name_from_json;

fn default_frequency() -> f64 {
    DEFAULT_FREQUENCY_HZ
}

/// Solved bus voltages as the engine reports them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusRecord {
    #[serde(deserialize_with = "name_from_json")]
    pub name: String,
    /// Line-to-neutral base voltage, kV.
    pub kv_base: f64,
    /// Node numbers present at the bus, in the engine's order.
    pub nodes: Vec<u8>,
    /// Magnitude (V) and angle (degrees) per node, interleaved.
    pub v_mag_angle: Vec<f64>,
}

/// Conductor currents of the first terminal of a shunt element.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementRecord {
    pub name: String,
    pub bus1: String,
    /// Real and imaginary parts (A) per conductor, interleaved.
    pub currents: Vec<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LossRecord {
    /// Full element name, e.g. `Line.650632`.
    pub name: String,
    pub p_kw: f64,
    pub q_kvar: f64,
}

/// One solved network as written by the engine driver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotFile {
    #[serde(default = "default_frequency")]
    pub frequency_hz: f64,
    pub buses: Vec<BusRecord>,
    #[serde(default)]
    pub lines: Vec<LineParams>,
    #[serde(default)]
    pub loads: Vec<ElementRecord>,
    #[serde(default)]
    pub capacitors: Vec<ElementRecord>,
    #[serde(default)]
    pub generators: Vec<ElementRecord>,
    #[serde(default)]
    pub losses: Vec<LossRecord>,
}

fn pairs(values: &[f64], what: &str, owner: &str) -> Result<Vec<(f64, f64)>> {
    if values.len() % 2 != 0 {
        return Err(ReductionError::MalformedSnapshot(format!(
            "{what} of `{owner}` has an odd number of values"
        )));
    }
    Ok(values.chunks_exact(2).map(|c| (c[0], c[1])).collect())
}

impl TryFrom<BusRecord> for BusVoltage {
    type Error = ReductionError;

    fn try_from(rec: BusRecord) -> Result<Self> {
        let polar = pairs(&rec.v_mag_angle, "v_mag_angle", &rec.name)?;
        if polar.len() != rec.nodes.len() {
            return Err(ReductionError::MalformedSnapshot(format!(
                "bus `{}` lists {} nodes but {} voltages",
                rec.name,
                rec.nodes.len(),
                polar.len()
            )));
        }
        let mut v = Phasor3::zeros();
        for (node, (mag, deg)) in rec.nodes.iter().zip(polar) {
            if (1..=3).contains(node) {
                v[(*node - 1) as usize] = Complex64::from_polar(mag / VOLTS_PER_KV, deg.to_radians());
            }
        }
        Ok(BusVoltage {
            phases: PhaseSet::from_nodes(&rec.nodes),
            name: rec.name,
            v: Pair::new(v),
            kv_base: rec.kv_base,
        })
    }
}

impl TryFrom<ElementRecord> for ElementCurrents {
    type Error = ReductionError;

    fn try_from(rec: ElementRecord) -> Result<Self> {
        let currents = pairs(&rec.currents, "currents", &rec.name)?
            .into_iter()
            .map(|(re, im)| Complex64::new(re, im))
            .collect();
        Ok(ElementCurrents {
            attachment: rec.bus1.parse()?,
            name: rec.name,
            currents,
        })
    }
}

fn elements(records: Vec<ElementRecord>) -> Result<Vec<ElementCurrents>> {
    records.into_iter().map(ElementCurrents::try_from).collect()
}

impl TryFrom<SnapshotFile> for NetworkSnapshot {
    type Error = ReductionError;

    fn try_from(file: SnapshotFile) -> Result<Self> {
        let frequency_hz = file.frequency_hz;
        let branches = file
            .lines
            .iter()
            .map(|l| Branch::from_line_params(l, frequency_hz))
            .collect::<Result<Vec<_>>>()?;
        let losses: HashMap<String, Complex64> = file
            .losses
            .into_iter()
            .map(|l| (l.name, Complex64::new(l.p_kw, l.q_kvar)))
            .collect();
        Ok(NetworkSnapshot {
            frequency_hz,
            buses: file
                .buses
                .into_iter()
                .map(BusVoltage::try_from)
                .collect::<Result<Vec<_>>>()?,
            branches,
            loads: elements(file.loads)?,
            capacitors: elements(file.capacitors)?,
            generators: elements(file.generators)?,
            losses,
        })
    }
}

pub fn snapshot_from_str(content: &str) -> Result<NetworkSnapshot> {
    let file: SnapshotFile = serde_json::from_str(content)?;
    NetworkSnapshot::try_from(file)
}

/// Reads a snapshot JSON file and builds the network view from it.
pub fn load_snapshot_json(path: impl AsRef<Path>) -> Result<NetworkSnapshot> {
    let content = fs::read_to_string(path.as_ref())?;
    let snapshot = snapshot_from_str(&content)?;
    debug!(
        path = %path.as_ref().display(),
        buses = snapshot.buses.len(),
        branches = snapshot.branches.len(),
        "loaded snapshot"
    );
    Ok(snapshot)
}
