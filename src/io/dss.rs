use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::basic::feeder::ReductionReport;
use crate::basic::phase::{PhaseMatrix, Phasor3};
use crate::basic::system::{complex_sum, real_imag, NetworkSnapshot};
use crate::basic::units::{Ampere, Pair, KVA};
use crate::error::Result;

use super::name_from_json;

/// Generator written back into the reduced network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorRecord {
    /// Engine element name; its solved current is netted out of the load-side load.
    pub name: String,
    #[serde(deserialize_with = "name_from_json")]
    pub bus: String,
    pub kv: f64,
    pub kw: f64,
    pub pf: f64,
}

/// Names and load parameters used when writing the equivalent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitOptions {
    pub linecode: String,
    pub line: String,
    pub load_model: u32,
    pub connection: String,
    /// Rated voltage of the equivalent single-phase loads, kV.
    pub load_kv: f64,
    pub voltage_bases: Vec<f64>,
    pub generator: Option<GeneratorRecord>,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            linecode: "mtx_eq".to_owned(),
            line: "eq_line".to_owned(),
            load_model: 1,
            connection: "Wye".to_owned(),
            load_kv: 2.4,
            voltage_bases: vec![115.0, 4.16],
            generator: None,
        }
    }
}

/// The reduced network: one equivalent line and a single-phase load per phase at
/// each end.
#[derive(Debug, Clone, PartialEq)]
pub struct EquivalentNetwork {
    pub source_bus: String,
    pub load_bus: String,
    pub z: PhaseMatrix,
    /// `V_source · conj(Ie1)`.
    pub source_power: Pair<Phasor3, KVA>,
    /// `V_load · conj(Ie2 − Ig)`.
    pub load_power: Pair<Phasor3, KVA>,
    /// `Ie2 − Ig`.
    pub load_current: Pair<Phasor3, Ampere>,
    pub options: EmitOptions,
}

impl EquivalentNetwork {
    /// Builds the equivalent of the report's selected mode. The current of the
    /// configured generator, if any, is taken from `snapshot`.
    pub fn new(report: &ReductionReport, snapshot: &NetworkSnapshot, options: &EmitOptions) -> Result<Self> {
        let eq = report.selected();
        let ig = match &options.generator {
            Some(generator) => snapshot.generator(&generator.name)?.generator_currents(),
            None => Phasor3::zeros(),
        };
        let ie1: Pair<Phasor3, Ampere> = Pair::new(eq.source_current);
        let net: Pair<Phasor3, Ampere> = Pair::new(eq.load_current - ig);
        let source_power = report.source_voltage.power(&ie1);
        let load_power = report.load_voltage.power(&net);
        info!(
            source_kva = %complex_sum(source_power.iter()),
            load_kva = %complex_sum(load_power.iter()),
            "equivalent loads"
        );
        Ok(Self {
            source_bus: report.source_bus().to_owned(),
            load_bus: report.load_bus().to_owned(),
            z: eq.z,
            source_power,
            load_power,
            load_current: net,
            options: options.clone(),
        })
    }

    fn write_loads(&self, f: &mut fmt::Formatter<'_>, bus: &str, power: &Phasor3) -> fmt::Result {
        let o = &self.options;
        for (p, s) in power.iter().enumerate() {
            writeln!(
                f,
                "New Load.{bus}-{n} Bus1={bus}.{n} Phases=1 Conn={} Model={} kV={} kW={} kvar={}",
                o.connection,
                o.load_model,
                o.load_kv,
                s.re,
                s.im,
                n = p + 1,
            )?;
        }
        Ok(())
    }
}

/// Lower triangle of a symmetric phase matrix, rows separated by `|`.
fn lower_triangle(m: &nalgebra::Matrix3<f64>) -> String {
    (0..3)
        .map(|i| {
            (0..=i)
                .map(|j| m[(i, j)].to_string())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

impl fmt::Display for EquivalentNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.options;
        let (r, x) = real_imag(&self.z);
        writeln!(f)?;
        writeln!(f, "New Linecode.{} nphases=3", o.linecode)?;
        writeln!(f, "~ rmatrix = [{}]", lower_triangle(&r))?;
        writeln!(f, "~ xmatrix = [{}]", lower_triangle(&x))?;
        writeln!(f)?;
        writeln!(
            f,
            "New Line.{} Phases=3 Bus1={} Bus2={} LineCode={} Length=1",
            o.line, self.source_bus, self.load_bus, o.linecode
        )?;
        if let Some(generator) = &o.generator {
            writeln!(f)?;
            writeln!(
                f,
                "New Generator.{}  Bus1={}  kV={}  kW={}  PF={}",
                generator.name, generator.bus, generator.kv, generator.kw, generator.pf
            )?;
        }
        writeln!(f)?;
        self.write_loads(f, &self.source_bus, &self.source_power)?;
        writeln!(f)?;
        self.write_loads(f, &self.load_bus, &self.load_power)?;
        writeln!(f)?;
        let bases = o
            .voltage_bases
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "Set Voltagebases=[{bases}]")?;
        writeln!(f, "calcv")?;
        writeln!(f, "Solve")
    }
}

/// Header text followed by the equivalent's fragment.
pub fn emit(header: &str, network: &EquivalentNetwork) -> String {
    format!("{header}{network}")
}

pub fn write_network(path: impl AsRef<Path>, header: &str, network: &EquivalentNetwork) -> Result<()> {
    fs::write(path.as_ref(), emit(header, network))?;
    info!(path = %path.as_ref().display(), "equivalent network written");
    Ok(())
}
