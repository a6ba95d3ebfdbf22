use std::collections::HashMap;

use nalgebra::Matrix3;
use num_complex::Complex64;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::phase::{embed_phase_matrix, Attachment, PhaseMatrix, PhaseSet, Phasor3, INERT_OHMS};
use super::units::{Pair, KV};
use crate::error::{ReductionError, Result};

/// Default system frequency (Hz) used when a snapshot does not carry one.
pub const DEFAULT_FREQUENCY_HZ: f64 = 60.0;

/// Solved voltage of one bus.
#[derive(Debug, Clone, PartialEq)]
pub struct BusVoltage {
    /// The bus identifier.
    pub name: String,
    /// Complex phase-to-neutral voltages in kV, zero on absent phases.
    pub v: Pair<Phasor3, KV>,
    /// Phases present at the bus.
    pub phases: PhaseSet,
    /// Line-to-neutral base voltage in kV, used for per-unit magnitudes.
    pub kv_base: f64,
}

impl BusVoltage {
    /// Per-unit magnitude of each phase, `None` where the phase is absent.
    pub fn vm_pu(&self) -> [Option<f64>; 3] {
        let mut out = [None; 3];
        for (idx, slot) in out.iter_mut().enumerate() {
            if self.phases.contains(idx) && self.kv_base > 0.0 {
                *slot = Some(self.v[idx].norm() / self.kv_base);
            }
        }
        out
    }
}

/// Raw line parameters as reported by the engine, per unit length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineParams {
    pub name: String,
    pub bus1: String,
    pub bus2: String,
    /// Number of conductors the matrices are given for.
    pub phases: usize,
    /// Row-major resistance matrix, Ω per unit length.
    pub rmatrix: Vec<f64>,
    /// Row-major reactance matrix, Ω per unit length.
    pub xmatrix: Vec<f64>,
    /// Row-major capacitance matrix, nF per unit length.
    pub cmatrix: Vec<f64>,
    pub length: f64,
}

/// A series branch embedded in the 3×3 phase frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    /// The branch identifier.
    pub name: String,
    pub from_bus: String,
    pub to_bus: String,
    pub phases: PhaseSet,
    /// Series impedance in Ω. Absent phases carry the [`INERT_OHMS`] diagonal.
    pub z: PhaseMatrix,
    /// Shunt charging admittance in S, purely imaginary.
    pub y: PhaseMatrix,
}

impl Branch {
    /// Builds the branch from per-unit-length R/X/C matrices.
    ///
    /// A 3-conductor line always maps onto phases 1, 2, 3. Lines with fewer conductors
    /// take their phases from the `bus1` attachment, in the order listed there.
    pub fn from_line_params(params: &LineParams, frequency_hz: f64) -> Result<Self> {
        let invalid = |reason: &str| ReductionError::InvalidLineData {
            name: params.name.clone(),
            reason: reason.to_owned(),
        };
        let bus1: Attachment = params.bus1.parse()?;
        let bus2: Attachment = params.bus2.parse()?;
        let phases = match params.phases {
            3 => vec![0, 1, 2],
            1 | 2 => bus1.phases(),
            _ => return Err(invalid("phase count must be 1, 2 or 3")),
        };
        if phases.len() != params.phases {
            return Err(invalid("bus1 attachment does not list one node per phase"));
        }
        if PhaseSet::from_indices(&phases).len() != phases.len() {
            return Err(invalid("bus1 attachment repeats a phase"));
        }
        if !params.length.is_finite() || params.length < 0.0 {
            return Err(invalid("length must be finite and non-negative"));
        }

        let omega = 2.0 * std::f64::consts::PI * frequency_hz;
        let scaled = |values: &[f64], factor: f64| -> Vec<f64> {
            values.iter().map(|x| x * factor).collect()
        };
        let r = embed_phase_matrix(&scaled(&params.rmatrix, params.length), &phases, INERT_OHMS)
            .ok_or_else(|| invalid("rmatrix has the wrong size"))?;
        let x = embed_phase_matrix(&scaled(&params.xmatrix, params.length), &phases, INERT_OHMS)
            .ok_or_else(|| invalid("xmatrix has the wrong size"))?;
        let b = embed_phase_matrix(
            &scaled(&params.cmatrix, params.length * 1e-9 * omega),
            &phases,
            0.0,
        )
        .ok_or_else(|| invalid("cmatrix has the wrong size"))?;

        Ok(Branch {
            name: params.name.clone(),
            from_bus: bus1.bus,
            to_bus: bus2.bus,
            phases: PhaseSet::from_indices(&phases),
            z: r.zip_map(&x, Complex64::new),
            y: b.map(|b| Complex64::new(0.0, b)),
        })
    }

    /// Builds a branch directly from its 3×3 matrices.
    pub fn new(
        name: &str,
        from_bus: &str,
        to_bus: &str,
        z: PhaseMatrix,
        y: PhaseMatrix,
    ) -> Self {
        Branch {
            name: name.to_owned(),
            from_bus: from_bus.to_owned(),
            to_bus: to_bus.to_owned(),
            phases: PhaseSet::ABC,
            z,
            y,
        }
    }

    /// Half of the lumped-π charging current drawn at an endpoint with voltage `v`, in A.
    pub fn charging_current(&self, v: &Pair<Phasor3, KV>) -> Phasor3 {
        (self.y * v.to_volts().0) * Complex64::new(0.5, 0.0)
    }

    /// Element name under which the engine reports this branch's losses.
    pub fn element_name(&self) -> String {
        format!("Line.{}", self.name)
    }
}

/// Source of an injected current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionKind {
    Load,
    Capacitor,
    Generator,
    BranchCharging,
}

/// Current injected at a backbone bus, in A.
#[derive(Debug, Clone, PartialEq)]
pub struct Injection {
    /// Position of the bus on the backbone.
    pub bus: usize,
    pub kind: InjectionKind,
    /// Name of the element or lateral bus the current comes from.
    pub source: String,
    pub current: Phasor3,
}

/// Per-conductor currents of a shunt element (load, capacitor, generator), in A.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementCurrents {
    pub name: String,
    pub attachment: Attachment,
    /// Conductor currents of the first terminal, in the engine's order.
    pub currents: Vec<Complex64>,
}

impl ElementCurrents {
    /// Maps conductor currents onto the phases of the attachment, in attachment order.
    pub fn phase_currents(&self) -> Phasor3 {
        let mut out = Phasor3::zeros();
        for (phase, value) in self.attachment.phases().into_iter().zip(self.currents.iter()) {
            out[phase] += value;
        }
        out
    }

    /// Generator current vector: the last conductor (neutral/ground) is dropped and the
    /// remaining values are taken positionally as phases 1, 2, 3.
    pub fn generator_currents(&self) -> Phasor3 {
        let mut out = Phasor3::zeros();
        let n = self.currents.len().saturating_sub(1);
        for (idx, value) in self.currents[..n].iter().take(3).enumerate() {
            out[idx] = *value;
        }
        out
    }
}

/// Read-only view of one solved network.
#[derive(Debug, Clone, Default)]
pub struct NetworkSnapshot {
    pub frequency_hz: f64,
    pub buses: Vec<BusVoltage>,
    pub branches: Vec<Branch>,
    pub loads: Vec<ElementCurrents>,
    pub capacitors: Vec<ElementCurrents>,
    pub generators: Vec<ElementCurrents>,
    /// Complex losses (kW + j·kvar) keyed by full element name, e.g. `Line.650632`.
    pub losses: HashMap<String, Complex64>,
}

impl NetworkSnapshot {
    pub fn bus_index(&self, name: &str) -> Result<usize> {
        self.buses
            .iter()
            .position(|b| b.name == name)
            .ok_or_else(|| ReductionError::UnknownBus(name.to_owned()))
    }

    pub fn bus(&self, name: &str) -> Result<&BusVoltage> {
        Ok(&self.buses[self.bus_index(name)?])
    }

    pub fn branch_index(&self, name: &str) -> Result<usize> {
        self.branches
            .iter()
            .position(|b| b.name == name)
            .ok_or_else(|| ReductionError::UnknownElement(format!("Line.{name}")))
    }

    pub fn generator(&self, name: &str) -> Result<&ElementCurrents> {
        self.generators
            .iter()
            .find(|g| g.name == name)
            .ok_or_else(|| ReductionError::UnknownElement(format!("Generator.{name}")))
    }

    pub fn loss(&self, element: &str) -> Result<Complex64> {
        self.losses
            .get(element)
            .copied()
            .ok_or_else(|| ReductionError::MissingLoss(element.to_owned()))
    }

    /// Load currents summed per bus.
    pub fn load_currents(&self) -> HashMap<String, Phasor3> {
        let mut out: HashMap<String, Phasor3> = HashMap::new();
        for load in &self.loads {
            *out.entry(load.attachment.bus.clone())
                .or_insert_with(Phasor3::zeros) += load.phase_currents();
        }
        out
    }

    /// Capacitor currents per bus. Only the first capacitor met on a bus is kept.
    pub fn capacitor_currents(&self) -> HashMap<String, Phasor3> {
        let mut out: HashMap<String, Phasor3> = HashMap::new();
        for cap in &self.capacitors {
            if out.contains_key(&cap.attachment.bus) {
                warn!(
                    capacitor = %cap.name,
                    bus = %cap.attachment.bus,
                    "bus already has a capacitor current, skipping"
                );
                continue;
            }
            out.insert(cap.attachment.bus.clone(), cap.phase_currents());
        }
        out
    }
}

/// Sum of the complex values in `it`, zero when empty.
pub(crate) fn complex_sum<'a>(it: impl IntoIterator<Item = &'a Complex64>) -> Complex64 {
    it.into_iter().fold(Complex64::zero(), |acc, x| acc + x)
}

/// Real matrix view helper for reports.
pub(crate) fn real_imag(m: &PhaseMatrix) -> (Matrix3<f64>, Matrix3<f64>) {
    (m.map(|x| x.re), m.map(|x| x.im))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, bus1: &str, bus2: &str, phases: usize, r: Vec<f64>) -> LineParams {
        let n = r.len();
        LineParams {
            name: name.to_owned(),
            bus1: bus1.to_owned(),
            bus2: bus2.to_owned(),
            phases,
            xmatrix: r.iter().map(|x| 2.0 * x).collect(),
            cmatrix: vec![1.0; n],
            rmatrix: r,
            length: 2.0,
        }
    }

    #[test]
    fn test_single_phase_branch_embedding() {
        let params = line("684611", "684.3", "611.3", 1, vec![1.5]);
        let br = Branch::from_line_params(&params, 60.0).unwrap();
        assert_eq!(br.phases, PhaseSet::from_nodes(&[3]));
        assert!((br.z[(2, 2)] - Complex64::new(3.0, 6.0)).norm() < 1e-12);
        let inert = Complex64::new(INERT_OHMS, INERT_OHMS);
        assert_eq!(br.z[(0, 0)], inert);
        assert_eq!(br.z[(1, 1)], inert);
        for i in 0..3 {
            for j in 0..3 {
                if i != j {
                    assert_eq!(br.z[(i, j)], Complex64::zero());
                    assert_eq!(br.y[(i, j)], Complex64::zero());
                }
            }
        }
        let omega = 120.0 * std::f64::consts::PI;
        assert!((br.y[(2, 2)] - Complex64::new(0.0, omega * 2.0e-9)).norm() < 1e-18);
        assert_eq!(br.y[(0, 0)], Complex64::zero());
        assert!(br.z.try_inverse().is_some());
    }

    #[test]
    fn test_three_phase_branch_ignores_bus_nodes() {
        let r = vec![0.3, 0.1, 0.1, 0.1, 0.3, 0.1, 0.1, 0.1, 0.3];
        let params = line("632670", "632", "670", 3, r);
        let br = Branch::from_line_params(&params, 60.0).unwrap();
        assert_eq!(br.phases, PhaseSet::ABC);
        assert!((br.z[(0, 1)] - Complex64::new(0.2, 0.4)).norm() < 1e-12);
        assert_eq!(br.from_bus, "632");
        assert_eq!(br.to_bus, "670");
        assert_eq!(br.element_name(), "Line.632670");
    }

    #[test]
    fn test_invalid_line_data() {
        let params = line("bad", "632.1", "645.1", 2, vec![1.0, 0.0, 0.0, 1.0]);
        assert!(matches!(
            Branch::from_line_params(&params, 60.0),
            Err(ReductionError::InvalidLineData { .. })
        ));
        let params = line("bad", "632.1.2", "645.1.2", 2, vec![1.0]);
        assert!(Branch::from_line_params(&params, 60.0).is_err());
    }

    #[test]
    fn test_repeated_phase_is_invalid_line_data() {
        let params = line("645dup", "645.2.2", "646.2.2", 2, vec![1.0, 0.0, 0.0, 1.0]);
        assert!(matches!(
            Branch::from_line_params(&params, 60.0),
            Err(ReductionError::InvalidLineData { ref reason, .. }) if reason.contains("repeats")
        ));
        let params = line("645646", "645.3.2", "646.3.2", 2, vec![1.0, 0.0, 0.0, 1.0]);
        assert_eq!(
            Branch::from_line_params(&params, 60.0).unwrap().phases,
            PhaseSet::from_nodes(&[2, 3])
        );
    }

    #[test]
    fn test_charging_current_is_half_y_v_in_amperes() {
        let y = PhaseMatrix::from_diagonal_element(Complex64::new(0.0, 1e-4));
        let br = Branch::new("b", "x", "y", PhaseMatrix::identity(), y);
        let v = Pair::new(Phasor3::repeat(Complex64::new(2.0, 0.0)));
        let ic = br.charging_current(&v);
        for i in ic.iter() {
            assert!((i - Complex64::new(0.0, 0.1)).norm() < 1e-12);
        }
    }

    #[test]
    fn test_generator_drops_last_conductor() {
        let generator = ElementCurrents {
            name: "gen680".into(),
            attachment: "680".parse().unwrap(),
            currents: vec![
                Complex64::new(-1.0, 0.5),
                Complex64::new(-2.0, 0.5),
                Complex64::new(-3.0, 0.5),
                Complex64::new(6.0, -1.5),
            ],
        };
        let ig = generator.generator_currents();
        assert_eq!(ig[0], Complex64::new(-1.0, 0.5));
        assert_eq!(ig[2], Complex64::new(-3.0, 0.5));
    }

    #[test]
    fn test_first_capacitor_per_bus_wins() {
        let cap = |name: &str, bus: &str, re: f64| ElementCurrents {
            name: name.into(),
            attachment: bus.parse().unwrap(),
            currents: vec![Complex64::new(re, 0.0); 3],
        };
        let snap = NetworkSnapshot {
            capacitors: vec![cap("cap1", "675", 1.0), cap("cap2", "675.1", 5.0)],
            ..Default::default()
        };
        let ic = snap.capacitor_currents();
        assert_eq!(ic["675"], Phasor3::repeat(Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_load_currents_sum_per_bus() {
        let load = |bus: &str, re: f64| ElementCurrents {
            name: format!("load{bus}"),
            attachment: bus.parse().unwrap(),
            currents: vec![Complex64::new(re, 0.0), Complex64::new(-re, 0.0)],
        };
        let snap = NetworkSnapshot {
            loads: vec![load("671.2", 3.0), load("671.1", 1.0), load("671.2", 2.0)],
            ..Default::default()
        };
        let id = snap.load_currents();
        assert_eq!(id["671"][0], Complex64::new(1.0, 0.0));
        assert_eq!(id["671"][1], Complex64::new(5.0, 0.0));
        assert_eq!(id["671"][2], Complex64::zero());
    }
}
