use std::collections::HashMap;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::backbone::Backbone;
use super::phase::Phasor3;
use super::system::{Injection, InjectionKind, NetworkSnapshot};
use crate::error::{ReductionError, Result};

fn unit_scale() -> f64 {
    1.0
}

/// One lateral contribution folded into a backbone bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LateralSource {
    /// All load current at `bus`, multiplied by `scale` (e.g. a transformer ratio
    /// referring a secondary-side current to the primary side).
    Load {
        bus: String,
        #[serde(default = "unit_scale")]
        scale: f64,
    },
    /// Capacitor current at `bus`, multiplied by `scale`.
    Capacitor {
        bus: String,
        #[serde(default = "unit_scale")]
        scale: f64,
    },
    /// Both charging halves of a lateral branch.
    Branch { name: String },
    /// Generator current, neutral conductor dropped.
    Generator { name: String },
}

/// Lateral contributions attributed to one backbone bus.
///
/// Which lateral belongs to which backbone bus is operator knowledge and is not
/// derived from the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub bus: String,
    #[serde(default)]
    pub sources: Vec<LateralSource>,
}

/// Builds the per-bus injected currents of a backbone from a solved snapshot.
pub struct CurrentAggregator<'a> {
    snapshot: &'a NetworkSnapshot,
    backbone: &'a Backbone,
    loads: HashMap<String, Phasor3>,
    capacitors: HashMap<String, Phasor3>,
}

impl<'a> CurrentAggregator<'a> {
    pub fn new(snapshot: &'a NetworkSnapshot, backbone: &'a Backbone) -> Self {
        Self {
            snapshot,
            backbone,
            loads: snapshot.load_currents(),
            capacitors: snapshot.capacitor_currents(),
        }
    }

    /// Every injection of the backbone: the charging halves of each backbone branch
    /// followed by the attributed lateral contributions.
    pub fn injections(&self, attributions: &[Attribution]) -> Result<Vec<Injection>> {
        let mut out = self.backbone_charging();
        for attribution in attributions {
            let position = self
                .backbone
                .position(self.snapshot, &attribution.bus)
                .ok_or_else(|| {
                    ReductionError::TopologyMismatch(format!(
                        "laterals are attributed to `{}`, which is not on the backbone",
                        attribution.bus
                    ))
                })?;
            for source in &attribution.sources {
                let injection = self.lateral(position, source)?;
                debug!(
                    bus = %attribution.bus,
                    kind = ?injection.kind,
                    source = %injection.source,
                    "lateral injection"
                );
                out.push(injection);
            }
        }
        Ok(out)
    }

    /// `0.5 · Y · V` at both endpoints of every backbone branch.
    fn backbone_charging(&self) -> Vec<Injection> {
        let mut out = Vec::with_capacity(2 * self.backbone.branches().len());
        for (k, b) in self.backbone.branches().iter().enumerate() {
            let br = &self.snapshot.branches[b.index];
            for position in [k, k + 1] {
                let v = &self.snapshot.buses[self.backbone.buses()[position]].v;
                out.push(Injection {
                    bus: position,
                    kind: InjectionKind::BranchCharging,
                    source: br.name.clone(),
                    current: br.charging_current(v),
                });
            }
        }
        out
    }

    fn lateral(&self, position: usize, source: &LateralSource) -> Result<Injection> {
        let (kind, name, current) = match source {
            LateralSource::Load { bus, scale } => {
                let i = self.loads.get(bus).ok_or_else(|| ReductionError::NoElementAtBus {
                    kind: "load",
                    bus: bus.clone(),
                })?;
                (InjectionKind::Load, bus.clone(), i * Complex64::new(*scale, 0.0))
            }
            LateralSource::Capacitor { bus, scale } => {
                let i = self
                    .capacitors
                    .get(bus)
                    .ok_or_else(|| ReductionError::NoElementAtBus {
                        kind: "capacitor",
                        bus: bus.clone(),
                    })?;
                (InjectionKind::Capacitor, bus.clone(), i * Complex64::new(*scale, 0.0))
            }
            LateralSource::Branch { name } => {
                let index = self.snapshot.branch_index(name)?;
                if self.backbone.branches().iter().any(|b| b.index == index) {
                    return Err(ReductionError::TopologyMismatch(format!(
                        "branch `{name}` is on the backbone and cannot be a lateral"
                    )));
                }
                let br = &self.snapshot.branches[index];
                let v_from = &self.snapshot.bus(&br.from_bus)?.v;
                let v_to = &self.snapshot.bus(&br.to_bus)?.v;
                (
                    InjectionKind::BranchCharging,
                    name.clone(),
                    br.charging_current(v_from) + br.charging_current(v_to),
                )
            }
            LateralSource::Generator { name } => {
                let generator = self.snapshot.generator(name)?;
                (InjectionKind::Generator, name.clone(), generator.generator_currents())
            }
        };
        Ok(Injection {
            bus: position,
            kind,
            source: name,
            current,
        })
    }
}

/// Elementwise sum of the injections at each of the `n` backbone buses.
pub fn bus_currents(n: usize, injections: &[Injection]) -> Vec<Phasor3> {
    let mut out = vec![Phasor3::zeros(); n];
    for inj in injections {
        out[inj.bus] += inj.current;
    }
    out
}
