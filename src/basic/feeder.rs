use num_complex::Complex64;
use tracing::{debug, info};

use super::aggregate::{bus_currents, CurrentAggregator};
use super::backbone::Backbone;
use super::phase::Phasor3;
use super::reduction::{reduce, Equivalent, ReductionInput, ReductionMode};
use super::summation::cumulative_currents;
use super::system::{Injection, NetworkSnapshot};
use super::units::{Pair, KV};
use crate::error::Result;
use crate::io::config::ReductionConfig;

/// Everything computed while collapsing one backbone.
#[derive(Debug, Clone)]
pub struct ReductionReport {
    /// Backbone bus names, source end first.
    pub buses: Vec<String>,
    pub branches: Vec<String>,
    /// Solved voltages at the two ends of the backbone.
    pub source_voltage: Pair<Phasor3, KV>,
    pub load_voltage: Pair<Phasor3, KV>,
    pub injections: Vec<Injection>,
    /// Aggregated injection per backbone bus, in A.
    pub bus_currents: Vec<Phasor3>,
    /// `J[k]` per backbone branch, in A.
    pub branch_currents: Vec<Phasor3>,
    pub input: ReductionInput,
    pub mode: ReductionMode,
    pub drop_only: Equivalent,
    /// Present whenever the backbone loss can be matched; always present when
    /// `mode` asks for it.
    pub loss_matching: Option<Equivalent>,
}

impl ReductionReport {
    pub fn source_bus(&self) -> &str {
        &self.buses[0]
    }

    pub fn load_bus(&self) -> &str {
        &self.buses[self.buses.len() - 1]
    }

    /// The equivalent for the configured mode.
    pub fn selected(&self) -> &Equivalent {
        match (self.mode, &self.loss_matching) {
            (ReductionMode::VoltageDropAndLosses, Some(eq)) => eq,
            _ => &self.drop_only,
        }
    }
}

/// Runs the full reduction on a solved snapshot: backbone validation, current
/// aggregation, backbone summation and the equivalent-branch solve.
pub fn reduce_feeder(snapshot: &NetworkSnapshot, config: &ReductionConfig) -> Result<ReductionReport> {
    let backbone = Backbone::new(snapshot, &config.backbone.buses, &config.backbone.branches)?;
    info!(
        buses = backbone.len(),
        source = %config.backbone.buses[0],
        load = %config.backbone.buses[backbone.len() - 1],
        "backbone validated"
    );

    let injections = CurrentAggregator::new(snapshot, &backbone).injections(&config.laterals)?;
    let currents = bus_currents(backbone.len(), &injections);
    let branch_currents = cumulative_currents(&currents);
    for (k, j) in branch_currents.iter().enumerate() {
        debug!(branch = %config.backbone.branches[k], current = ?j.as_slice(), "cumulative current");
    }

    let input = ReductionInput {
        z_sum: backbone.series_impedance(snapshot),
        voltage_drop: backbone.voltage_drop(snapshot),
        source_current: branch_currents[0],
        total_loss: backbone.total_loss(snapshot, &config.extra_loss_elements)?,
    };
    info!(total_loss_kva = %input.total_loss, "backbone targets collected");

    let drop_only = reduce(&input, ReductionMode::VoltageDrop)?;
    let loss_matching = match config.mode {
        ReductionMode::VoltageDropAndLosses => Some(reduce(&input, config.mode)?),
        ReductionMode::VoltageDrop => reduce(&input, ReductionMode::VoltageDropAndLosses)
            .map_err(|e| debug!(error = %e, "loss-matching equivalent unavailable"))
            .ok(),
    };

    Ok(ReductionReport {
        buses: config.backbone.buses.clone(),
        branches: config.backbone.branches.clone(),
        source_voltage: snapshot.buses[backbone.source()].v,
        load_voltage: snapshot.buses[backbone.load()].v,
        injections,
        bus_currents: currents,
        branch_currents,
        input,
        mode: config.mode,
        drop_only,
        loss_matching,
    })
}

/// Comparison of a re-solved equivalent network against the original backbone.
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub target_drop: Pair<Phasor3, KV>,
    pub reduced_drop: Pair<Phasor3, KV>,
    /// `DS_tot` of the original backbone, kVA.
    pub target_loss: Complex64,
    /// Loss of the equivalent line in the re-solved network, kVA.
    pub reduced_loss: Complex64,
}

impl Verification {
    /// Largest per-phase voltage drop deviation, in kV.
    pub fn max_drop_error(&self) -> f64 {
        (self.reduced_drop.0 - self.target_drop.0)
            .iter()
            .map(|x| x.norm())
            .fold(0.0, f64::max)
    }

    pub fn loss_error(&self) -> Complex64 {
        self.reduced_loss - self.target_loss
    }
}

/// Reads the reduced voltage drop and the loss of `line` from the re-solved equivalent.
pub fn verify(report: &ReductionReport, line: &str, resolved: &NetworkSnapshot) -> Result<Verification> {
    let v_source = resolved.bus(report.source_bus())?.v;
    let v_load = resolved.bus(report.load_bus())?.v;
    let verification = Verification {
        target_drop: report.input.voltage_drop,
        reduced_drop: Pair::new(v_source.0 - v_load.0),
        target_loss: report.input.total_loss,
        reduced_loss: resolved.loss(&format!("Line.{line}"))?,
    };
    info!(
        max_drop_error_kv = verification.max_drop_error(),
        loss_error_kva = %verification.loss_error(),
        "equivalent verified"
    );
    Ok(verification)
}
