use serde::{Deserialize, Serialize};
use tabled::{settings::Style, Table};

mod res_display;
use res_display::*;

use super::feeder::{ReductionReport, Verification};
use super::reduction::Equivalent;
use super::system::NetworkSnapshot;
use crate::io::dss::EquivalentNetwork;

/// Bus voltage row: per-unit magnitude and complex kV voltage per phase.
///
/// Absent phases have no per-unit magnitude and a zero voltage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoltageRecord {
    pub bus: String,
    pub vm_a_pu: Option<f64>,
    pub vm_b_pu: Option<f64>,
    pub vm_c_pu: Option<f64>,
    pub v_a_kv_re: f64,
    pub v_a_kv_im: f64,
    pub v_b_kv_re: f64,
    pub v_b_kv_im: f64,
    pub v_c_kv_re: f64,
    pub v_c_kv_im: f64,
}

/// Voltage table of every bus in snapshot order.
pub fn voltage_records(snapshot: &NetworkSnapshot) -> Vec<VoltageRecord> {
    snapshot
        .buses
        .iter()
        .map(|b| {
            let [a, bb, c] = b.vm_pu();
            VoltageRecord {
                bus: b.name.clone(),
                vm_a_pu: a,
                vm_b_pu: bb,
                vm_c_pu: c,
                v_a_kv_re: b.v[0].re,
                v_a_kv_im: b.v[0].im,
                v_b_kv_re: b.v[1].re,
                v_b_kv_im: b.v[1].im,
                v_c_kv_re: b.v[2].re,
                v_c_kv_im: b.v[2].im,
            }
        })
        .collect()
}

pub fn format_voltage_table(snapshot: &NetworkSnapshot) -> String {
    let rows = snapshot.buses.iter().map(|b| {
        let pu = b.vm_pu().map(|v| v.map(|v| FloatWrapper::new(v, 4)));
        BusVoltageTable {
            Bus: b.name.clone(),
            Vm_a_pu: pu[0],
            Vm_b_pu: pu[1],
            Vm_c_pu: pu[2],
            V_a_kv: ComplexWrapper::new(b.v[0], 4),
            V_b_kv: ComplexWrapper::new(b.v[1], 4),
            V_c_kv: ComplexWrapper::new(b.v[2], 4),
        }
    });
    Table::new(rows).with(Style::markdown()).to_string()
}

/// Every injection of the backbone, then the cumulative branch currents.
pub fn format_currents(report: &ReductionReport) -> String {
    let injections = report.injections.iter().map(|i| InjectionTable {
        Bus: report.buses[i.bus].clone(),
        Kind: format!("{:?}", i.kind),
        Source: i.source.clone(),
        I_a: ComplexWrapper::new(i.current[0], 3),
        I_b: ComplexWrapper::new(i.current[1], 3),
        I_c: ComplexWrapper::new(i.current[2], 3),
    });
    let branches = report
        .branch_currents
        .iter()
        .enumerate()
        .map(|(k, j)| BranchCurrentTable {
            Branch: report.branches[k].clone(),
            From: report.buses[k].clone(),
            To: report.buses[k + 1].clone(),
            J_a: ComplexWrapper::new(j[0], 3),
            J_b: ComplexWrapper::new(j[1], 3),
            J_c: ComplexWrapper::new(j[2], 3),
        });
    format!(
        "{}\n\n{}",
        Table::new(injections).with(Style::markdown()),
        Table::new(branches).with(Style::markdown())
    )
}

pub fn format_equivalent(report: &ReductionReport, eq: &Equivalent) -> String {
    let rows = (0..3).map(|p| EquivalentTable {
        Phase: p + 1,
        dV_kv: ComplexWrapper::new(report.input.voltage_drop[p], 5),
        Ie1_a: ComplexWrapper::new(eq.source_current[p], 3),
        Ie2_a: ComplexWrapper::new(eq.load_current[p], 3),
        Ze_1: ComplexWrapper::new(eq.z[(p, 0)], 4),
        Ze_2: ComplexWrapper::new(eq.z[(p, 1)], 4),
        Ze_3: ComplexWrapper::new(eq.z[(p, 2)], 4),
    });
    format!(
        "mode: {}  g: {}  DSe: {} kVA  DS_tot: {} kVA\n{}",
        eq.mode,
        ComplexWrapper::new(eq.g, 6),
        ComplexWrapper::new(eq.loss, 3),
        ComplexWrapper::new(report.input.total_loss, 3),
        Table::new(rows).with(Style::markdown())
    )
}

/// Backbone listing followed by both equivalents.
pub fn format_report(report: &ReductionReport) -> String {
    let mut out = format!(
        "backbone buses: {}\nbackbone branches: {}\n\n{}\n\n{}",
        report.buses.join(" - "),
        report.branches.join(", "),
        format_currents(report),
        format_equivalent(report, &report.drop_only)
    );
    if let Some(eq) = &report.loss_matching {
        out.push_str("\n\n");
        out.push_str(&format_equivalent(report, eq));
    }
    out
}

pub fn format_equivalent_loads(network: &EquivalentNetwork) -> String {
    let rows = (0..3).map(|p| EquivalentLoadTable {
        Phase: p + 1,
        P1_kw: FloatWrapper::new(network.source_power[p].re, 3),
        Q1_kvar: FloatWrapper::new(network.source_power[p].im, 3),
        Ie2_minus_Ig_a: ComplexWrapper::new(network.load_current[p], 3),
        P2_kw: FloatWrapper::new(network.load_power[p].re, 3),
        Q2_kvar: FloatWrapper::new(network.load_power[p].im, 3),
    });
    Table::new(rows).with(Style::markdown()).to_string()
}

pub fn format_verification(v: &Verification) -> String {
    let rows = (0..3).map(|p| VerificationTable {
        Phase: p + 1,
        Target_dV_kv: ComplexWrapper::new(v.target_drop[p], 5),
        Reduced_dV_kv: ComplexWrapper::new(v.reduced_drop[p], 5),
        Error_kv: FloatWrapper::new((v.reduced_drop[p] - v.target_drop[p]).norm(), 6),
    });
    format!(
        "{}\nloss target: {} kVA  reduced: {} kVA",
        Table::new(rows).with(Style::markdown()),
        ComplexWrapper::new(v.target_loss, 3),
        ComplexWrapper::new(v.reduced_loss, 3)
    )
}
