//! Small hand-built networks shared by the unit tests.

use num_complex::Complex64;

use super::phase::{PhaseMatrix, PhaseSet, Phasor3};
use super::system::{Branch, BusVoltage, ElementCurrents, NetworkSnapshot};
use super::units::Pair;

pub(crate) fn diag(re: f64, im: f64) -> PhaseMatrix {
    PhaseMatrix::from_diagonal_element(Complex64::new(re, im))
}

pub(crate) fn bus(name: &str, v: f64) -> BusVoltage {
    BusVoltage {
        name: name.into(),
        v: Pair::new(Phasor3::repeat(Complex64::new(v, 0.0))),
        phases: PhaseSet::ABC,
        kv_base: 2.4,
    }
}

pub(crate) fn element(name: &str, bus1: &str, currents: &[(f64, f64)]) -> ElementCurrents {
    ElementCurrents {
        name: name.into(),
        attachment: bus1.parse().expect("valid attachment"),
        currents: currents.iter().map(|(re, im)| Complex64::new(*re, *im)).collect(),
    }
}

/// Three buses `s - m - e`, branch `em` declared against the path direction.
///
/// Series impedance `0.5 + j1.0 Ω` per phase on each branch, no charging.
pub(crate) fn chain() -> NetworkSnapshot {
    let mut snap = NetworkSnapshot {
        frequency_hz: 60.0,
        buses: vec![bus("s", 2.4), bus("m", 2.35), bus("e", 2.3)],
        branches: vec![
            Branch::new("sm", "s", "m", diag(0.5, 1.0), PhaseMatrix::zeros()),
            Branch::new("em", "e", "m", diag(0.5, 1.0), PhaseMatrix::zeros()),
        ],
        ..Default::default()
    };
    snap.losses.insert("Line.sm".into(), Complex64::new(3.0, 6.0));
    snap.losses.insert("Line.em".into(), Complex64::new(1.0, 2.0));
    snap.losses.insert("Transformer.reg".into(), Complex64::new(0.5, 0.5));
    snap
}

/// [`chain`] with laterals: bus `l` hangs off `m` through branch `ml`, loads at `l`
/// and `e`, two capacitors at `e`, a generator at `e`, and charging on every branch.
pub(crate) fn feeder() -> NetworkSnapshot {
    let mut snap = chain();
    snap.buses.push(bus("l", 2.34));
    snap.branches.push(Branch::new("ml", "m", "l", diag(1.0, 1.0), diag(0.0, 2e-4)));
    for br in snap.branches.iter_mut() {
        if br.name != "ml" {
            br.y = diag(0.0, 1e-4);
        }
    }
    snap.loads = vec![
        element("lat", "l.1.2.3", &[(10.0, -5.0), (10.0, -5.0), (10.0, -5.0)]),
        element("end", "e.2", &[(4.0, -2.0), (-4.0, 2.0)]),
    ];
    snap.capacitors = vec![
        element("cap1", "e", &[(0.0, 3.0), (0.0, 3.0), (0.0, 3.0)]),
        element("cap2", "e.1", &[(0.0, 100.0)]),
    ];
    snap.generators = vec![element(
        "g1",
        "e",
        &[(-2.0, 0.0), (-2.0, 0.0), (-2.0, 0.0), (6.0, 0.0)],
    )];
    snap.losses.insert("Line.ml".into(), Complex64::new(0.2, 0.1));
    snap
}
