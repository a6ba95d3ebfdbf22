use super::phase::Phasor3;

/// Cumulative backbone branch currents.
///
/// For `n` bus injections returns `n − 1` values, `J[k] = Σ_{i > k} I[i]` being the
/// current entering branch `k` (joining buses `k` and `k + 1`). Computed in one pass
/// from the load end toward the source. The source bus injection `I[0]` never enters
/// any branch current.
pub fn cumulative_currents(injections: &[Phasor3]) -> Vec<Phasor3> {
    let n = injections.len();
    if n < 2 {
        return Vec::new();
    }
    let mut j = vec![Phasor3::zeros(); n - 1];
    let mut acc = Phasor3::zeros();
    for k in (0..n - 1).rev() {
        acc += injections[k + 1];
        j[k] = acc;
    }
    j
}
