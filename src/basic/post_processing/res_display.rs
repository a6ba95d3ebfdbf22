use num_complex::Complex64;
use std::fmt;
use tabled::Tabled;

/// A wrapper around a float that limits the number of decimal places when printed.
#[derive(Clone, Copy, PartialEq, PartialOrd)]
pub(crate) struct FloatWrapper {
    pub(crate) value: f64,
    pub(crate) precision: usize,
}

impl FloatWrapper {
    pub fn new(value: f64, precision: usize) -> Self {
        FloatWrapper { value, precision }
    }
}

impl Default for FloatWrapper {
    fn default() -> Self {
        Self { value: Default::default(), precision: 3 }
    }
}

impl fmt::Display for FloatWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1$}", self.value, self.precision)
    }
}

impl fmt::Debug for FloatWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1$}", self.value, self.precision)
    }
}

/// Complex value printed as `re±imj` with a fixed number of decimals.
#[derive(Clone, Copy, PartialEq)]
pub(crate) struct ComplexWrapper {
    pub(crate) value: Complex64,
    pub(crate) precision: usize,
}

impl ComplexWrapper {
    pub fn new(value: Complex64, precision: usize) -> Self {
        ComplexWrapper { value, precision }
    }
}

impl fmt::Display for ComplexWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.p$}{:+.p$}j",
            self.value.re,
            self.value.im,
            p = self.precision
        )
    }
}

impl fmt::Debug for ComplexWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn display_pu(v: &Option<FloatWrapper>) -> String {
    match v {
        Some(v) => v.to_string(),
        None => "-".to_owned(),
    }
}

/// Table row for bus voltages.
#[derive(Debug, Tabled)]
#[allow(non_snake_case)]
pub(crate) struct BusVoltageTable {
    pub(crate) Bus: String,
    #[tabled(display_with = "display_pu")]
    pub(crate) Vm_a_pu: Option<FloatWrapper>,
    #[tabled(display_with = "display_pu")]
    pub(crate) Vm_b_pu: Option<FloatWrapper>,
    #[tabled(display_with = "display_pu")]
    pub(crate) Vm_c_pu: Option<FloatWrapper>,
    pub(crate) V_a_kv: ComplexWrapper,
    pub(crate) V_b_kv: ComplexWrapper,
    pub(crate) V_c_kv: ComplexWrapper,
}

/// Table row for one injected current.
#[derive(Debug, Tabled)]
#[allow(non_snake_case)]
pub(crate) struct InjectionTable {
    pub(crate) Bus: String,
    pub(crate) Kind: String,
    pub(crate) Source: String,
    pub(crate) I_a: ComplexWrapper,
    pub(crate) I_b: ComplexWrapper,
    pub(crate) I_c: ComplexWrapper,
}

/// Table row for a cumulative backbone branch current.
#[derive(Debug, Tabled)]
#[allow(non_snake_case)]
pub(crate) struct BranchCurrentTable {
    pub(crate) Branch: String,
    pub(crate) From: String,
    pub(crate) To: String,
    pub(crate) J_a: ComplexWrapper,
    pub(crate) J_b: ComplexWrapper,
    pub(crate) J_c: ComplexWrapper,
}

/// Per-phase quantities of one equivalent.
#[derive(Debug, Tabled)]
#[allow(non_snake_case)]
pub(crate) struct EquivalentTable {
    pub(crate) Phase: usize,
    pub(crate) dV_kv: ComplexWrapper,
    pub(crate) Ie1_a: ComplexWrapper,
    pub(crate) Ie2_a: ComplexWrapper,
    pub(crate) Ze_1: ComplexWrapper,
    pub(crate) Ze_2: ComplexWrapper,
    pub(crate) Ze_3: ComplexWrapper,
}

/// Per-phase loads of the reduced network.
#[derive(Debug, Tabled)]
#[allow(non_snake_case)]
pub(crate) struct EquivalentLoadTable {
    pub(crate) Phase: usize,
    pub(crate) P1_kw: FloatWrapper,
    pub(crate) Q1_kvar: FloatWrapper,
    pub(crate) Ie2_minus_Ig_a: ComplexWrapper,
    pub(crate) P2_kw: FloatWrapper,
    pub(crate) Q2_kvar: FloatWrapper,
}

#[derive(Debug, Tabled)]
#[allow(non_snake_case)]
pub(crate) struct VerificationTable {
    pub(crate) Phase: usize,
    pub(crate) Target_dV_kv: ComplexWrapper,
    pub(crate) Reduced_dV_kv: ComplexWrapper,
    pub(crate) Error_kv: FloatWrapper,
}
