use std::marker::PhantomData;

use derive_more::derive::{Deref, DerefMut, From, Into};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::phase::Phasor3;

/// Volts per kilovolt. Bus voltages are carried in kV while impedances are in Ω,
/// so every matrix solve that must resolve currents in A goes through this factor.
pub const VOLTS_PER_KV: f64 = 1000.0;

/// Macro for defining a new unit marker type.
///
/// This defines a unit struct implementing [`UnitTrait`] with a specific suffix string.
///
/// # Example
/// ```ignore
/// define_unit!(KV, "kv");
/// ```
macro_rules! define_unit {
    ($unit:ident, $suffix:literal) => {
        #[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq)]
        pub struct $unit;

        impl UnitTrait for $unit {
            const SUFFIX: &'static str = $suffix;
        }
    };
}

/// A strongly-typed quantity paired with a unit marker.
///
/// Wraps a value of type `T` and carries phantom unit information, so a kV voltage
/// vector cannot be fed into a solve that expects volts without an explicit conversion.
#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, From, Into, Deref, DerefMut)]
#[serde(transparent)]
pub struct Pair<T, Unit>(
    /// The underlying numeric value.
    pub T,
    /// Phantom marker for the unit type.
    #[deref(ignore)]
    #[deref_mut(ignore)]
    pub PhantomData<Unit>,
);

impl<T, Unit> Pair<T, Unit> {
    /// Tags `value` with the unit `Unit`.
    pub fn new(value: T) -> Self {
        Pair(value, PhantomData)
    }
}

/// Trait for unit marker types, providing string suffix information.
pub trait UnitTrait {
    /// The unit suffix used in reports, e.g. "kv", "a".
    const SUFFIX: &'static str;

    /// Returns the string suffix of this unit.
    fn suffix() -> &'static str {
        Self::SUFFIX
    }
}

define_unit!(KV, "kv");
define_unit!(Volt, "v");
define_unit!(Ampere, "a");
define_unit!(KVA, "kva");

impl<T, Unit: UnitTrait> UnitTrait for Pair<T, Unit> {
    const SUFFIX: &'static str = Unit::SUFFIX;
}

impl Pair<Phasor3, KV> {
    /// Rescales a kV phase vector to volts.
    pub fn to_volts(&self) -> Pair<Phasor3, Volt> {
        Pair::new(self.0 * Complex64::new(VOLTS_PER_KV, 0.0))
    }

    /// Per-phase complex power `V · conj(I)` in kVA for a current in A.
    pub fn power(&self, current: &Pair<Phasor3, Ampere>) -> Pair<Phasor3, KVA> {
        Pair::new(self.0.zip_map(&current.0, |v, i| v * i.conj()))
    }
}

impl Pair<Phasor3, Volt> {
    /// Rescales a volt phase vector to kV.
    pub fn to_kv(&self) -> Pair<Phasor3, KV> {
        Pair::new(self.0 / Complex64::new(VOLTS_PER_KV, 0.0))
    }
}
