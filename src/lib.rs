mod basic;
pub mod error;
pub mod io;
pub mod prelude {
    use crate::basic;
    pub use basic::*;
    pub use crate::error::{ReductionError, Result};
    pub use crate::io::{config, dss, report, snapshot};

    pub use engine::{ReplayEngine, SimulationEngine};
    pub use feeder::{reduce_feeder, verify, ReductionReport, Verification};
    pub use reduction::{Equivalent, ReductionMode};
}
