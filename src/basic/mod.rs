pub mod aggregate;
pub mod backbone;
pub mod engine;
pub mod feeder;
pub mod phase;
pub mod post_processing;
pub mod reduction;
pub mod summation;
pub mod system;
pub mod units;

#[cfg(test)]
pub(crate) mod testing;
