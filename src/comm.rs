//! Collective operations across the processes sharing a hierarchy.

/// Synchronization and reductions between every participant of a run.
pub trait Communicator: Sync {
    /// Blocks until every participant has reached the same point.
    fn barrier(&self);

    /// Global sum of a local contribution.
    fn sum(&self, local: f64) -> f64;

    /// Global maximum of a local contribution.
    fn max(&self, local: f64) -> f64;
}

/// The whole hierarchy lives in this process.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleProcess;

impl Communicator for SingleProcess {
    fn barrier(&self) {}

    fn sum(&self, local: f64) -> f64 {
        local
    }

    fn max(&self, local: f64) -> f64 {
        local
    }
}
