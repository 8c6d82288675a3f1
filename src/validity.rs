//! Blow-up detection.

use crate::fields::Register;
use crate::hierarchy::Patch;

/// Scans evolved data for values that indicate the run has become unstable.
pub trait ValidityChecker: Sync {
    /// Does `channel` of the Active register of `patch` contain NaN or infinite values?
    fn has_nans(&self, patch: &Patch, channel: usize) -> bool;
}

/// Checks every interior value of the Active register.
#[derive(Clone, Copy, Debug, Default)]
pub struct FiniteCheck;

impl ValidityChecker for FiniteCheck {
    fn has_nans(&self, patch: &Patch, channel: usize) -> bool {
        let data = patch.store.register(Register::Active).channel(channel);
        patch
            .interior_points()
            .any(|point| !data[point].is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Field, FieldLayout};
    use crate::geometry::IndexBox;

    #[test]
    fn ghost_values_are_ignored() {
        let layout = FieldLayout::new([Field::Lapse, Field::Trace]);
        let mut patch = Patch::new(IndexBox::from_size([4, 4, 4]), 2, &layout);
        assert!(!FiniteCheck.has_nans(&patch, 0));

        let ghost = patch.local([-1, 0, 0]);
        patch.store.register_mut(Register::Active).channel_mut(0)[ghost] = f64::NAN;
        assert!(!FiniteCheck.has_nans(&patch, 0));

        let interior = patch.local([3, 1, 2]);
        patch.store.register_mut(Register::Active).channel_mut(1)[interior] = f64::INFINITY;
        assert!(FiniteCheck.has_nans(&patch, 1));
        assert!(!FiniteCheck.has_nans(&patch, 0));
    }
}
