//! Refinement criteria for an external regridder.

use crate::fd::{Order, Stencils};
use crate::fields::{Field, Register};
use crate::hierarchy::Hierarchy;

/// Interior cells of `level` where the gradient magnitude of `field` exceeds
/// `threshold`, in the level's index space. Ghost data must be current.
pub fn tag_gradient(
    hierarchy: &Hierarchy,
    level: usize,
    field: Field,
    threshold: f64,
) -> Vec<[i64; 3]> {
    let slot = hierarchy.layout().channel(field);
    let current = hierarchy.level(level);
    let spacing = current.spacing();

    let mut tagged = Vec::new();

    for patch in &current.patches {
        let stencils = Stencils::new(Order::Second, spacing, patch.space().strides());
        let data = patch.store.register(Register::Active).channel(slot);

        for cell in patch.bounds().iter() {
            let gradient = stencils.gradient(data, patch.local(cell));
            let magnitude = gradient.iter().map(|g| g * g).sum::<f64>().sqrt();

            if magnitude > threshold {
                tagged.push(cell);
            }
        }
    }

    log::debug!(
        "Tagged {} of {} cells on level {level} for refinement",
        tagged.len(),
        current.cell_count()
    );

    tagged
}
