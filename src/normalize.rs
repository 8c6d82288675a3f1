//! Projection of the conformal variables back onto det γ̄ = 1 and tr Ā = 0.

use std::array;

use crate::fields::{Channels, Field, FieldLayout};
use crate::tensor::{delta, one_minus_det, unit_inverse, Symmetric};

/// Rescales a conformal metric difference to unit determinant and removes the trace of
/// the conformal curvature with respect to the rescaled metric.
///
/// The cube root of the determinant is formed through `log1p`/`expm1`, so metrics close
/// to flat are corrected without cancellation.
pub fn normalize_point(dgamma: &Symmetric, a: &Symmetric) -> (Symmetric, Symmetric) {
    let x = one_minus_det(dgamma);
    // 1 - det^(1/3)
    let third = -f64::exp_m1(f64::ln_1p(-x) / 3.0);
    let scale = 1.0 - third;

    let dgamma = Symmetric::from_fn(|[i, j]| (dgamma[[i, j]] + delta(i, j) * third) / scale);

    let inv = unit_inverse(&dgamma);
    let trace = inv.contract(a);
    let a = Symmetric::from_fn(|[i, j]| {
        (a[[i, j]] - (delta(i, j) + dgamma[[i, j]]) * trace / 3.0) / scale
    });

    (dgamma, a)
}

/// Applies [`normalize_point`] at every point of a register, ghost cells included.
pub fn restore_invariants(layout: &FieldLayout, register: &mut Channels) {
    let metric: [usize; 6] = array::from_fn(|c| layout.channel(Field::Metric(c)));
    let curvature: [usize; 6] = array::from_fn(|c| layout.channel(Field::Curvature(c)));

    for point in 0..register.len() {
        let dgamma = Symmetric(metric.map(|slot| register.channel(slot)[point]));
        let a = Symmetric(curvature.map(|slot| register.channel(slot)[point]));

        let (dgamma, a) = normalize_point(&dgamma, &a);

        for c in 0..6 {
            register.channel_mut(metric[c])[point] = dgamma.0[c];
            register.channel_mut(curvature[c])[point] = a.0[c];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::determinant;

    fn metric(dgamma: &Symmetric) -> Symmetric {
        Symmetric::from_fn(|[i, j]| delta(i, j) + dgamma[[i, j]])
    }

    #[test]
    fn projection_is_idempotent() {
        let dgamma = Symmetric([0.12, -0.03, 0.05, -0.07, 0.02, 0.09]);
        let a = Symmetric([0.3, 0.1, -0.2, 0.15, 0.05, -0.1]);

        let (g1, a1) = normalize_point(&dgamma, &a);
        assert!((determinant(&metric(&g1)) - 1.0).abs() < 1e-12);
        assert!(one_minus_det(&g1).abs() < 1e-12);
        assert!(unit_inverse(&g1).contract(&a1).abs() < 1e-12);

        let (g2, a2) = normalize_point(&g1, &a1);
        for c in 0..6 {
            assert!((g2.0[c] - g1.0[c]).abs() < 1e-12);
            assert!((a2.0[c] - a1.0[c]).abs() < 1e-12);
        }
    }

    #[test]
    fn flat_data_is_untouched() {
        let (g, a) = normalize_point(&Symmetric::default(), &Symmetric::default());
        assert_eq!(g, Symmetric::default());
        assert_eq!(a, Symmetric::default());
    }

    #[test]
    fn registers_are_normalized_everywhere() {
        let layout = FieldLayout::new(Field::core());
        let mut register = Channels::new(layout.len(), 5);
        for point in 0..5 {
            register.channel_mut(layout.channel(Field::Metric(0)))[point] = 0.01 * point as f64;
            register.channel_mut(layout.channel(Field::Curvature(3)))[point] = 0.2;
            register.channel_mut(layout.channel(Field::Lapse))[point] = 0.5;
        }

        restore_invariants(&layout, &mut register);

        for point in 0..5 {
            let dgamma = Symmetric(array::from_fn(|c| {
                register.channel(layout.channel(Field::Metric(c)))[point]
            }));
            let a = Symmetric(array::from_fn(|c| {
                register.channel(layout.channel(Field::Curvature(c)))[point]
            }));
            assert!(one_minus_det(&dgamma).abs() < 1e-14);
            assert!(unit_inverse(&dgamma).contract(&a).abs() < 1e-14);
            assert_eq!(register.channel(layout.channel(Field::Lapse))[point], 0.5);
        }
    }
}
