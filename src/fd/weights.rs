//! Stencil weight tables for cell-centered finite differences.

/// A one-dimensional stencil. `weights[k]` multiplies the value at offset `start + k`,
/// and the weighted sum is divided by `denominator` (and by powers of the spacing).
#[derive(Clone, Copy, Debug)]
pub struct Stencil {
    pub start: isize,
    pub weights: &'static [f64],
    pub denominator: f64,
}

impl Stencil {
    const fn new(start: isize, weights: &'static [f64], denominator: f64) -> Self {
        Self {
            start,
            weights,
            denominator,
        }
    }

    /// Furthest offset reached in either direction.
    pub fn reach(&self) -> usize {
        let end = self.start + self.weights.len() as isize - 1;
        self.start.unsigned_abs().max(end.unsigned_abs())
    }
}

// ***************************
// Centered first derivatives

pub const DERIVATIVE_2: Stencil = Stencil::new(-1, &[-1.0, 0.0, 1.0], 2.0);
pub const DERIVATIVE_4: Stencil = Stencil::new(-2, &[1.0, -8.0, 0.0, 8.0, -1.0], 12.0);
pub const DERIVATIVE_6: Stencil = Stencil::new(
    -3,
    &[-1.0, 9.0, -45.0, 0.0, 45.0, -9.0, 1.0],
    60.0,
);

// ****************************
// Centered second derivatives

pub const SECOND_DERIVATIVE_2: Stencil = Stencil::new(-1, &[1.0, -2.0, 1.0], 1.0);
pub const SECOND_DERIVATIVE_4: Stencil =
    Stencil::new(-2, &[-1.0, 16.0, -30.0, 16.0, -1.0], 12.0);
pub const SECOND_DERIVATIVE_6: Stencil = Stencil::new(
    -3,
    &[2.0, -27.0, 270.0, -490.0, 270.0, -27.0, 2.0],
    180.0,
);

// ************************************************
// Lopsided first derivatives biased towards +axis.
// The negative-direction stencil is the mirror image.

pub const UPWIND_2: Stencil = Stencil::new(0, &[-3.0, 4.0, -1.0], 2.0);
pub const UPWIND_4: Stencil = Stencil::new(-1, &[-3.0, -10.0, 18.0, -6.0, 1.0], 12.0);
pub const UPWIND_6: Stencil = Stencil::new(
    -2,
    &[2.0, -24.0, -35.0, 80.0, -30.0, 8.0, -1.0],
    60.0,
);

// *****************************************************
// Kreiss-Oliger dissipation. The sign of the denominator makes the
// operator damp the highest frequency mode for every order.

pub const DISSIPATION_4: Stencil = Stencil::new(-2, &[1.0, -4.0, 6.0, -4.0, 1.0], -16.0);
pub const DISSIPATION_6: Stencil = Stencil::new(
    -3,
    &[1.0, -6.0, 15.0, -20.0, 15.0, -6.0, 1.0],
    64.0,
);
pub const DISSIPATION_8: Stencil = Stencil::new(
    -4,
    &[1.0, -8.0, 28.0, -56.0, 70.0, -56.0, 28.0, -8.0, 1.0],
    -256.0,
);
