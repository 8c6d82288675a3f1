//! Finite-difference operators evaluated at a single point of a patch.
//!
//! All operators read a flat, ghost-inclusive channel of a patch and index it through
//! the patch strides. Out-of-range accesses panic, so a stencil that reaches past the
//! ghost region is caught rather than silently reading a neighbouring channel.

mod weights;

use serde::{Deserialize, Serialize};

use crate::tensor::{Symmetric, Vector, SYM_PAIRS};
pub use weights::Stencil;

/// Accuracy of the centered difference stencils.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum Order {
    Second,
    #[default]
    Fourth,
    Sixth,
}

impl Order {
    pub fn derivative(self) -> Stencil {
        match self {
            Order::Second => weights::DERIVATIVE_2,
            Order::Fourth => weights::DERIVATIVE_4,
            Order::Sixth => weights::DERIVATIVE_6,
        }
    }

    pub fn second_derivative(self) -> Stencil {
        match self {
            Order::Second => weights::SECOND_DERIVATIVE_2,
            Order::Fourth => weights::SECOND_DERIVATIVE_4,
            Order::Sixth => weights::SECOND_DERIVATIVE_6,
        }
    }

    /// Lopsided stencil for advection terms, biased towards the positive direction.
    pub fn upwind(self) -> Stencil {
        match self {
            Order::Second => weights::UPWIND_2,
            Order::Fourth => weights::UPWIND_4,
            Order::Sixth => weights::UPWIND_6,
        }
    }

    /// Kreiss-Oliger operator one order above the derivative stencils.
    pub fn dissipation(self) -> Stencil {
        match self {
            Order::Second => weights::DISSIPATION_4,
            Order::Fourth => weights::DISSIPATION_6,
            Order::Sixth => weights::DISSIPATION_8,
        }
    }

    /// Number of ghost cells needed by every stencil of this order.
    pub fn ghost_width(self) -> usize {
        [self.derivative(), self.upwind(), self.dissipation()]
            .iter()
            .map(Stencil::reach)
            .max()
            .unwrap_or(0)
    }
}

impl TryFrom<usize> for Order {
    type Error = String;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Order::Second),
            4 => Ok(Order::Fourth),
            6 => Ok(Order::Sixth),
            _ => Err(format!("unsupported stencil order {value}, expected 2, 4 or 6")),
        }
    }
}

impl From<Order> for usize {
    fn from(value: Order) -> Self {
        match value {
            Order::Second => 2,
            Order::Fourth => 4,
            Order::Sixth => 6,
        }
    }
}

/// Finite-difference operators bound to the spacing and storage layout of one patch.
#[derive(Clone, Copy, Debug)]
pub struct Stencils {
    order: Order,
    spacing: [f64; 3],
    strides: [usize; 3],
}

impl Stencils {
    pub fn new(order: Order, spacing: [f64; 3], strides: [usize; 3]) -> Self {
        Self {
            order,
            spacing,
            strides,
        }
    }

    pub fn order(&self) -> Order {
        self.order
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    #[inline]
    fn offset(&self, point: usize, axis: usize, offset: isize) -> usize {
        (point as isize + offset * self.strides[axis] as isize) as usize
    }

    #[inline]
    fn apply(&self, stencil: &Stencil, data: &[f64], point: usize, axis: usize) -> f64 {
        let mut result = 0.0;
        for (k, weight) in stencil.weights.iter().enumerate() {
            if *weight == 0.0 {
                continue;
            }
            result += weight * data[self.offset(point, axis, stencil.start + k as isize)];
        }
        result / stencil.denominator
    }

    /// Centered first derivative along `axis`.
    pub fn derivative(&self, data: &[f64], point: usize, axis: usize) -> f64 {
        self.apply(&self.order.derivative(), data, point, axis) / self.spacing[axis]
    }

    /// Centered second derivative ∂ₐ∂ᵦ. Mixed derivatives apply the first derivative
    /// stencil along each axis in turn.
    pub fn double_derivative(&self, data: &[f64], point: usize, a: usize, b: usize) -> f64 {
        if a == b {
            let spacing = self.spacing[a];
            return self.apply(&self.order.second_derivative(), data, point, a)
                / (spacing * spacing);
        }

        let stencil = self.order.derivative();
        let mut result = 0.0;
        for (k, weight) in stencil.weights.iter().enumerate() {
            if *weight == 0.0 {
                continue;
            }
            let shifted = self.offset(point, a, stencil.start + k as isize);
            result += weight * self.apply(&stencil, data, shifted, b);
        }
        result / (stencil.denominator * self.spacing[a] * self.spacing[b])
    }

    pub fn gradient(&self, data: &[f64], point: usize) -> Vector {
        std::array::from_fn(|axis| self.derivative(data, point, axis))
    }

    pub fn hessian(&self, data: &[f64], point: usize) -> Symmetric {
        Symmetric(std::array::from_fn(|slot| {
            let [a, b] = SYM_PAIRS[slot];
            self.double_derivative(data, point, a, b)
        }))
    }

    /// `velocity * ∂f` along `axis`, using the stencil lopsided towards the direction the
    /// velocity points. Zero velocity selects the positive-direction stencil.
    pub fn upwind_derivative(&self, data: &[f64], point: usize, axis: usize, velocity: f64) -> f64 {
        let stencil = self.order.upwind();
        let mut result = 0.0;

        if velocity >= 0.0 {
            result = self.apply(&stencil, data, point, axis);
        } else {
            for (k, weight) in stencil.weights.iter().enumerate() {
                let offset = -(stencil.start + k as isize);
                result -= weight * data[self.offset(point, axis, offset)];
            }
            result /= stencil.denominator;
        }

        velocity * result / self.spacing[axis]
    }

    /// Advection term βⁱ∂ᵢf.
    pub fn advection(&self, data: &[f64], point: usize, velocity: &Vector) -> f64 {
        (0..3)
            .map(|axis| self.upwind_derivative(data, point, axis, velocity[axis]))
            .sum()
    }

    /// Kreiss-Oliger dissipation summed over all axes. A zero coefficient returns exactly
    /// zero without touching the data.
    pub fn dissipation(&self, data: &[f64], point: usize, coefficient: f64) -> f64 {
        if coefficient == 0.0 {
            return 0.0;
        }

        let stencil = self.order.dissipation();
        let total = (0..3)
            .map(|axis| self.apply(&stencil, data, point, axis) / self.spacing[axis])
            .sum::<f64>();

        coefficient * total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::IndexSpace;

    const N: usize = 12;

    fn sample(f: impl Fn([f64; 3]) -> f64, spacing: f64) -> (Vec<f64>, IndexSpace<3>) {
        let space = IndexSpace::new([N; 3]);
        let data = space
            .iter()
            .map(|index| f(index.map(|i| (i as f64 + 0.5) * spacing)))
            .collect();
        (data, space)
    }

    #[test]
    fn polynomials_are_exact() {
        let spacing = 0.1;
        let (data, space) = sample(|[x, y, z]| x * x * y + 3.0 * z * z - x * y * z + y, spacing);
        let center = space.linear_from_cartesian([6, 5, 7]);
        let [x, y, z] = [6.5 * spacing, 5.5 * spacing, 7.5 * spacing];

        for order in [Order::Second, Order::Fourth, Order::Sixth] {
            let stencils = Stencils::new(order, [spacing; 3], space.strides());
            let gradient = stencils.gradient(&data, center);
            assert!((gradient[0] - (2.0 * x * y - y * z)).abs() < 1e-10);
            assert!((gradient[1] - (x * x - x * z + 1.0)).abs() < 1e-10);
            assert!((gradient[2] - (6.0 * z - x * y)).abs() < 1e-10);

            let hessian = stencils.hessian(&data, center);
            assert!((hessian[[0, 0]] - 2.0 * y).abs() < 1e-8);
            assert!((hessian[[0, 1]] - (2.0 * x - z)).abs() < 1e-8);
            assert!((hessian[[0, 2]] + y).abs() < 1e-8);
            assert!((hessian[[1, 2]] + x).abs() < 1e-8);
            assert!((hessian[[2, 2]] - 6.0).abs() < 1e-8);
        }
    }

    #[test]
    fn upwind_follows_velocity_sign() {
        let spacing = 0.25;
        let (data, space) = sample(|[x, _, _]| x * x, spacing);
        let center = space.linear_from_cartesian([6, 6, 6]);
        let x = 6.5 * spacing;

        for order in [Order::Second, Order::Fourth, Order::Sixth] {
            let stencils = Stencils::new(order, [spacing; 3], space.strides());
            for velocity in [2.0, -3.0] {
                let value = stencils.upwind_derivative(&data, center, 0, velocity);
                assert!((value - velocity * 2.0 * x).abs() < 1e-10);
            }
            assert_eq!(stencils.upwind_derivative(&data, center, 0, 0.0), 0.0);
        }

        // A step that sits entirely on the negative side is only seen by the negative stencil.
        let (step, _) = sample(|[x, _, _]| if x < 5.0 * spacing { 1.0 } else { 0.0 }, spacing);
        let stencils = Stencils::new(Order::Second, [spacing; 3], space.strides());
        let point = space.linear_from_cartesian([6, 6, 6]);
        assert_eq!(stencils.upwind_derivative(&step, point, 0, 1.0), 0.0);
        assert!(stencils.upwind_derivative(&step, point, 0, -1.0) != 0.0);
    }

    #[test]
    fn zero_dissipation_is_exact() {
        let spacing = 0.1;
        let (data, space) = sample(|[x, y, z]| (17.0 * x).sin() * (9.0 * y).cos() + z, spacing);
        let stencils = Stencils::new(Order::Fourth, [spacing; 3], space.strides());
        let center = space.linear_from_cartesian([6, 6, 6]);

        assert_eq!(stencils.dissipation(&data, center, 0.0).to_bits(), 0.0f64.to_bits());
        assert!(stencils.dissipation(&data, center, 0.1) != 0.0);

        // Low order polynomials are annihilated.
        let (smooth, _) = sample(|[x, y, z]| x * x * y + z * z * z, spacing);
        assert!(stencils.dissipation(&smooth, center, 1.0).abs() < 1e-9);
    }

    #[test]
    fn ghost_widths() {
        assert_eq!(Order::Second.ghost_width(), 2);
        assert_eq!(Order::Fourth.ghost_width(), 3);
        assert_eq!(Order::Sixth.ghost_width(), 4);
        assert_eq!(Order::try_from(4), Ok(Order::Fourth));
        assert!(Order::try_from(3).is_err());
    }
}
