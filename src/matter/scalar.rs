use std::array;

use super::{Matter, SourceTerms};
use crate::background::BackgroundValues;
use crate::bssn::{BssnData, PatchView};
use crate::fields::Field;
use crate::tensor::{delta, sum1, sum2, unit_inverse, Symmetric};

/// A minimally coupled scalar field with potential V(φ) = ½m²φ² + Λ.
///
/// Evolved in first order form with Π = -nᵘ∂ᵤφ and ψᵢ = ∂ᵢφ.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScalarField {
    pub mass: f64,
    pub lambda: f64,
}

impl ScalarField {
    pub fn potential(&self, phi: f64) -> f64 {
        0.5 * self.mass * self.mass * phi * phi + self.lambda
    }

    pub fn potential_derivative(&self, phi: f64) -> f64 {
        self.mass * self.mass * phi
    }
}

impl Matter for ScalarField {
    fn fields(&self) -> Vec<Field> {
        [Field::Scalar, Field::ScalarMomentum]
            .into_iter()
            .chain((0..3).map(Field::ScalarGradient))
            .collect()
    }

    fn sources(&self, view: &PatchView<'_>, point: usize, frw: &BackgroundValues) -> SourceTerms {
        let dgamma = Symmetric(array::from_fn(|c| view.field(Field::Metric(c))[point]));
        let inv = unit_inverse(&dgamma);
        let phi = view.field(Field::Conformal)[point] + frw.phi;
        let em4phi = (-4.0 * phi).exp();

        let value = view.field(Field::Scalar)[point];
        let pi = view.field(Field::ScalarMomentum)[point];
        let psi: [f64; 3] = array::from_fn(|i| view.field(Field::ScalarGradient(i))[point]);

        let gradient_squared = em4phi * sum2(|i, j| inv[[i, j]] * psi[i] * psi[j]);
        let potential = self.potential(value);
        // Lagrangian-like combination multiplying the metric in Sᵢⱼ.
        let pressure = 0.5 * (pi * pi - gradient_squared) - potential;

        SourceTerms {
            rho: 0.5 * pi * pi + 0.5 * gradient_squared + potential,
            s: 1.5 * pi * pi - 0.5 * gradient_squared - 3.0 * potential,
            s_i: array::from_fn(|i| pi * psi[i]),
            s_ij: Symmetric::from_fn(|[i, j]| {
                psi[i] * psi[j] + pressure * (dgamma[[i, j]] + delta(i, j)) / em4phi
            }),
        }
    }

    fn rhs(&self, field: Field, bd: &BssnData, view: &PatchView<'_>) -> f64 {
        let point = bd.point;
        let stencils = &view.stencils;
        let pi = view.field(Field::ScalarMomentum)[point];
        let psi: [f64; 3] = array::from_fn(|i| view.field(Field::ScalarGradient(i))[point]);
        let advection = stencils.advection(view.field(field), point, &bd.beta);

        match field {
            Field::Scalar => -bd.alpha * pi + advection,
            Field::ScalarMomentum => {
                let inv = &bd.gamma_inv;
                let d_psi: [[f64; 3]; 3] = array::from_fn(|i| {
                    stencils.gradient(view.field(Field::ScalarGradient(i)), point)
                });

                let laplacian = sum2(|i, j| inv[[i, j]] * d_psi[i][j])
                    - sum1(|k| bd.conn_d[k] * psi[k])
                    + 2.0 * sum2(|k, l| inv[[k, l]] * bd.d_phi[l] * psi[k]);
                let lapse = sum2(|i, j| inv[[i, j]] * psi[i] * bd.d_alpha[j]);
                let value = view.field(Field::Scalar)[point];

                advection + bd.alpha * bd.k * pi - bd.em4phi * (bd.alpha * laplacian + lapse)
                    + bd.alpha * self.potential_derivative(value)
            }
            Field::ScalarGradient(i) => {
                let d_pi = stencils.derivative(view.field(Field::ScalarMomentum), point, i);
                -pi * bd.d_alpha[i] - bd.alpha * d_pi
                    + advection
                    + sum1(|j| psi[j] * bd.d_beta[i][j])
            }
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn potential() {
        let field = ScalarField {
            mass: 2.0,
            lambda: 0.5,
        };
        assert_eq!(field.potential(1.0), 2.5);
        assert_eq!(field.potential_derivative(0.5), 2.0);
        assert_eq!(field.fields().len(), 5);
    }
}
