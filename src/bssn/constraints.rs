use std::f64::consts::PI;

use super::BssnData;
use crate::tensor::{one_minus_det, sum1, sum2, Axis, InvalidAxis};

/// A constraint violation together with the magnitude of the terms it was formed from.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Residual {
    pub value: f64,
    pub scale: f64,
}

impl Residual {
    /// The violation relative to its scale, or zero where every term vanishes.
    pub fn normalized(&self) -> f64 {
        if self.scale > 0.0 {
            self.value / self.scale
        } else {
            0.0
        }
    }
}

impl BssnData {
    /// Hamiltonian constraint, as computed by the point pipeline.
    pub fn hamiltonian_constraint(&self) -> Residual {
        Residual {
            value: self.hamiltonian,
            scale: self.hamiltonian_scale,
        }
    }

    /// Momentum constraint Mᵢ along a raw axis index.
    pub fn momentum_constraint(&self, axis: usize) -> Result<Residual, InvalidAxis> {
        Ok(self.momentum(Axis::try_from(axis)?))
    }

    /// Momentum constraint
    /// Mᵢ = γ̄ʲᵏ(∂ⱼĀₖᵢ - Γ̄ˡⱼₖĀₗᵢ - Γ̄ˡⱼᵢĀₖₗ) + 6γ̄ʲᵏĀᵢⱼ∂ₖφ - ⅔∂ᵢK - 8πSᵢ.
    pub fn momentum(&self, axis: Axis) -> Residual {
        let i = axis.index();
        let inv = &self.gamma_inv;
        let chris = &self.christoffel;

        let derivative = sum2(|j, k| inv[[j, k]] * self.d_a[j][[k, i]]);
        let connection = -sum2(|j, k| {
            inv[[j, k]] * sum1(|l| chris[l][[j, k]] * self.a[[l, i]] + chris[l][[j, i]] * self.a[[k, l]])
        });
        let conformal = 6.0 * sum2(|j, k| inv[[j, k]] * self.a[[i, j]] * self.d_phi[k]);
        let trace = -2.0 / 3.0 * (self.d_k[i] + 2.0 * self.d_theta[i]);
        let matter = -8.0 * PI * self.s_i[i];

        Residual {
            value: derivative + connection + conformal + trace + matter,
            scale: derivative.abs()
                + connection.abs()
                + conformal.abs()
                + trace.abs()
                + matter.abs(),
        }
    }

    /// Christoffel constraint along a raw axis index.
    pub fn christoffel_constraint(&self, axis: usize) -> Result<Residual, InvalidAxis> {
        Ok(self.christoffel_residual(Axis::try_from(axis)?))
    }

    /// Gⁱ = Γ̄ⁱ - γ̄ʲᵏΓ̄ⁱⱼₖ, the evolved contracted connection against the one computed
    /// from the metric.
    pub fn christoffel_residual(&self, axis: Axis) -> Residual {
        let i = axis.index();
        Residual {
            value: self.conn[i] - self.conn_d[i],
            scale: self.conn[i].abs() + self.conn_d[i].abs(),
        }
    }

    /// Trace of Āᵢⱼ, which should vanish identically.
    pub fn trace_constraint(&self) -> Residual {
        let inv = &self.gamma_inv;
        Residual {
            value: inv.contract(&self.a),
            scale: sum2(|i, j| (inv[[i, j]] * self.a[[i, j]]).abs()),
        }
    }

    /// |1 - det γ̄|, which should vanish identically.
    pub fn determinant_constraint(&self) -> Residual {
        let [d11, d12, d13, d22, d23, d33] = self.dgamma.0;

        let first = d11.abs() + d22.abs() + d33.abs();
        let second = (d11 * d22).abs()
            + (d11 * d33).abs()
            + (d22 * d33).abs()
            + d12 * d12
            + d13 * d13
            + d23 * d23;
        let third = (d11 * d22 * d33).abs()
            + (2.0 * d12 * d13 * d23).abs()
            + (d11 * d23 * d23).abs()
            + (d22 * d13 * d13).abs()
            + (d33 * d12 * d12).abs();

        Residual {
            value: one_minus_det(&self.dgamma).abs(),
            scale: first + second + third,
        }
    }
}
