use std::array;
use std::f64::consts::PI;

use super::PatchView;
use crate::background::{Background, BackgroundValues};
use crate::config::BssnConfig;
use crate::fields::{Field, Source};
use crate::tensor::{delta, sum1, sum2, sum3, sym, unit_inverse, Symmetric, Vector, SYM_PAIRS};

/// Every quantity needed to evaluate the right-hand sides at a single grid point.
///
/// Built fresh for each point of each stage by [`BssnData::compute`] and dropped once
/// the right-hand sides have been evaluated. Conformal quantities (barred in the
/// literature) are stored without decoration.
#[derive(Clone, Debug, Default)]
pub struct BssnData {
    /// Linear storage index of the point.
    pub point: usize,
    pub position: [f64; 3],
    pub time: f64,

    // ********************
    // Evolved values

    /// Δγ̄ᵢⱼ
    pub dgamma: Symmetric,
    /// Āᵢⱼ
    pub a: Symmetric,
    /// ΔK
    pub dk: f64,
    /// Δφ
    pub dphi: f64,
    /// Δα
    pub dalpha: f64,
    /// Evolved Γ̄ⁱ.
    pub conn: Vector,
    pub theta: f64,
    pub beta: Vector,
    pub expansion: f64,
    /// Bⁱ, present only when the Gamma-driver auxiliary field is evolved.
    pub driver: Option<Vector>,

    // *******************
    // Matter sources

    pub rho: f64,
    pub s: f64,
    pub s_i: Vector,
    pub s_ij: Symmetric,

    pub frw: BackgroundValues,

    // *******************
    // Reconstructed values

    /// γ̄ᵢⱼ
    pub gamma: Symmetric,
    /// γ̄ⁱʲ
    pub gamma_inv: Symmetric,
    /// ΔK + 2θ
    pub k_diff: f64,
    /// Full trace K = ΔK + 2θ + K_FRW.
    pub k: f64,
    pub phi: f64,
    pub alpha: f64,
    /// e⁻⁴ᵠ
    pub em4phi: f64,
    /// Āⁱʲ
    pub a_up: Symmetric,
    /// ĀᵢⱼĀⁱʲ
    pub aij_aij: f64,

    // *******************
    // Derivatives

    /// ∂ₖγ̄ᵢⱼ indexed `[k][[i, j]]`.
    pub d_gamma: [Symmetric; 3],
    /// ∂ₖ∂ₗγ̄ᵢⱼ indexed `[sym(k, l)][[i, j]]`.
    pub dd_gamma: [Symmetric; 6],
    /// ∂ₖĀᵢⱼ indexed `[k][[i, j]]`.
    pub d_a: [Symmetric; 3],
    pub d_k: Vector,
    pub d_phi: Vector,
    pub dd_phi: Symmetric,
    pub d_alpha: Vector,
    pub dd_alpha: Symmetric,
    pub d_theta: Vector,
    /// ∂ⱼΓ̄ⁱ indexed `[j][i]`.
    pub d_conn: [Vector; 3],
    /// ∂ⱼβⁱ indexed `[j][i]`.
    pub d_beta: [Vector; 3],
    /// ∂ⱼ∂ₖβⁱ indexed `[i][[j, k]]`.
    pub dd_beta: [Symmetric; 3],

    // *******************
    // Geometry

    /// Γ̄ⁱⱼₖ indexed `[i][[j, k]]`.
    pub christoffel: [Symmetric; 3],
    /// Γ̄ᵢⱼₖ indexed `[i][[j, k]]`.
    pub christoffel_lower: [Symmetric; 3],
    /// γ̄ʲᵏΓ̄ⁱⱼₖ
    pub conn_d: Vector,
    /// D̄ᵢD̄ⱼφ
    pub cov_dd_phi: Symmetric,
    /// Trace-free part of DᵢDⱼα.
    pub cov_dd_alpha_tf: Symmetric,
    /// D²α with respect to the full metric.
    pub laplacian_alpha: f64,
    /// Full Ricci tensor Rᵢⱼ.
    pub ricci: Symmetric,
    /// Trace-free part of Rᵢⱼ.
    pub ricci_tf: Symmetric,
    /// Ricci scalar R.
    pub ricci_scalar: f64,

    // *******************
    // Constraints

    pub hamiltonian: f64,
    pub hamiltonian_scale: f64,
}

impl BssnData {
    /// Populates every derived quantity at `point`. Each stage reads only the results
    /// of the stages before it.
    pub fn compute(
        view: &PatchView<'_>,
        point: usize,
        config: &BssnConfig,
        background: &dyn Background,
    ) -> Self {
        let position = view.position(point);

        let mut bd = BssnData {
            point,
            position,
            time: view.time,
            frw: background.values(view.time, position),
            ..Default::default()
        };

        bd.load(view);
        bd.reconstruct();
        bd.inverse_metric();
        bd.contravariant_curvature();
        bd.derivatives(view);
        bd.christoffels();
        bd.conformal_hessian();
        bd.lapse_hessian();
        bd.ricci(config.features.exclude_second_order_frw);
        bd.hamiltonian();

        bd
    }

    fn load(&mut self, view: &PatchView<'_>) {
        let point = self.point;
        let value = |field: Field| view.field(field)[point];
        let optional = |field: Field| view.optional(field).map_or(0.0, |data| data[point]);

        self.dgamma = Symmetric(array::from_fn(|c| value(Field::Metric(c))));
        self.a = Symmetric(array::from_fn(|c| value(Field::Curvature(c))));
        self.dk = value(Field::Trace);
        self.dphi = value(Field::Conformal);
        self.dalpha = value(Field::Lapse);
        self.conn = array::from_fn(|i| value(Field::Connection(i)));
        self.theta = optional(Field::Theta);
        self.beta = array::from_fn(|i| optional(Field::Shift(i)));
        self.expansion = optional(Field::Expansion);

        if view.layout.contains(Field::Driver(0)) {
            self.driver = Some(array::from_fn(|i| value(Field::Driver(i))));
        }

        self.rho = view.source(Source::Density)[point];
        self.s = view.source(Source::Trace)[point];
        self.s_i = array::from_fn(|i| view.source(Source::Momentum(i))[point]);
        self.s_ij = Symmetric(array::from_fn(|c| view.source(Source::Stress(c))[point]));
    }

    fn reconstruct(&mut self) {
        self.gamma = Symmetric::from_fn(|[i, j]| delta(i, j) + self.dgamma[[i, j]]);
        self.k_diff = self.dk + 2.0 * self.theta;
        self.k = self.k_diff + self.frw.k;
        self.phi = self.dphi + self.frw.phi;
        self.alpha = 1.0 + self.dalpha;
        self.em4phi = (-4.0 * self.phi).exp();
    }

    fn inverse_metric(&mut self) {
        self.gamma_inv = unit_inverse(&self.dgamma);
    }

    fn contravariant_curvature(&mut self) {
        self.a_up = self.a.raise(&self.gamma_inv);
        self.aij_aij = self.a_up.contract(&self.a);
    }

    fn derivatives(&mut self, view: &PatchView<'_>) {
        let point = self.point;
        let stencils = &view.stencils;

        let metric: [&[f64]; 6] = array::from_fn(|c| view.field(Field::Metric(c)));
        let curvature: [&[f64]; 6] = array::from_fn(|c| view.field(Field::Curvature(c)));

        self.d_gamma = array::from_fn(|k| {
            Symmetric(array::from_fn(|c| stencils.derivative(metric[c], point, k)))
        });
        self.dd_gamma = array::from_fn(|s| {
            let [k, l] = SYM_PAIRS[s];
            Symmetric(array::from_fn(|c| {
                stencils.double_derivative(metric[c], point, k, l)
            }))
        });
        self.d_a = array::from_fn(|k| {
            Symmetric(array::from_fn(|c| stencils.derivative(curvature[c], point, k)))
        });

        self.d_k = stencils.gradient(view.field(Field::Trace), point);

        let phi = view.field(Field::Conformal);
        self.d_phi = stencils.gradient(phi, point);
        self.dd_phi = stencils.hessian(phi, point);

        let alpha = view.field(Field::Lapse);
        self.d_alpha = stencils.gradient(alpha, point);
        self.dd_alpha = stencils.hessian(alpha, point);

        self.d_conn = array::from_fn(|j| {
            array::from_fn(|i| stencils.derivative(view.field(Field::Connection(i)), point, j))
        });

        if let Some(theta) = view.optional(Field::Theta) {
            self.d_theta = stencils.gradient(theta, point);
        }

        if view.layout.contains(Field::Shift(0)) {
            let shift: [&[f64]; 3] = array::from_fn(|i| view.field(Field::Shift(i)));
            self.d_beta =
                array::from_fn(|j| array::from_fn(|i| stencils.derivative(shift[i], point, j)));
            self.dd_beta = array::from_fn(|i| stencils.hessian(shift[i], point));
        }
    }

    fn christoffels(&mut self) {
        let d = &self.d_gamma;

        self.christoffel_lower = array::from_fn(|i| {
            Symmetric::from_fn(|[j, k]| 0.5 * (d[j][[i, k]] + d[k][[i, j]] - d[i][[j, k]]))
        });

        let lower = &self.christoffel_lower;
        let inv = &self.gamma_inv;
        self.christoffel = array::from_fn(|i| {
            Symmetric::from_fn(|[j, k]| sum1(|l| inv[[i, l]] * lower[l][[j, k]]))
        });

        self.conn_d = array::from_fn(|i| inv.contract(&self.christoffel[i]));
    }

    fn conformal_hessian(&mut self) {
        self.cov_dd_phi = Symmetric::from_fn(|[i, j]| {
            self.dd_phi[[i, j]] - sum1(|k| self.christoffel[k][[i, j]] * self.d_phi[k])
        });
    }

    fn lapse_hessian(&mut self) {
        let inv = &self.gamma_inv;
        let dphi_dalpha = sum2(|k, l| inv[[k, l]] * self.d_phi[k] * self.d_alpha[l]);

        let dd_alpha = Symmetric::from_fn(|[i, j]| {
            self.dd_alpha[[i, j]] - sum1(|k| self.christoffel[k][[i, j]] * self.d_alpha[k])
                - 2.0 * (self.d_phi[i] * self.d_alpha[j] + self.d_phi[j] * self.d_alpha[i])
                + 2.0 * self.gamma[[i, j]] * dphi_dalpha
        });

        let trace = inv.contract(&dd_alpha);
        self.cov_dd_alpha_tf =
            Symmetric::from_fn(|[i, j]| dd_alpha[[i, j]] - self.gamma[[i, j]] * trace / 3.0);
        self.laplacian_alpha = self.em4phi * trace;
    }

    fn ricci(&mut self, exclude_second_order: bool) {
        let inv = &self.gamma_inv;
        let gamma = &self.gamma;
        let upper = &self.christoffel;
        let lower = &self.christoffel_lower;

        let unitary = Symmetric::from_fn(|[i, j]| {
            let mut result =
                -0.5 * sum2(|l, m| inv[[l, m]] * self.dd_gamma[sym(l, m)][[i, j]]);
            result += 0.5
                * sum1(|k| gamma[[k, i]] * self.d_conn[j][k] + gamma[[k, j]] * self.d_conn[i][k]);
            result += 0.5 * sum1(|k| self.conn_d[k] * (lower[i][[j, k]] + lower[j][[i, k]]));
            result += sum3(|k, l, m| {
                inv[[l, m]]
                    * (upper[k][[l, i]] * lower[j][[k, m]]
                        + upper[k][[l, j]] * lower[i][[k, m]]
                        + upper[k][[i, m]] * lower[k][[l, j]])
            });
            result
        });

        let laplacian_phi = inv.contract(&self.cov_dd_phi);
        let dphi_squared = sum2(|k, l| inv[[k, l]] * self.d_phi[k] * self.d_phi[l]);

        let conformal = Symmetric::from_fn(|[i, j]| {
            let mut result =
                -2.0 * self.cov_dd_phi[[i, j]] - 2.0 * gamma[[i, j]] * laplacian_phi;
            if !exclude_second_order {
                result += 4.0 * self.d_phi[i] * self.d_phi[j]
                    - 4.0 * gamma[[i, j]] * dphi_squared;
            }
            result
        });

        self.ricci = Symmetric::from_fn(|[i, j]| unitary[[i, j]] + conformal[[i, j]]);

        let trace = inv.contract(&self.ricci);
        self.ricci_scalar = self.em4phi * trace;
        self.ricci_tf = Symmetric::from_fn(|[i, j]| self.ricci[[i, j]] - gamma[[i, j]] * trace / 3.0);
    }

    fn hamiltonian(&mut self) {
        let prefactor = -(5.0 * self.phi).exp() / 8.0;
        let curvature = 2.0 / 3.0 * self.k * self.k;
        let matter = 16.0 * PI * self.rho;

        self.hamiltonian = prefactor * (self.ricci_scalar + curvature - self.aij_aij - matter);
        self.hamiltonian_scale = prefactor.abs()
            * (self.ricci_scalar.powi(2)
                + self.aij_aij.powi(2)
                + curvature.powi(2)
                + matter.powi(2))
            .sqrt();
    }
}
