use std::f64::consts::PI;

use super::{BssnData, BssnSystem, PatchView};
use crate::fields::Field;
use crate::tensor::{sum1, sum2, Symmetric, SYM_PAIRS};

impl BssnSystem {
    /// Time derivative of `field` at the point described by `bd`.
    ///
    /// `dt` is the step size of the level, which scales the Hamiltonian damping terms.
    pub fn rhs(&self, field: Field, bd: &BssnData, view: &PatchView<'_>, dt: f64) -> f64 {
        match field {
            Field::Metric(c) => self.ev_metric(c, bd, view, dt),
            Field::Curvature(c) => self.ev_curvature(c, bd, view, dt),
            Field::Trace => self.ev_trace(bd, view),
            Field::Conformal => self.ev_conformal(bd, view, dt),
            Field::Lapse => self.ev_lapse(bd, view),
            Field::Connection(i) => self.ev_connection(i, bd, view),
            Field::Theta => self.ev_theta(bd, view),
            Field::Shift(i) => self.ev_shift(i, bd, view),
            Field::Expansion => self.ev_expansion(bd, view),
            Field::Driver(i) => self.ev_driver(i, bd, view),
            Field::Scalar | Field::ScalarMomentum | Field::ScalarGradient(_) => {
                self.matter.rhs(field, bd, view) + self.dissipation(field, bd, view)
            }
        }
    }

    /// βⁱ∂ᵢf, or zero when the shift is not evolved.
    pub fn advection(&self, field: Field, bd: &BssnData, view: &PatchView<'_>) -> f64 {
        if !self.config.features.shift {
            return 0.0;
        }

        view.stencils
            .advection(view.field(field), bd.point, &bd.beta)
    }

    /// Kreiss-Oliger term for `field`.
    pub fn dissipation(&self, field: Field, bd: &BssnData, view: &PatchView<'_>) -> f64 {
        view.stencils.dissipation(
            view.field(field),
            bd.point,
            self.config.ko_damping_coefficient,
        )
    }

    fn divergence(bd: &BssnData) -> f64 {
        sum1(|k| bd.d_beta[k][k])
    }

    /// Lie derivative terms of a rank-2 tensor density of weight -2/3 along the shift,
    /// excluding advection.
    fn shift_terms(&self, t: &Symmetric, [i, j]: [usize; 2], bd: &BssnData) -> f64 {
        if !self.config.features.shift {
            return 0.0;
        }

        sum1(|k| t[[i, k]] * bd.d_beta[j][k] + t[[j, k]] * bd.d_beta[i][k])
            - 2.0 / 3.0 * t[[i, j]] * Self::divergence(bd)
    }

    fn ev_metric(&self, c: usize, bd: &BssnData, view: &PatchView<'_>, dt: f64) -> f64 {
        let [i, j] = SYM_PAIRS[c];
        let field = Field::Metric(c);

        -2.0 * bd.alpha * bd.a[[i, j]]
            + self.shift_terms(&bd.gamma, [i, j], bd)
            + self.advection(field, bd, view)
            + 0.5 * self.config.damping.bs_h * dt * bd.hamiltonian * bd.dgamma[[i, j]]
            + self.dissipation(field, bd, view)
    }

    fn ev_curvature(&self, c: usize, bd: &BssnData, view: &PatchView<'_>, dt: f64) -> f64 {
        let [i, j] = SYM_PAIRS[c];
        let field = Field::Curvature(c);
        let inv = &bd.gamma_inv;

        let stress_trace = inv.contract(&bd.s_ij);
        let stress_tf = bd.s_ij[[i, j]] - bd.gamma[[i, j]] * stress_trace / 3.0;

        let source = bd.alpha * (bd.ricci_tf[[i, j]] - 8.0 * PI * stress_tf)
            - bd.cov_dd_alpha_tf[[i, j]];

        // The Z4c trace variable, without the 2θ correction.
        let k = bd.dk + bd.frw.k;
        let aa = sum2(|l, m| bd.a[[i, l]] * inv[[l, m]] * bd.a[[m, j]]);

        bd.em4phi * source
            + bd.alpha * (k * bd.a[[i, j]] - 2.0 * aa)
            + self.shift_terms(&bd.a, [i, j], bd)
            + self.advection(field, bd, view)
            - self.config.damping.bs_h * dt * bd.a[[i, j]] * bd.hamiltonian
            + self.dissipation(field, bd, view)
    }

    fn ev_trace(&self, bd: &BssnData, view: &PatchView<'_>) -> f64 {
        let kf = bd.frw.k;
        let kd = bd.k_diff;

        let quadratic = if self.config.features.exclude_second_order_frw {
            2.0 / 3.0 * kd * kf
        } else {
            kd * (kd + 2.0 * kf) / 3.0
        };

        let matter = 4.0 * PI * bd.alpha * (bd.rho + bd.s) - 4.0 * PI * (bd.frw.rho + bd.frw.s);

        let mut result = -bd.laplacian_alpha
            + bd.alpha * (quadratic + bd.aij_aij)
            + bd.dalpha * kf * kf / 3.0
            + matter
            + self.advection(Field::Trace, bd, view)
            - self.config.damping.jm_k * bd.hamiltonian * (-5.0 * bd.phi).exp();

        if self.config.features.z4c {
            let damping = &self.config.damping;
            result += damping.z4c_k1 * (1.0 - damping.z4c_k2) * bd.theta;
        }

        result + self.dissipation(Field::Trace, bd, view)
    }

    fn ev_conformal(&self, bd: &BssnData, view: &PatchView<'_>, dt: f64) -> f64 {
        let divergence = if self.config.features.shift {
            Self::divergence(bd)
        } else {
            0.0
        };

        0.1 * self.config.damping.bs_h * dt * bd.hamiltonian
            - (bd.alpha * bd.k_diff - bd.dalpha * bd.frw.k - divergence) / 6.0
            + self.advection(Field::Conformal, bd, view)
            + self.dissipation(Field::Conformal, bd, view)
    }

    fn ev_lapse(&self, bd: &BssnData, view: &PatchView<'_>) -> f64 {
        self.gauge.lapse(bd)
            + self.advection(Field::Lapse, bd, view)
            + self.dissipation(Field::Lapse, bd, view)
    }

    fn ev_connection(&self, i: usize, bd: &BssnData, view: &PatchView<'_>) -> f64 {
        let inv = &bd.gamma_inv;
        let a_up = &bd.a_up;
        let field = Field::Connection(i);

        let mut result = -2.0 * sum1(|j| a_up[[i, j]] * bd.d_alpha[j])
            + 2.0
                * bd.alpha
                * (bd.christoffel[i].contract(a_up)
                    - 2.0 / 3.0 * sum1(|j| inv[[i, j]] * bd.d_k[j])
                    - 8.0 * PI * sum1(|j| inv[[i, j]] * bd.s_i[j])
                    + 6.0 * sum1(|j| a_up[[i, j]] * bd.d_phi[j]));

        if self.config.features.z4c {
            result += 2.0 * sum1(|j| inv[[i, j]] * (bd.alpha * bd.d_theta[j] - bd.theta * bd.d_alpha[j]))
                - 2.0 * bd.alpha * self.config.damping.z4c_k1 * (bd.conn[i] - bd.conn_d[i]);
        }

        if self.config.features.shift {
            let divergence = Self::divergence(bd);
            result += self.advection(field, bd, view)
                - sum1(|j| bd.conn_d[j] * bd.d_beta[j][i])
                + 2.0 / 3.0 * bd.conn_d[i] * divergence
                + sum1(|l| inv[[i, l]] * sum1(|j| bd.dd_beta[j][[l, j]])) / 3.0
                + inv.contract(&bd.dd_beta[i]);
        }

        result + self.dissipation(field, bd, view)
    }

    fn ev_theta(&self, bd: &BssnData, view: &PatchView<'_>) -> f64 {
        let damping = &self.config.damping;

        0.5 * bd.alpha
            * (bd.ricci_scalar + 2.0 / 3.0 * bd.k * bd.k - bd.aij_aij - 16.0 * PI * bd.rho)
            + self.advection(Field::Theta, bd, view)
            - bd.alpha * damping.z4c_k1 * (2.0 + damping.z4c_k2) * bd.theta
            + self.dissipation(Field::Theta, bd, view)
    }

    fn ev_shift(&self, i: usize, bd: &BssnData, view: &PatchView<'_>) -> f64 {
        self.gauge.shift(bd, i) + self.dissipation(Field::Shift(i), bd, view)
    }

    fn ev_expansion(&self, bd: &BssnData, view: &PatchView<'_>) -> f64 {
        self.advection(Field::Expansion, bd, view) - bd.alpha * bd.k / 3.0
    }

    fn ev_driver(&self, i: usize, bd: &BssnData, view: &PatchView<'_>) -> f64 {
        let driver = bd.driver.map_or(0.0, |driver| driver[i]);

        0.75 * self.ev_connection(i, bd, view) - self.config.gauge.eta * driver
            + self.dissipation(Field::Driver(i), bd, view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::{BackgroundValues, Constant};
    use crate::config::BssnConfig;
    use crate::fd::{Order, Stencils};
    use crate::fields::{Channels, SOURCE_COUNT};
    use crate::geometry::IndexSpace;

    struct Grid {
        layout: crate::fields::FieldLayout,
        active: Channels,
        sources: Channels,
        space: IndexSpace<3>,
    }

    impl Grid {
        fn new(system: &BssnSystem, n: usize) -> Self {
            let space = IndexSpace::new([n; 3]);
            let layout = system.layout().clone();
            Self {
                active: Channels::new(layout.len(), space.index_count()),
                sources: Channels::new(SOURCE_COUNT, space.index_count()),
                layout,
                space,
            }
        }

        fn view(&self, spacing: f64) -> PatchView<'_> {
            PatchView {
                layout: &self.layout,
                active: &self.active,
                sources: &self.sources,
                stencils: Stencils::new(Order::Fourth, [spacing; 3], self.space.strides()),
                space: self.space,
                origin: [0.5 * spacing; 3],
                time: 0.0,
            }
        }
    }

    fn everything() -> BssnConfig {
        let mut config = BssnConfig::default();
        config.features.z4c = true;
        config.features.shift = true;
        config.features.gamma_driver = true;
        config.features.expansion = true;
        config.gauge.lapse = crate::gauge::LapseCondition::OnePlusLog;
        config.gauge.shift = crate::gauge::ShiftCondition::GammaDriver;
        config.damping.bs_h = 0.1;
        config.damping.jm_k = 0.1;
        config.damping.z4c_k1 = 0.1;
        config.ko_damping_coefficient = 0.2;
        config
    }

    #[test]
    fn flat_space_is_stationary() {
        let system = BssnSystem::new(everything()).unwrap();
        let grid = Grid::new(&system, 10);
        let view = grid.view(0.1);
        let point = grid.space.linear_from_cartesian([5, 4, 5]);

        let bd = system.point(&view, point);
        assert_eq!(bd.ricci_scalar, 0.0);
        assert_eq!(bd.hamiltonian, 0.0);

        for &field in system.layout().fields() {
            assert_eq!(system.rhs(field, &bd, &view, 0.01), 0.0, "{field}");
        }
    }

    #[test]
    fn zero_dissipation_matches_undamped() {
        let mut config = everything();
        config.ko_damping_coefficient = 0.0;
        let system = BssnSystem::new(config).unwrap();
        let mut grid = Grid::new(&system, 10);

        // A smooth but otherwise arbitrary state.
        for slot in 0..system.layout().len() {
            let channel = grid.active.channel_mut(slot);
            for (point, index) in grid.space.iter().enumerate() {
                let [x, y, z] = index.map(|i| i as f64 * 0.1);
                channel[point] = 1e-3
                    * (slot as f64 + 1.0)
                    * (x + 2.0 * y * y - z * x + (3.0 * z).sin());
            }
        }

        let view = grid.view(0.1);
        let point = grid.space.linear_from_cartesian([5, 5, 4]);
        let bd = system.point(&view, point);

        for &field in system.layout().fields() {
            assert_eq!(system.dissipation(field, &bd, &view).to_bits(), 0.0f64.to_bits());
        }

        let mut damped = everything();
        damped.ko_damping_coefficient = 0.5;
        let damped = BssnSystem::new(damped).unwrap();
        let trace = system.rhs(Field::Trace, &bd, &view, 0.01);
        let damped_trace = damped.rhs(Field::Trace, &bd, &view, 0.01);
        let expected = trace + damped.dissipation(Field::Trace, &bd, &view);
        assert!((damped_trace - expected).abs() < 1e-14);
    }

    #[test]
    fn curvature_drives_metric() {
        let system = BssnSystem::new(BssnConfig::default()).unwrap();
        let mut grid = Grid::new(&system, 10);
        let slot = system.layout().channel(Field::Curvature(3));
        grid.active.channel_mut(slot).fill(0.25);

        let view = grid.view(0.1);
        let bd = system.point(&view, grid.space.linear_from_cartesian([5, 5, 5]));

        assert!((system.rhs(Field::Metric(3), &bd, &view, 0.01) + 0.5).abs() < 1e-15);
        assert_eq!(system.rhs(Field::Metric(0), &bd, &view, 0.01), 0.0);
    }

    #[test]
    fn background_terms() {
        let background = Constant(BackgroundValues {
            k: 0.3,
            rho: 0.02,
            s: 0.01,
            phi: 0.0,
        });
        let system = BssnSystem::new(BssnConfig::default())
            .unwrap()
            .with_background(background);
        let mut grid = Grid::new(&system, 10);
        let slot = system.layout().channel(Field::Lapse);
        grid.active.channel_mut(slot).fill(0.5);

        let view = grid.view(0.1);
        let bd = system.point(&view, grid.space.linear_from_cartesian([5, 5, 5]));
        assert_eq!(bd.frw.k, 0.3);
        assert_eq!(bd.k_diff, 0.0);

        // ∂ₜΔφ = -(αΔK - ΔαK_FRW)/6
        let conformal = system.rhs(Field::Conformal, &bd, &view, 0.01);
        assert!((conformal - 0.025).abs() < 1e-14, "{conformal}");

        // ∂ₜΔK = ΔαK_FRW²/3 - 4π(ρ_FRW + S_FRW)
        let trace = system.rhs(Field::Trace, &bd, &view, 0.01);
        let expected = 0.5 * 0.09 / 3.0 - 4.0 * PI * 0.03;
        assert!((trace - expected).abs() < 1e-14, "{trace}");

        // Without a lapse perturbation the background sources alone drive ΔK.
        grid.active.channel_mut(slot).fill(0.0);
        let view = grid.view(0.1);
        let bd = system.point(&view, grid.space.linear_from_cartesian([5, 5, 5]));
        assert!(system.rhs(Field::Conformal, &bd, &view, 0.01).abs() < 1e-14);
        let trace = system.rhs(Field::Trace, &bd, &view, 0.01);
        assert!((trace + 4.0 * PI * 0.03).abs() < 1e-14);
    }
}
