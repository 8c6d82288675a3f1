//! Named grid quantities and their per-patch storage.

mod channels;
mod store;

use std::fmt;

pub use channels::Channels;
pub use store::{FieldStore, Registers};

const AXES: [char; 3] = ['x', 'y', 'z'];
const PAIRS: [&str; 6] = ["xx", "xy", "xz", "yy", "yz", "zz"];

/// An evolved scalar grid quantity. Tensor components are indexed by their slot in
/// [`crate::tensor::SYM_PAIRS`] (rank 2) or by axis (rank 1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    /// Δγ̄ᵢⱼ, the conformal metric minus the flat metric.
    Metric(usize),
    /// Āᵢⱼ, the trace-free conformal extrinsic curvature.
    Curvature(usize),
    /// ΔK, the trace of the extrinsic curvature minus its reference value.
    Trace,
    /// Δφ, the conformal factor exponent minus its reference value.
    Conformal,
    /// Δα = α - 1.
    Lapse,
    /// Γ̄ⁱ, the contracted conformal connection.
    Connection(usize),
    /// θ, the Z4c constraint damping scalar.
    Theta,
    /// βⁱ
    Shift(usize),
    /// Number of e-folds of local expansion.
    Expansion,
    /// Bⁱ, auxiliary variable of the Gamma-driver shift.
    Driver(usize),
    /// Scalar field value.
    Scalar,
    /// Scalar field momentum Π.
    ScalarMomentum,
    /// ψᵢ = ∂ᵢφ of the scalar field.
    ScalarGradient(usize),
}

/// Number of distinct field identifiers.
pub const FIELD_COUNT: usize = 31;

impl Field {
    /// A dense identifier in `0..FIELD_COUNT`.
    pub const fn id(self) -> usize {
        match self {
            Field::Metric(c) => c,
            Field::Curvature(c) => 6 + c,
            Field::Trace => 12,
            Field::Conformal => 13,
            Field::Lapse => 14,
            Field::Connection(i) => 15 + i,
            Field::Theta => 18,
            Field::Shift(i) => 19 + i,
            Field::Expansion => 22,
            Field::Driver(i) => 23 + i,
            Field::Scalar => 26,
            Field::ScalarMomentum => 27,
            Field::ScalarGradient(i) => 28 + i,
        }
    }

    /// The fields evolved for every BSSN configuration.
    pub fn core() -> impl Iterator<Item = Field> {
        (0..6)
            .map(Field::Metric)
            .chain((0..6).map(Field::Curvature))
            .chain([Field::Trace, Field::Conformal, Field::Lapse])
            .chain((0..3).map(Field::Connection))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Field::Metric(c) => write!(f, "gamma_{}", PAIRS[c]),
            Field::Curvature(c) => write!(f, "a_{}", PAIRS[c]),
            Field::Trace => write!(f, "k"),
            Field::Conformal => write!(f, "phi"),
            Field::Lapse => write!(f, "alpha"),
            Field::Connection(i) => write!(f, "conn_{}", AXES[i]),
            Field::Theta => write!(f, "theta"),
            Field::Shift(i) => write!(f, "beta_{}", AXES[i]),
            Field::Expansion => write!(f, "expn"),
            Field::Driver(i) => write!(f, "auxb_{}", AXES[i]),
            Field::Scalar => write!(f, "scalar_phi"),
            Field::ScalarMomentum => write!(f, "scalar_pi"),
            Field::ScalarGradient(i) => write!(f, "scalar_psi_{}", AXES[i]),
        }
    }
}

/// Matter source terms, recomputed from the matter fields before each right-hand side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    /// Energy density ρ.
    Density,
    /// Trace S = γⁱʲSᵢⱼ.
    Trace,
    /// Momentum density Sᵢ.
    Momentum(usize),
    /// Stress Sᵢⱼ.
    Stress(usize),
}

pub const SOURCE_COUNT: usize = 11;

impl Source {
    pub const fn channel(self) -> usize {
        match self {
            Source::Density => 0,
            Source::Trace => 1,
            Source::Momentum(i) => 2 + i,
            Source::Stress(c) => 5 + c,
        }
    }
}

/// Derived quantities written back to the grid by the point pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Extra {
    /// Ricci scalar of the physical metric.
    Ricci,
    /// ĀᵢⱼĀⁱʲ
    AijAij,
}

pub const EXTRA_COUNT: usize = 2;

impl Extra {
    pub const fn channel(self) -> usize {
        match self {
            Extra::Ricci => 0,
            Extra::AijAij => 1,
        }
    }
}

/// Time level of field storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Register {
    /// Values at the start of the current step.
    Previous,
    /// Values being advanced; the input of every right-hand side.
    Active,
    /// Completed full step.
    Final,
    Scratch,
    /// Right-hand side accumulated in the given RK4 stage (1..=4).
    Stage(usize),
}

pub const REGISTER_COUNT: usize = 8;

impl Register {
    pub const ALL: [Register; REGISTER_COUNT] = [
        Register::Previous,
        Register::Active,
        Register::Final,
        Register::Scratch,
        Register::Stage(1),
        Register::Stage(2),
        Register::Stage(3),
        Register::Stage(4),
    ];

    pub const fn slot(self) -> usize {
        match self {
            Register::Previous => 0,
            Register::Active => 1,
            Register::Final => 2,
            Register::Scratch => 3,
            Register::Stage(n) => {
                assert!(n >= 1 && n <= 4, "RK4 has stages 1 through 4");
                3 + n
            }
        }
    }
}

/// The ordered set of fields evolved on every patch of a hierarchy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldLayout {
    fields: Vec<Field>,
    slots: [Option<usize>; FIELD_COUNT],
}

impl FieldLayout {
    pub fn new(fields: impl IntoIterator<Item = Field>) -> Self {
        let mut result = Self {
            fields: Vec::new(),
            slots: [None; FIELD_COUNT],
        };

        for field in fields {
            if result.slots[field.id()].is_none() {
                result.slots[field.id()] = Some(result.fields.len());
                result.fields.push(field);
            }
        }

        result
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: Field) -> bool {
        self.slots[field.id()].is_some()
    }

    /// Channel index of `field`, if it is evolved.
    pub fn slot(&self, field: Field) -> Option<usize> {
        self.slots[field.id()]
    }

    /// Channel index of a field that must be present.
    pub fn channel(&self, field: Field) -> usize {
        match self.slots[field.id()] {
            Some(slot) => slot,
            None => panic!("field {field} is not evolved in this layout"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_dense() {
        let all: Vec<Field> = Field::core()
            .chain([Field::Theta, Field::Expansion, Field::Scalar, Field::ScalarMomentum])
            .chain((0..3).map(Field::Shift))
            .chain((0..3).map(Field::Driver))
            .chain((0..3).map(Field::ScalarGradient))
            .collect();
        assert_eq!(all.len(), FIELD_COUNT);

        let mut seen = [false; FIELD_COUNT];
        for field in all {
            assert!(!seen[field.id()]);
            seen[field.id()] = true;
        }
    }

    #[test]
    fn layout_slots() {
        let layout = FieldLayout::new(Field::core().chain([Field::Theta, Field::Lapse]));
        assert_eq!(layout.len(), 19);
        assert_eq!(layout.channel(Field::Theta), 18);
        assert_eq!(layout.slot(Field::Shift(0)), None);
        assert_eq!(format!("{}", Field::Metric(4)), "gamma_yz");
    }
}
