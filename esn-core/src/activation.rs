use crate::Weight;

/// The activation functions applied to reservoir states and outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// The identity function
    Identity,
    /// The hyperbolic tangent
    Tanh,
    /// `1 / (1 + e^x)`. Note the non-standard sign: this flips
    /// monotonicity versus the conventional sigmoid `1 / (1 + e^-x)`.
    /// Trained weights and the inverse assume this exact form.
    Logistic,
    /// `1` if the value exceeds the neuron threshold, else `0`.
    /// Reservoir-only: it has no inverse.
    Heaviside,
}

impl Activation {
    /// Apply the forward activation to a single value.
    #[inline]
    pub fn apply(&self, value: Weight) -> Weight {
        match self {
            Activation::Identity => value,
            Activation::Tanh => value.tanh(),
            Activation::Logistic => 1.0 / (1.0 + value.exp()),
            Activation::Heaviside => {
                if value > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Apply the inverse activation, used when teacher targets must be
    /// mapped back through the output nonlinearity.
    ///
    /// # Panics
    /// For [`Activation::Heaviside`], which has no inverse. The output
    /// activation setter rejects it, so the reservoir is the only place it
    /// can live.
    #[inline]
    pub fn apply_inverse(&self, value: Weight) -> Weight {
        match self {
            Activation::Identity => value,
            Activation::Tanh => value.atanh(),
            Activation::Logistic => (1.0 / value - 1.0).ln(),
            Activation::Heaviside => panic!("the heaviside activation has no inverse"),
        }
    }

    /// Whether this activation may be used on the output layer.
    #[inline(always)]
    pub fn invertible(&self) -> bool {
        !matches!(self, Activation::Heaviside)
    }

    /// The stable numeric tag used in the checkpoint format.
    #[inline(always)]
    pub(crate) fn as_i32(&self) -> i32 {
        match self {
            Activation::Identity => 0,
            Activation::Tanh => 1,
            Activation::Logistic => 2,
            Activation::Heaviside => 3,
        }
    }

    pub(crate) fn from_i32(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(Activation::Identity),
            1 => Some(Activation::Tanh),
            2 => Some(Activation::Logistic),
            3 => Some(Activation::Heaviside),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logistic_keeps_original_sign_convention() {
        let act = Activation::Logistic;
        assert_eq!(act.apply(0.0), 0.5);
        // 1 / (1 + e^ln(3)) = 0.25, the conventional sigmoid would give 0.75
        assert!((act.apply(3.0f32.ln()) - 0.25).abs() < 1e-6);
        // and it is decreasing
        assert!(act.apply(1.0) < act.apply(-1.0));
    }

    #[test]
    fn logistic_inverse_round_trip() {
        let act = Activation::Logistic;
        for x in [-2.0f32, -0.5, 0.0, 0.5, 2.0] {
            let y = act.apply(x);
            assert!((act.apply_inverse(y) - x).abs() < 1e-5);
        }
    }

    #[test]
    fn tanh_inverse_round_trip() {
        let act = Activation::Tanh;
        for x in [-1.5f32, 0.0, 0.3, 1.5] {
            let y = act.apply(x);
            assert!((act.apply_inverse(y) - x).abs() < 1e-5);
        }
    }

    #[test]
    fn heaviside_thresholds_at_zero() {
        let act = Activation::Heaviside;
        assert_eq!(act.apply(0.0), 0.0);
        assert_eq!(act.apply(1e-6), 1.0);
        assert_eq!(act.apply(-1e-6), 0.0);
        assert!(!act.invertible());
    }

    #[test]
    fn checkpoint_tags_round_trip() {
        for act in [
            Activation::Identity,
            Activation::Tanh,
            Activation::Logistic,
            Activation::Heaviside,
        ] {
            assert_eq!(Activation::from_i32(act.as_i32()), Some(act));
        }
        assert_eq!(Activation::from_i32(4), None);
    }
}
