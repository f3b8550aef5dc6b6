use crate::{Activation, Weight};

/// How the reservoir weight matrix is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservoirKind {
    /// A uniformly random sparse matrix without spatial structure.
    Random,
    /// A balanced excitatory/inhibitory network following
    /// Van Vreeswijk & Sompolinsky (1998).
    Balanced,
}

/// The parameters of the Echo State Network.
///
/// Changes take effect at the next [`init`](crate::EchoStateNetwork::init),
/// which regenerates every weight matrix.
#[derive(Debug, Clone)]
pub struct Params {
    /// Number of input neurons
    pub input_size: usize,
    /// Number of output neurons
    pub output_size: usize,
    /// Number of neurons in the reservoir. Must be greater than 1: a
    /// single-neuron reservoir makes the spectral normalization loop hang.
    pub reservoir_size: usize,

    /// Connection density within the reservoir, in `[0, 1]`
    pub connectivity: Weight,
    /// Connection density of input to reservoir
    pub input_connectivity: Weight,
    /// Connection density of output feedback into the reservoir.
    /// A value of 0 disables feedback and output computation in `run`.
    pub feedback_connectivity: Weight,

    /// Target magnitude of the dominant reservoir eigenvalue. Governs how
    /// fast the influence of an input dies out and how stable the
    /// reservoir activations are; 0.79 is reported as a good general
    /// value by Venayagamoorthy and Shishir.
    pub spectral_radius: Weight,

    /// Scales the input weights after generation
    pub input_scale: Weight,
    /// Shifts the input weights after generation
    pub input_shift: Weight,
    /// Scales the feedback weights after generation
    pub feedback_scale: Weight,
    /// Shifts the feedback weights after generation
    pub feedback_shift: Weight,

    /// Activation of the reservoir state transition
    pub reservoir_activation: Activation,
    /// Activation of the readout. Must be invertible, so anything but
    /// [`Activation::Heaviside`].
    pub output_activation: Activation,

    /// Timestep size multiplying the recurrent contribution
    pub time_constant: Weight,
    /// Leak rate: the previous state is retained with factor
    /// `1 - time_constant * decay_rate`. The default of 1 together with a
    /// time constant of 1 means no leftover at all.
    pub decay_rate: Weight,

    /// Fraction of reservoir neurons in the excitatory block, only used by
    /// [`ReservoirKind::Balanced`]
    pub excitatory_ratio: Weight,
    /// Per-neuron bias subtracted from the pre-activation sum, relevant
    /// for the heaviside activation
    pub threshold: Weight,

    /// Reservoir generation policy
    pub reservoir_kind: ReservoirKind,
    /// Optional seed for the random source; a fixed seed makes generation
    /// and partitioning reproducible
    pub seed: Option<u64>,
}

impl Params {
    /// Parameters with the given dimensions and reservoir connectivity,
    /// everything else at its default.
    pub fn new(
        input_size: usize,
        output_size: usize,
        reservoir_size: usize,
        connectivity: Weight,
    ) -> Self {
        Self {
            input_size,
            output_size,
            reservoir_size,
            connectivity,
            input_connectivity: 1.0,
            feedback_connectivity: 0.0,
            spectral_radius: 0.8,
            input_scale: 1.0,
            input_shift: 0.0,
            feedback_scale: 1.0,
            feedback_shift: 0.0,
            reservoir_activation: Activation::Tanh,
            output_activation: Activation::Identity,
            time_constant: 1.0,
            decay_rate: 1.0,
            excitatory_ratio: 0.7,
            threshold: 0.0,
            reservoir_kind: ReservoirKind::Random,
            seed: None,
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::new(2, 2, 10, 0.8)
    }
}
