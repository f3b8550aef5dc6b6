use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
};

use nalgebra::{DMatrix, DVector};

use crate::{Activation, Error, Params, ReservoirBuilder, Result, SimulationType::*, Trial, Weight};

/// The simulation modes of [`EchoStateNetwork::run`]. Only
/// [`TeacherForcing`] and [`TeacherTesting`] alter the output gating; the
/// remaining modes run the same recurrence with outputs computed whenever
/// feedback is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationType {
    OfflineSeparateInput,
    OfflineSimultaneousInput,
    Online,
    /// Training mode: outputs stay at their teacher values so the readout
    /// can be fitted against them afterwards.
    TeacherForcing,
    /// Evaluation mode: teacher-forced for the first
    /// [`teacher_window`](Trial::teacher_window) steps, self-predicting
    /// thereafter.
    TeacherTesting,
    Prediction,
}

/// A leaky echo state network: fixed input, feedback and reservoir weight
/// matrices plus a trainable linear readout.
///
/// All weight matrices are owned exclusively by the network and regenerated
/// wholesale by [`init`](Self::init). They are never mutated during
/// [`run`](Self::run), so concurrent runs over distinct trials against a
/// stable network are safe.
#[derive(Debug)]
pub struct EchoStateNetwork {
    params: Params,
    /// Incoming input weights, `reservoir_size` x `input_size`
    input_weights: DMatrix<Weight>,
    /// Incoming feedback weights, `reservoir_size` x `output_size`
    feedback_weights: DMatrix<Weight>,
    /// The trainable readout, `output_size` x `(reservoir_size + input_size)`;
    /// row layout is the reservoir block followed by the input block
    output_weights: DMatrix<Weight>,
    /// Entry `(n, i)` is the weight from neuron `i` to neuron `n`
    reservoir_weights: DMatrix<Weight>,
    /// Per-neuron bias, relevant for the heaviside activation
    thresholds: DVector<Weight>,
    initialized: bool,
}

impl EchoStateNetwork {
    /// Create a network with the given parameters. No weight matrices
    /// exist until [`init`](Self::init) is called.
    pub fn new(params: Params) -> Self {
        Self {
            params,
            input_weights: DMatrix::zeros(0, 0),
            feedback_weights: DMatrix::zeros(0, 0),
            output_weights: DMatrix::zeros(0, 0),
            reservoir_weights: DMatrix::zeros(0, 0),
            thresholds: DVector::zeros(0),
            initialized: false,
        }
    }

    /// Replace the full parameter set. Takes effect at the next
    /// [`init`](Self::init), which becomes mandatory before running again.
    pub fn configure(&mut self, params: Params) -> Result<()> {
        if params.input_size == 0 || params.output_size == 0 {
            return Err(Error::Configuration(
                "configure: input_size and output_size must be non-zero".to_string(),
            ));
        }
        if params.reservoir_size <= 1 {
            return Err(Error::Configuration(format!(
                "configure: reservoir_size must be > 1, got {}",
                params.reservoir_size
            )));
        }
        for (name, value) in [
            ("connectivity", params.connectivity),
            ("input_connectivity", params.input_connectivity),
            ("feedback_connectivity", params.feedback_connectivity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Configuration(format!(
                    "configure: {} must be in [0, 1], got {}",
                    name, value
                )));
            }
        }
        if !params.output_activation.invertible() {
            return Err(Error::Configuration(
                "configure: heaviside is reservoir-only, pick an invertible output activation"
                    .to_string(),
            ));
        }
        self.params = params;
        self.initialized = false;
        Ok(())
    }

    #[inline(always)]
    pub fn params(&self) -> &Params {
        &self.params
    }

    #[inline(always)]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn set_reservoir_activation(&mut self, activation: Activation) {
        self.params.reservoir_activation = activation;
    }

    /// Set the readout activation. Heaviside is rejected: the trainer needs
    /// the inverse to exist.
    pub fn set_output_activation(&mut self, activation: Activation) -> Result<()> {
        if !activation.invertible() {
            return Err(Error::Configuration(
                "set_output_activation: heaviside has no inverse".to_string(),
            ));
        }
        self.params.output_activation = activation;
        Ok(())
    }

    pub fn set_feedback_connectivity(&mut self, connectivity: Weight) {
        self.params.feedback_connectivity = connectivity;
    }

    pub fn set_spectral_radius(&mut self, spectral_radius: Weight) {
        self.params.spectral_radius = spectral_radius;
    }

    pub fn set_input_scale(&mut self, scale: Weight) {
        self.params.input_scale = scale;
    }

    pub fn set_feedback_scale(&mut self, scale: Weight) {
        self.params.feedback_scale = scale;
    }

    pub fn set_time_constant(&mut self, time_constant: Weight) {
        self.params.time_constant = time_constant;
    }

    pub fn set_decay_rate(&mut self, decay_rate: Weight) {
        self.params.decay_rate = decay_rate;
    }

    /// (Re)generate all weight matrices. Previously allocated matrices are
    /// dropped before the new ones are installed. The generation order is
    /// fixed (input, feedback, output placeholder, thresholds, reservoir)
    /// so a fixed seed reproduces bit-identical matrices.
    pub fn init(&mut self) -> Result<()> {
        let p = &self.params;
        let mut builder = ReservoirBuilder::new(p.seed);

        let mut input_weights =
            builder.dense_weights(p.reservoir_size, p.input_size, p.input_connectivity);
        if p.input_scale != 1.0 || p.input_shift != 0.0 {
            ReservoirBuilder::scale_and_shift(&mut input_weights, p.input_scale, p.input_shift);
        }

        let mut feedback_weights =
            builder.dense_weights(p.reservoir_size, p.output_size, p.feedback_connectivity);
        if p.feedback_scale != 1.0 || p.feedback_shift != 0.0 {
            ReservoirBuilder::scale_and_shift(
                &mut feedback_weights,
                p.feedback_scale,
                p.feedback_shift,
            );
        }

        // Random placeholder until the trainer installs fitted weights,
        // always at full connectivity.
        let output_weights =
            builder.dense_weights(p.output_size, p.reservoir_size + p.input_size, 1.0);

        let thresholds = DVector::from_element(p.reservoir_size, p.threshold);

        let reservoir_weights = builder.reservoir_weights(
            p.reservoir_size,
            p.connectivity,
            p.spectral_radius,
            p.excitatory_ratio,
            p.reservoir_kind,
        )?;

        self.input_weights = input_weights;
        self.feedback_weights = feedback_weights;
        self.output_weights = output_weights;
        self.reservoir_weights = reservoir_weights;
        self.thresholds = thresholds;
        self.initialized = true;
        debug!(
            "initialized ESN {}->{}->{} with connectivity {}",
            p.input_size, p.reservoir_size, p.output_size, p.connectivity
        );
        Ok(())
    }

    /// Run the recurrence over a trial, writing the reservoir state
    /// trajectory and, depending on the mode, the outputs in place.
    ///
    /// Per timestep every neuron receives `W_in u(t) + W x(t-1) * c +
    /// W_back y(t-1) - threshold` (recurrent and feedback terms are zero at
    /// `t = 0`), passes it through the reservoir activation and adds the
    /// leak leftover `(1 - c * a) x(t-1)`. Outputs are computed only when
    /// feedback is enabled, never under teacher forcing, and not inside the
    /// teacher window of a teacher-testing run; otherwise the stored
    /// teacher values remain untouched.
    ///
    /// # Panics
    /// If [`init`](Self::init) has not been called, or the trial was sized
    /// against different network dimensions.
    pub fn run(&self, trial: &mut Trial, sim_type: SimulationType) {
        assert!(self.initialized, "run: init() must be called before run()");
        let p = &self.params;
        assert_eq!(
            trial.reservoir_size, p.reservoir_size,
            "run: trial sized for reservoir of {}, network has {}",
            trial.reservoir_size, p.reservoir_size
        );
        assert_eq!(
            trial.input_size, p.input_size,
            "run: trial input size {} does not match network input size {}",
            trial.input_size, p.input_size
        );
        assert_eq!(
            trial.output_size, p.output_size,
            "run: trial output size {} does not match network output size {}",
            trial.output_size, p.output_size
        );

        let res = p.reservoir_size;
        let leak = 1.0 - p.time_constant * p.decay_rate;

        for t in 0..trial.sample_count {
            for n in 0..res {
                let mut input_sum: Weight = 0.0;
                for i in 0..p.input_size {
                    input_sum +=
                        trial.input[t * p.input_size + i] * self.input_weights[(n, i)];
                }

                let mut recurrent_sum: Weight = 0.0;
                let mut feedback_sum: Weight = 0.0;
                // no state or output exists before the first step
                if t > 0 {
                    for i in 0..res {
                        recurrent_sum +=
                            trial.states[(t - 1) * res + i] * self.reservoir_weights[(n, i)];
                    }
                    if p.feedback_connectivity > 0.0 {
                        for o in 0..p.output_size {
                            feedback_sum += trial.output[(t - 1) * p.output_size + o]
                                * self.feedback_weights[(n, o)];
                        }
                    }
                }

                // x(t) = (1 - c*a) x(t-1) + f(W_in u(t) + W x(t-1) * c + W_back y(t-1) - theta)
                let pre = input_sum + recurrent_sum * p.time_constant + feedback_sum
                    - self.thresholds[n];
                let leftover = if t > 0 {
                    leak * trial.states[(t - 1) * res + n]
                } else {
                    0.0
                };
                if let Some(debug) = trial.debug.as_mut() {
                    debug[t * res + n] = pre;
                }
                trial.states[t * res + n] = leftover + p.reservoir_activation.apply(pre);
            }

            let mut set_output = p.feedback_connectivity > 0.0;
            if sim_type == TeacherForcing {
                set_output = false;
            }
            if sim_type == TeacherTesting && t < trial.teacher_window {
                set_output = false;
            }
            if set_output {
                for o in 0..p.output_size {
                    let mut sum: Weight = 0.0;
                    for n in 0..res {
                        sum += trial.states[t * res + n] * self.output_weights[(o, n)];
                    }
                    for i in 0..p.input_size {
                        sum += trial.input[t * p.input_size + i]
                            * self.output_weights[(o, res + i)];
                    }
                    trial.output[t * p.output_size + o] = p.output_activation.apply(sum);
                }
            }
        }
    }

    /// Replace the readout matrix wholesale, row-major per output neuron:
    /// the reservoir block followed by the input block.
    ///
    /// # Panics
    /// If the length is not `output_size * (reservoir_size + input_size)`.
    pub fn set_output_weights(&mut self, weights: &[Weight]) {
        let cols = self.params.reservoir_size + self.params.input_size;
        let expected = self.params.output_size * cols;
        assert_eq!(
            weights.len(),
            expected,
            "set_output_weights: expected {} weights, got {}",
            expected,
            weights.len()
        );
        self.output_weights = DMatrix::from_row_slice(self.params.output_size, cols, weights);
    }

    #[inline(always)]
    pub fn input_weights(&self) -> &DMatrix<Weight> {
        &self.input_weights
    }

    #[inline(always)]
    pub fn feedback_weights(&self) -> &DMatrix<Weight> {
        &self.feedback_weights
    }

    #[inline(always)]
    pub fn output_weights(&self) -> &DMatrix<Weight> {
        &self.output_weights
    }

    #[inline(always)]
    pub fn reservoir_weights(&self) -> &DMatrix<Weight> {
        &self.reservoir_weights
    }

    #[inline(always)]
    pub fn thresholds(&self) -> &DVector<Weight> {
        &self.thresholds
    }

    /// Log the relevant parameters.
    pub fn log_stats(&self) {
        let p = &self.params;
        info!(
            "ESN {}->{}->{}: connectivity {}, spectral radius {}, activations {:?}/{:?}, \
             feedback connectivity {}, time constant {}, decay rate {}",
            p.input_size,
            p.reservoir_size,
            p.output_size,
            p.connectivity,
            p.spectral_radius,
            p.reservoir_activation,
            p.output_activation,
            p.feedback_connectivity,
            p.time_constant,
            p.decay_rate
        );
    }

    /// Store the network to a binary checkpoint: all scalar parameters and
    /// all four weight matrices in a fixed field order, native-endian. The
    /// format carries a duplicate legacy feedback-scale field.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        assert!(self.initialized, "save: init() must be called before save()");
        let mut file = BufWriter::new(File::create(path)?);
        let p = &self.params;

        write_i32(&mut file, p.input_size as i32)?;
        write_i32(&mut file, p.output_size as i32)?;
        write_i32(&mut file, p.reservoir_size as i32)?;

        write_i32(&mut file, p.reservoir_activation.as_i32())?;
        write_i32(&mut file, p.output_activation.as_i32())?;

        write_f32(&mut file, p.connectivity)?;
        write_f32(&mut file, p.input_connectivity)?;
        write_f32(&mut file, p.feedback_connectivity)?;

        write_f32(&mut file, p.spectral_radius)?;

        write_f32(&mut file, p.input_scale)?;
        write_f32(&mut file, p.feedback_scale)?;

        write_f32(&mut file, p.input_shift)?;
        write_f32(&mut file, p.feedback_shift)?;

        write_f32(&mut file, p.time_constant)?;

        // legacy duplicate field
        write_f32(&mut file, p.feedback_scale)?;

        write_weights(&mut file, &self.input_weights)?;
        write_weights(&mut file, &self.feedback_weights)?;
        write_weights(&mut file, &self.output_weights)?;
        write_weights(&mut file, &self.reservoir_weights)?;
        file.flush()?;
        Ok(())
    }

    /// Load a checkpoint written by [`save`](Self::save). Everything is
    /// read into temporaries first; a truncated or corrupt stream reports
    /// an I/O failure and leaves the network unchanged.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let mut file = BufReader::new(File::open(path)?);

        let input_size = read_size(&mut file, "inputSize")?;
        let output_size = read_size(&mut file, "outputSize")?;
        let reservoir_size = read_size(&mut file, "reservoirSize")?;

        let reservoir_activation = read_activation(&mut file, "reservoirActivation")?;
        let output_activation = read_activation(&mut file, "outputActivation")?;

        let connectivity = read_f32(&mut file)?;
        let input_connectivity = read_f32(&mut file)?;
        let feedback_connectivity = read_f32(&mut file)?;

        let spectral_radius = read_f32(&mut file)?;

        let input_scale = read_f32(&mut file)?;
        let mut feedback_scale = read_f32(&mut file)?;

        let input_shift = read_f32(&mut file)?;
        let feedback_shift = read_f32(&mut file)?;

        let time_constant = read_f32(&mut file)?;

        // legacy duplicate field
        feedback_scale = read_f32(&mut file)?;

        let input_weights = read_weights(&mut file, reservoir_size, input_size)?;
        let feedback_weights = read_weights(&mut file, reservoir_size, output_size)?;
        let output_weights =
            read_weights(&mut file, output_size, reservoir_size + input_size)?;
        let reservoir_weights = read_weights(&mut file, reservoir_size, reservoir_size)?;

        info!("loaded ESN checkpoint: {}->{}->{}", input_size, reservoir_size, output_size);

        self.params.input_size = input_size;
        self.params.output_size = output_size;
        self.params.reservoir_size = reservoir_size;
        self.params.reservoir_activation = reservoir_activation;
        self.params.output_activation = output_activation;
        self.params.connectivity = connectivity;
        self.params.input_connectivity = input_connectivity;
        self.params.feedback_connectivity = feedback_connectivity;
        self.params.spectral_radius = spectral_radius;
        self.params.input_scale = input_scale;
        self.params.feedback_scale = feedback_scale;
        self.params.input_shift = input_shift;
        self.params.feedback_shift = feedback_shift;
        self.params.time_constant = time_constant;

        self.input_weights = input_weights;
        self.feedback_weights = feedback_weights;
        self.output_weights = output_weights;
        self.reservoir_weights = reservoir_weights;
        // thresholds are not part of the checkpoint format
        self.thresholds = DVector::from_element(reservoir_size, self.params.threshold);
        self.initialized = true;
        Ok(())
    }
}

fn write_i32<W: Write>(writer: &mut W, value: i32) -> io::Result<()> {
    writer.write_all(&value.to_ne_bytes())
}

fn write_f32<W: Write>(writer: &mut W, value: f32) -> io::Result<()> {
    writer.write_all(&value.to_ne_bytes())
}

fn write_weights<W: Write>(writer: &mut W, matrix: &DMatrix<Weight>) -> io::Result<()> {
    for n in 0..matrix.nrows() {
        for i in 0..matrix.ncols() {
            write_f32(writer, matrix[(n, i)])?;
        }
    }
    Ok(())
}

fn read_i32<R: Read>(reader: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_ne_bytes(buf))
}

fn read_f32<R: Read>(reader: &mut R) -> io::Result<f32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(f32::from_ne_bytes(buf))
}

fn read_size<R: Read>(reader: &mut R, field: &str) -> Result<usize> {
    let value = read_i32(reader)?;
    usize::try_from(value).map_err(|_| {
        Error::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("checkpoint field {} is negative: {}", field, value),
        ))
    })
}

fn read_activation<R: Read>(reader: &mut R, field: &str) -> Result<Activation> {
    let tag = read_i32(reader)?;
    Activation::from_i32(tag).ok_or_else(|| {
        Error::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("checkpoint field {} has unknown activation tag {}", field, tag),
        ))
    })
}

fn read_weights<R: Read>(reader: &mut R, rows: usize, cols: usize) -> Result<DMatrix<Weight>> {
    let mut flat = vec![0.0; rows * cols];
    for value in flat.iter_mut() {
        *value = read_f32(reader)?;
    }
    Ok(DMatrix::from_row_slice(rows, cols, &flat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReservoirKind;

    fn test_params() -> Params {
        let mut params = Params::new(1, 1, 10, 0.8);
        params.seed = Some(7);
        params
    }

    #[test]
    fn seeded_init_is_idempotent() {
        if let Err(_) = pretty_env_logger::try_init() {}

        let mut a = EchoStateNetwork::new(test_params());
        let mut b = EchoStateNetwork::new(test_params());
        a.init().unwrap();
        b.init().unwrap();

        assert_eq!(a.input_weights(), b.input_weights());
        assert_eq!(a.feedback_weights(), b.feedback_weights());
        assert_eq!(a.output_weights(), b.output_weights());
        assert_eq!(a.reservoir_weights(), b.reservoir_weights());
        assert_eq!(a.thresholds(), b.thresholds());

        // and a re-init of the same network reproduces them as well
        let reservoir = a.reservoir_weights().clone();
        a.init().unwrap();
        assert_eq!(a.reservoir_weights(), &reservoir);
    }

    #[test]
    fn first_step_is_independent_of_weights() {
        // with all-zero input and zero thresholds the first state is the
        // activation of 0, no matter the reservoir or feedback weights
        let mut esn = EchoStateNetwork::new(test_params());
        esn.init().unwrap();

        let mut trial = Trial::new(vec![0.0; 5], vec![0.0; 5], 1, 1, 10, -1);
        esn.run(&mut trial, TeacherForcing);
        for n in 0..10 {
            assert_eq!(trial.states()[n], 0.0f32.tanh());
        }

        esn.set_reservoir_activation(Activation::Logistic);
        let mut trial = Trial::new(vec![0.0; 5], vec![0.0; 5], 1, 1, 10, -1);
        esn.run(&mut trial, TeacherForcing);
        for n in 0..10 {
            assert_eq!(trial.states()[n], 0.5);
        }
    }

    #[test]
    fn teacher_forcing_never_touches_outputs() {
        let mut params = test_params();
        params.feedback_connectivity = 1.0;
        let mut esn = EchoStateNetwork::new(params);
        esn.init().unwrap();

        let teacher: Vec<Weight> = (0..20).map(|t| (t as Weight * 0.3).sin()).collect();
        let mut trial = Trial::new(vec![0.2; 20], teacher.clone(), 1, 1, 10, -1);
        esn.run(&mut trial, TeacherForcing);
        assert_eq!(trial.output(), teacher.as_slice());
    }

    #[test]
    fn no_feedback_means_no_outputs() {
        // with feedback connectivity 0 even prediction mode leaves the
        // stored values alone
        let mut esn = EchoStateNetwork::new(test_params());
        esn.init().unwrap();

        let teacher: Vec<Weight> = (0..10).map(|t| t as Weight).collect();
        let mut trial = Trial::new(vec![0.0; 10], teacher.clone(), 1, 1, 10, -1);
        esn.run(&mut trial, Prediction);
        assert_eq!(trial.output(), teacher.as_slice());
    }

    #[test]
    fn leak_retains_previous_state() {
        let mut params = test_params();
        params.decay_rate = 0.5; // leftover factor 1 - 1 * 0.5 = 0.5
        params.connectivity = 0.0;
        params.input_connectivity = 0.0;
        let mut esn = EchoStateNetwork::new(params);
        // an all-zero reservoir draw has spectral radius 0, install
        // weights directly instead of going through generation
        esn.input_weights = DMatrix::zeros(10, 1);
        esn.feedback_weights = DMatrix::zeros(10, 1);
        esn.output_weights = DMatrix::zeros(1, 11);
        esn.reservoir_weights = DMatrix::zeros(10, 10);
        esn.thresholds = DVector::from_element(10, -1.0);
        esn.initialized = true;

        // pre-activation is +1 every step from the negative threshold, so
        // x(t) = 0.5 x(t-1) + tanh(1)
        let mut trial = Trial::new(vec![0.0; 3], vec![0.0; 3], 1, 1, 10, -1);
        esn.run(&mut trial, TeacherForcing);
        let f = 1.0f32.tanh();
        assert!((trial.states()[0] - f).abs() < 1e-6);
        assert!((trial.states()[10] - (0.5 * f + f)).abs() < 1e-6);
        assert!((trial.states()[20] - (0.5 * (0.5 * f + f) + f)).abs() < 1e-6);
    }

    #[test]
    fn debug_buffer_holds_preactivation_sums() {
        let mut esn = EchoStateNetwork::new(test_params());
        esn.init().unwrap();

        let mut trial = Trial::new(vec![0.0; 4], vec![0.0; 4], 1, 1, 10, -1);
        trial.enable_debug();
        esn.run(&mut trial, TeacherForcing);
        let debug = trial.debug_values().unwrap();
        // zero input, zero thresholds: the first-step sums are all zero
        assert!(debug[..10].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn checkpoint_round_trip_is_exact() {
        let mut params = test_params();
        params.feedback_connectivity = 0.5;
        params.input_scale = 1.5;
        params.feedback_scale = 0.56;
        params.reservoir_activation = Activation::Logistic;
        let mut esn = EchoStateNetwork::new(params);
        esn.init().unwrap();

        let path = std::env::temp_dir().join(format!("esn_roundtrip_{}.esn", std::process::id()));
        esn.save(&path).unwrap();

        let mut restored = EchoStateNetwork::new(Params::default());
        restored.load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let (p, q) = (esn.params(), restored.params());
        assert_eq!(p.input_size, q.input_size);
        assert_eq!(p.output_size, q.output_size);
        assert_eq!(p.reservoir_size, q.reservoir_size);
        assert_eq!(p.reservoir_activation, q.reservoir_activation);
        assert_eq!(p.output_activation, q.output_activation);
        assert_eq!(p.connectivity, q.connectivity);
        assert_eq!(p.input_connectivity, q.input_connectivity);
        assert_eq!(p.feedback_connectivity, q.feedback_connectivity);
        assert_eq!(p.spectral_radius, q.spectral_radius);
        assert_eq!(p.input_scale, q.input_scale);
        assert_eq!(p.feedback_scale, q.feedback_scale);
        assert_eq!(p.input_shift, q.input_shift);
        assert_eq!(p.feedback_shift, q.feedback_shift);
        assert_eq!(p.time_constant, q.time_constant);

        assert_eq!(esn.input_weights(), restored.input_weights());
        assert_eq!(esn.feedback_weights(), restored.feedback_weights());
        assert_eq!(esn.output_weights(), restored.output_weights());
        assert_eq!(esn.reservoir_weights(), restored.reservoir_weights());
        assert!(restored.is_initialized());
    }

    #[test]
    fn truncated_checkpoint_reports_io_failure() {
        let path = std::env::temp_dir().join(format!("esn_truncated_{}.esn", std::process::id()));
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let mut esn = EchoStateNetwork::new(test_params());
        let result = esn.load(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(Error::Io(_))));
        assert!(!esn.is_initialized());
    }

    #[test]
    fn configure_rejects_heaviside_output() {
        let mut esn = EchoStateNetwork::new(test_params());
        let mut params = test_params();
        params.output_activation = Activation::Heaviside;
        assert!(matches!(esn.configure(params), Err(Error::Configuration(_))));
        assert!(esn.set_output_activation(Activation::Heaviside).is_err());
    }

    #[test]
    fn configure_forces_reinit() {
        let mut esn = EchoStateNetwork::new(test_params());
        esn.init().unwrap();
        assert!(esn.is_initialized());
        esn.configure(Params::new(2, 1, 30, 0.5)).unwrap();
        assert!(!esn.is_initialized());
    }

    #[test]
    #[should_panic(expected = "expected 11 weights")]
    fn mismatched_readout_length_is_fatal() {
        let mut esn = EchoStateNetwork::new(test_params());
        esn.init().unwrap();
        esn.set_output_weights(&[0.0; 10]);
    }

    #[test]
    #[should_panic(expected = "init() must be called before run()")]
    fn run_before_init_is_fatal() {
        let esn = EchoStateNetwork::new(test_params());
        let mut trial = Trial::new(vec![0.0; 5], vec![0.0; 5], 1, 1, 10, -1);
        esn.run(&mut trial, TeacherForcing);
    }

    #[test]
    fn balanced_reservoir_initializes() {
        let mut params = Params::new(1, 1, 100, 0.1);
        params.seed = Some(9);
        params.reservoir_kind = ReservoirKind::Balanced;
        let mut esn = EchoStateNetwork::new(params);
        esn.init().unwrap();
        let rho =
            lin_alg::spectral_radius(&esn.reservoir_weights().map(|w| w as f64)).unwrap();
        assert!((rho - 0.8).abs() < 1e-3);
    }
}
