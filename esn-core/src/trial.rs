use crate::Weight;

/// One training or testing episode: an input sequence, the teacher (later:
/// predicted) output sequence and the reservoir state trajectory collected
/// while running it.
///
/// A trial owns its buffers exclusively. The state and output buffers are
/// written only by [`run`](crate::EchoStateNetwork::run); everything else
/// reads them through the accessors. Trials are sized against the reservoir
/// size of the network they were registered with and must not be run
/// against a differently sized one.
#[derive(Debug, Clone)]
pub struct Trial {
    /// Reservoir activation per timestep, flat `t * reservoir_size + n`
    pub(crate) states: Vec<Weight>,
    /// Input vectors, flat `t * input_size + i`
    pub(crate) input: Vec<Weight>,
    /// Teacher values before a run; past the teacher window a
    /// teacher-testing run overwrites them with predictions
    pub(crate) output: Vec<Weight>,
    /// Pre-activation sums per timestep, diagnostic only
    pub(crate) debug: Option<Vec<Weight>>,

    pub(crate) sample_count: usize,
    pub(crate) input_size: usize,
    pub(crate) output_size: usize,
    pub(crate) reservoir_size: usize,
    /// Number of leading timesteps that stay teacher-forced even in
    /// teacher-testing mode
    pub(crate) teacher_window: usize,
    /// Opaque label, only used for train/test bookkeeping
    pub(crate) class_id: i32,
}

impl Trial {
    /// Register a new episode. The state buffer is allocated here, sized
    /// `reservoir_size * sample_count`; the teacher window defaults to a
    /// fifth of the episode.
    ///
    /// # Panics
    /// If the input or output buffer length is not a whole number of
    /// `input_size` / `output_size` vectors, or the two disagree on the
    /// number of timesteps.
    pub fn new(
        input: Vec<Weight>,
        output: Vec<Weight>,
        input_size: usize,
        output_size: usize,
        reservoir_size: usize,
        class_id: i32,
    ) -> Self {
        assert!(
            input_size > 0 && input.len() % input_size == 0,
            "Trial::new: input length {} is not a multiple of input_size {}",
            input.len(),
            input_size
        );
        let sample_count = input.len() / input_size;
        assert_eq!(
            output.len(),
            sample_count * output_size,
            "Trial::new: expected {} output values for {} timesteps, got {}",
            sample_count * output_size,
            sample_count,
            output.len()
        );

        Self {
            states: vec![0.0; reservoir_size * sample_count],
            input,
            output,
            debug: None,
            sample_count,
            input_size,
            output_size,
            reservoir_size,
            teacher_window: sample_count / 5,
            class_id,
        }
    }

    /// Allocate the parallel buffer of pre-activation sums that
    /// [`run`](crate::EchoStateNetwork::run) fills for diagnostics.
    pub fn enable_debug(&mut self) {
        self.debug = Some(vec![0.0; self.reservoir_size * self.sample_count]);
    }

    /// The reservoir state trajectory, flat `t * reservoir_size + n`.
    #[inline(always)]
    pub fn states(&self) -> &[Weight] {
        &self.states
    }

    #[inline(always)]
    pub fn input(&self) -> &[Weight] {
        &self.input
    }

    /// Teacher values, or predictions for timesteps a run computed outputs
    /// for.
    #[inline(always)]
    pub fn output(&self) -> &[Weight] {
        &self.output
    }

    #[inline(always)]
    pub fn debug_values(&self) -> Option<&[Weight]> {
        self.debug.as_deref()
    }

    #[inline(always)]
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    #[inline(always)]
    pub fn teacher_window(&self) -> usize {
        self.teacher_window
    }

    /// Override the default teacher-forcing window of `sample_count / 5`.
    pub fn set_teacher_window(&mut self, teacher_window: usize) {
        assert!(
            teacher_window <= self.sample_count,
            "set_teacher_window: window {} exceeds sample count {}",
            teacher_window,
            self.sample_count
        );
        self.teacher_window = teacher_window;
    }

    #[inline(always)]
    pub fn class_id(&self) -> i32 {
        self.class_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_buffer_sized_at_creation() {
        let trial = Trial::new(vec![0.0; 20], vec![0.0; 20], 1, 1, 7, -1);
        assert_eq!(trial.states().len(), 140);
        assert_eq!(trial.sample_count(), 20);
        assert_eq!(trial.teacher_window(), 4);
        assert!(trial.debug_values().is_none());
    }

    #[test]
    #[should_panic(expected = "output values")]
    fn mismatched_output_length_is_rejected() {
        let _ = Trial::new(vec![0.0; 10], vec![0.0; 9], 1, 1, 5, -1);
    }
}
