use nalgebra::DMatrix;
use nanorand::{Rng, WyRand};

use crate::{EchoStateNetwork, Error, Result, SimulationType, Trial, Weight};

/// Fraction of trials assigned to the test set by
/// [`run_trials`](Trainer::run_trials).
const TEST_FRACTION: f64 = 0.2;

/// Default ridge parameter. Fixed for now, although it really depends on
/// the reservoir; [`Trainer::set_ridge_lambda`] overrides it.
const RIDGE_LAMBDA: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Split {
    Train,
    Test,
}

/// The result of running one test trial under teacher testing.
#[derive(Debug, Clone)]
pub struct TestRun {
    /// The teacher sequence as registered, echoed back
    pub teacher: Vec<Weight>,
    /// The output sequence after the run: teacher-forced inside the
    /// window, self-predicted after it
    pub predicted: Vec<Weight>,
    /// The reservoir state trajectory, when requested
    pub states: Option<Vec<Weight>>,
}

/// Owns a collection of labeled trials, partitions them into train and
/// test sets, drives the network over the training trials and fits the
/// readout weights by ridge regression.
#[derive(Debug)]
pub struct Trainer {
    esn: EchoStateNetwork,
    trials: Vec<Trial>,
    assignment: Vec<Split>,
    ridge_lambda: f64,
    rng: WyRand,
}

impl Trainer {
    /// Wrap an initialized network. Trials registered later are sized
    /// against its reservoir size.
    ///
    /// # Panics
    /// If the network has not been initialized.
    pub fn new(esn: EchoStateNetwork, seed: Option<u64>) -> Self {
        assert!(esn.is_initialized(), "Trainer::new: the network must be initialized first");
        let rng = match seed {
            Some(seed) => WyRand::new_seed(seed),
            None => WyRand::new(),
        };
        Self {
            esn,
            trials: Vec::new(),
            assignment: Vec::new(),
            ridge_lambda: RIDGE_LAMBDA,
            rng,
        }
    }

    #[inline(always)]
    pub fn esn(&self) -> &EchoStateNetwork {
        &self.esn
    }

    #[inline(always)]
    pub fn esn_mut(&mut self) -> &mut EchoStateNetwork {
        &mut self.esn
    }

    /// Override the ridge regularization parameter.
    pub fn set_ridge_lambda(&mut self, lambda: f64) {
        self.ridge_lambda = lambda;
    }

    /// Register an input/teacher sequence as a trial. The state buffer is
    /// allocated here against the network's current reservoir size; the
    /// teacher window defaults to a fifth of the sequence.
    pub fn add_trial(&mut self, input: Vec<Weight>, output: Vec<Weight>, class_id: i32) {
        let p = self.esn.params();
        self.trials.push(Trial::new(
            input,
            output,
            p.input_size,
            p.output_size,
            p.reservoir_size,
            class_id,
        ));
        self.assignment.push(Split::Train);
    }

    #[inline(always)]
    pub fn nof_trials(&self) -> usize {
        self.trials.len()
    }

    /// Assign each trial to the train or test set by an independent
    /// Bernoulli draw at `test_fraction`. Both sets are guaranteed
    /// non-empty: if the draws leave either side empty, one trial chosen
    /// at random is moved over.
    pub fn partition(&mut self, test_fraction: f64) -> Result<()> {
        let n = self.trials.len();
        if n < 2 {
            return Err(Error::Configuration(format!(
                "partition: need at least one training and one test trial, got {} trial(s)",
                n
            )));
        }

        for split in self.assignment.iter_mut() {
            *split = if self.rng.generate::<f64>() < test_fraction {
                Split::Test
            } else {
                Split::Train
            };
        }
        if !self.assignment.contains(&Split::Test) {
            let forced = self.rng.generate_range(0..n);
            self.assignment[forced] = Split::Test;
        }
        if !self.assignment.contains(&Split::Train) {
            let forced = self.rng.generate_range(0..n);
            self.assignment[forced] = Split::Train;
        }

        for (trial, split) in self.trials.iter().zip(self.assignment.iter()) {
            match split {
                Split::Train => debug!("train: {}", trial.class_id()),
                Split::Test => debug!("test: {}", trial.class_id()),
            }
        }
        Ok(())
    }

    /// View over the trials assigned to the training set.
    pub fn training_set(&self) -> impl Iterator<Item = &Trial> + '_ {
        self.set_view(Split::Train)
    }

    /// View over the trials assigned to the test set.
    pub fn test_set(&self) -> impl Iterator<Item = &Trial> + '_ {
        self.set_view(Split::Test)
    }

    fn set_view(&self, split: Split) -> impl Iterator<Item = &Trial> + '_ {
        self.trials
            .iter()
            .zip(self.assignment.iter())
            .filter_map(move |(trial, s)| (*s == split).then_some(trial))
    }

    fn set_indices(&self, split: Split) -> Vec<usize> {
        self.assignment
            .iter()
            .enumerate()
            .filter_map(|(i, s)| (*s == split).then_some(i))
            .collect()
    }

    /// Partition the trials, run every training trial under teacher
    /// forcing, fit the readout by ridge regression over the collected
    /// states and install the resulting weights into the network.
    ///
    /// On a regression failure no weights are installed and the previous
    /// readout remains in effect.
    pub fn run_trials(&mut self) -> Result<()> {
        self.partition(TEST_FRACTION)?;
        let train = self.set_indices(Split::Train);

        for &idx in train.iter() {
            self.esn.run(&mut self.trials[idx], SimulationType::TeacherForcing);
        }

        let readout = self.ridge_regression(&train)?;
        let weights: Vec<Weight> = readout.iter().map(|w| *w as Weight).collect();
        self.esn.set_output_weights(&weights);
        Ok(())
    }

    /// Run the indicated test trial (index within the test set) under
    /// teacher testing: teacher-forced for its first
    /// [`teacher_window`](Trial::teacher_window) steps, self-predicting
    /// thereafter.
    pub fn run_test(&mut self, index: usize) -> Result<TestRun> {
        self.run_test_inner(index, false)
    }

    /// Like [`run_test`](Self::run_test), additionally returning the full
    /// reservoir state trajectory, e.g. for visualisation.
    pub fn run_test_with_states(&mut self, index: usize) -> Result<TestRun> {
        self.run_test_inner(index, true)
    }

    fn run_test_inner(&mut self, index: usize, with_states: bool) -> Result<TestRun> {
        let test = self.set_indices(Split::Test);
        let &idx = test.get(index).ok_or_else(|| {
            Error::Configuration(format!(
                "run_test: index {} out of range, test set holds {} trial(s)",
                index,
                test.len()
            ))
        })?;

        let teacher = self.trials[idx].output().to_vec();
        self.esn.run(&mut self.trials[idx], SimulationType::TeacherTesting);
        let trial = &self.trials[idx];

        Ok(TestRun {
            teacher,
            predicted: trial.output().to_vec(),
            states: with_states.then(|| trial.states().to_vec()),
        })
    }

    /// Fit readout weights over the collected states of the given trials:
    /// `w = (A'A + lambda*I)^-1 A'B`, where each row of the design matrix
    /// `A` concatenates a reservoir state with its input vector and `B`
    /// holds the teacher outputs. Per trial the first quarter of the
    /// samples is discarded as settling transient.
    ///
    /// Only a single output neuron is supported here.
    fn ridge_regression(&self, train: &[usize]) -> Result<DMatrix<f64>> {
        let p = self.esn.params();
        if p.output_size != 1 {
            return Err(Error::Configuration(format!(
                "ridge_regression: only output_size 1 is supported, got {}",
                p.output_size
            )));
        }
        if train.is_empty() {
            return Err(Error::Configuration(
                "ridge_regression: the training set is empty".to_string(),
            ));
        }

        let cols = p.reservoir_size + p.input_size;
        let rows: usize = train
            .iter()
            .map(|&idx| {
                let len = self.trials[idx].sample_count();
                len - len / 4
            })
            .sum();
        info!(
            "ridge regression over {} trial(s): {} design rows, {} columns, lambda {}",
            train.len(),
            rows,
            cols,
            self.ridge_lambda
        );

        let mut design: DMatrix<f64> = DMatrix::zeros(rows, cols);
        let mut targets: DMatrix<f64> = DMatrix::zeros(rows, 1);
        let mut row = 0;
        for &idx in train.iter() {
            let trial = &self.trials[idx];
            let len = trial.sample_count();
            let skip = len / 4;
            for t in skip..len {
                for n in 0..p.reservoir_size {
                    design[(row, n)] = trial.states()[t * p.reservoir_size + n] as f64;
                }
                for i in 0..p.input_size {
                    design[(row, p.reservoir_size + i)] =
                        trial.input()[t * p.input_size + i] as f64;
                }
                targets[(row, 0)] = trial.output()[t] as f64;
                row += 1;
            }
        }

        let design_t = design.transpose();
        let mut correlation = &design_t * &design;
        for d in 0..cols {
            correlation[(d, d)] += self.ridge_lambda;
        }
        let inverse = lin_alg::invert(&correlation).ok_or(Error::SingularMatrix)?;
        let projected = &design_t * &targets;
        Ok(inverse * projected)
    }
}
