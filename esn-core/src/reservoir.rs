use nalgebra::DMatrix;
use nanorand::{Rng, WyRand};

use crate::{Error, ReservoirKind, Result, Weight};

/// How many fresh random draws the generation loop tries before giving up.
/// A draw is rejected when its eigenvalue computation does not converge or
/// its spectral radius is zero.
const MAX_GENERATION_ATTEMPTS: usize = 10;

/// Connection sign/scale table of the balanced excitatory/inhibitory
/// network, indexed as `J_target_source`. These are empirical calibration
/// values from Van Vreeswijk & Sompolinsky, Fig. 17, not derivable from
/// first principles.
const J_EE: Weight = 1.0;
const J_EI: Weight = -2.0;
const J_IE: Weight = 1.0;
const J_II: Weight = -1.8;

/// Generates the weight matrices of an echo state network from a seedable
/// random source.
#[derive(Debug)]
pub struct ReservoirBuilder {
    rng: WyRand,
}

impl ReservoirBuilder {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => WyRand::new_seed(seed),
            None => WyRand::new(),
        };
        Self { rng }
    }

    /// Generate a `size` x `size` reservoir weight matrix with the given
    /// connection density, normalized to the target spectral radius.
    ///
    /// Entry `(n, i)` holds the weight from neuron `i` to neuron `n`, so
    /// incoming weights are stored row-wise.
    ///
    /// # Panics
    /// If `size <= 1` (the normalization loop can never terminate on a
    /// 1x1 matrix) or `connectivity` is outside `[0, 1]`. The balanced
    /// mode additionally asserts its mean-field validity condition
    /// `1 << K << N_E, N_I`.
    pub fn reservoir_weights(
        &mut self,
        size: usize,
        connectivity: Weight,
        spectral_radius: Weight,
        excitatory_ratio: Weight,
        kind: ReservoirKind,
    ) -> Result<DMatrix<Weight>> {
        assert!(size > 1, "reservoir_weights: reservoir size must be > 1, got {}", size);
        assert!(
            (0.0..=1.0).contains(&connectivity),
            "reservoir_weights: connectivity must be in [0, 1], got {}",
            connectivity
        );

        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let mut weights = match kind {
                ReservoirKind::Random => self.fill_random(size, connectivity),
                ReservoirKind::Balanced => self.fill_balanced(size, connectivity, excitatory_ratio),
            };
            if Self::normalize_spectrum(&mut weights, spectral_radius) {
                return Ok(weights);
            }
            debug!("spectral normalization rejected draw {}/{}", attempt, MAX_GENERATION_ATTEMPTS);
        }
        Err(Error::Generation {
            attempts: MAX_GENERATION_ATTEMPTS,
        })
    }

    /// A totally random sparse matrix without spatial characteristics:
    /// `round(size^2 * connectivity)` distinct cells drawn uniformly from
    /// `[-1, 1]`, every other cell zero.
    fn fill_random(&mut self, size: usize, connectivity: Weight) -> DMatrix<Weight> {
        let cells = size * size;
        let nof_connections = (cells as f64 * connectivity as f64).round() as usize;

        let mut indices: Vec<usize> = (0..cells).collect();
        self.rng.shuffle(&mut indices);

        let mut weights = vec![0.0; cells];
        for &cell in indices.iter().take(nof_connections) {
            weights[cell] = self.uniform(-1.0, 1.0);
        }
        DMatrix::from_row_slice(size, size, &weights)
    }

    /// A balanced excitatory/inhibitory reservoir as in "Chaotic Balanced
    /// State in a Model of Cortical Circuits" (1998), Van Vreeswijk &
    /// Sompolinsky. The first `round(excitatory_ratio * size)` neurons form
    /// the excitatory block, the remainder the inhibitory block. Each
    /// ordered (target, source) pair connects with probability
    /// `K / N_source` at weight `J_target_source / sqrt(K)`, where
    /// `K = connectivity * size` is the expected in-degree per block.
    fn fill_balanced(
        &mut self,
        size: usize,
        connectivity: Weight,
        excitatory_ratio: Weight,
    ) -> DMatrix<Weight> {
        let n_e = (excitatory_ratio as f64 * size as f64).round() as usize;
        let n_i = size - n_e;
        let k = connectivity as f64 * size as f64;
        debug!("balanced network: K={}, N_E={}, N_I={}", k, n_e, n_i);

        // The mean-field approximation the model relies on needs
        // 1 << K << N_E, N_I. Crank up the reservoir size if K/N gets too
        // close to unity.
        assert!(
            much_smaller(1.0, k) && much_smaller(k, n_e as f64),
            "fill_balanced: need 1 << K << N_E, got K={}, N_E={}",
            k,
            n_e
        );
        assert!(
            much_smaller(k, n_i as f64),
            "fill_balanced: need K << N_I, got K={}, N_I={}",
            k,
            n_i
        );

        let scale = 1.0 / (k as Weight).sqrt();
        let mut weights = DMatrix::zeros(size, size);
        for n in 0..size {
            for i in 0..size {
                let (j, n_source) = match (n < n_e, i < n_e) {
                    (true, true) => (J_EE, n_e),
                    (true, false) => (J_EI, n_i),
                    (false, true) => (J_IE, n_e),
                    (false, false) => (J_II, n_i),
                };
                if self.rng.generate::<f64>() <= k / n_source as f64 {
                    weights[(n, i)] = j * scale;
                }
            }
        }
        weights
    }

    /// Scale all entries so the magnitude of the dominant eigenvalue hits
    /// the target. Returns `false` when the eigenvalue computation does
    /// not converge or the matrix is degenerate (zero radius), in which
    /// case the caller retries with a fresh draw.
    fn normalize_spectrum(weights: &mut DMatrix<Weight>, spectral_radius: Weight) -> bool {
        let rho = match lin_alg::spectral_radius(&weights.map(|w| w as f64)) {
            Some(rho) => rho,
            None => return false,
        };
        if rho == 0.0 {
            return false;
        }
        *weights *= spectral_radius / rho as Weight;
        debug!("spectral radius becomes {}", spectral_radius);
        true
    }

    /// A `rows` x `cols` weight matrix for the input, feedback and output
    /// layers: a random subset of `round(rows * cols * connectivity)` cells
    /// gets an independent uniform `[-1, 1]` value, no normalization.
    pub fn dense_weights(
        &mut self,
        rows: usize,
        cols: usize,
        connectivity: Weight,
    ) -> DMatrix<Weight> {
        assert!(
            (0.0..=1.0).contains(&connectivity),
            "dense_weights: connectivity must be in [0, 1], got {}",
            connectivity
        );
        let cells = rows * cols;
        let mut weights = vec![0.0; cells];

        if connectivity == 1.0 {
            for w in weights.iter_mut() {
                *w = self.uniform(-1.0, 1.0);
            }
        } else {
            let nof_connections = (cells as f64 * connectivity as f64).round() as usize;
            let mut indices: Vec<usize> = (0..cells).collect();
            self.rng.shuffle(&mut indices);
            for &cell in indices.iter().take(nof_connections) {
                weights[cell] = self.uniform(-1.0, 1.0);
            }
        }
        DMatrix::from_row_slice(rows, cols, &weights)
    }

    /// Apply `w = w * scale + shift` to every entry.
    pub fn scale_and_shift(weights: &mut DMatrix<Weight>, scale: Weight, shift: Weight) {
        for w in weights.iter_mut() {
            *w = *w * scale + shift;
        }
    }

    fn uniform(&mut self, min: Weight, max: Weight) -> Weight {
        self.rng.generate::<f64>() as Weight * (max - min) + min
    }
}

/// The `small << big` condition of the balanced-network model.
fn much_smaller(small: f64, big: f64) -> bool {
    const MINIMAL_RATIO: f64 = 1.5;
    big / small > MINIMAL_RATIO
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: Option<u64> = Some(42);

    #[test]
    fn random_mode_nonzero_count_is_exact() {
        if let Err(_) = pretty_env_logger::try_init() {}

        for (size, connectivity) in [(10, 0.8), (20, 0.25), (31, 0.5)] {
            let mut builder = ReservoirBuilder::new(SEED);
            let weights = builder.fill_random(size, connectivity);
            let nonzero = weights.iter().filter(|w| **w != 0.0).count();
            let expected = (size as f64 * size as f64 * connectivity as f64).round() as usize;
            assert_eq!(nonzero, expected, "size={}, connectivity={}", size, connectivity);
        }
    }

    #[test]
    fn normalization_hits_target_radius() {
        let mut builder = ReservoirBuilder::new(SEED);
        let target = 0.8;
        let weights = builder
            .reservoir_weights(50, 0.2, target, 0.7, ReservoirKind::Random)
            .expect("generation succeeds");

        let rho = lin_alg::spectral_radius(&weights.map(|w| w as f64)).expect("converges");
        assert!((rho - target as f64).abs() < 1e-3, "rho={}", rho);
    }

    #[test]
    fn balanced_mode_uses_published_constants() {
        let mut builder = ReservoirBuilder::new(SEED);
        let size = 100;
        let excitatory_ratio = 0.7;
        let connectivity = 0.1; // K = 10
        let weights = builder.fill_balanced(size, connectivity, excitatory_ratio);

        let n_e = (excitatory_ratio as f64 * size as f64).round() as usize;
        let scale = 1.0 / (connectivity * size as Weight).sqrt();
        for n in 0..size {
            for i in 0..size {
                let w = weights[(n, i)];
                if w == 0.0 {
                    continue;
                }
                let expected = match (n < n_e, i < n_e) {
                    (true, true) => J_EE,
                    (true, false) => J_EI,
                    (false, true) => J_IE,
                    (false, false) => J_II,
                } * scale;
                assert_eq!(w, expected, "entry ({}, {})", n, i);
            }
        }
    }

    #[test]
    fn balanced_mode_normalizes_too() {
        let mut builder = ReservoirBuilder::new(SEED);
        let target = 0.79;
        let weights = builder
            .reservoir_weights(100, 0.1, target, 0.7, ReservoirKind::Balanced)
            .expect("generation succeeds");
        let rho = lin_alg::spectral_radius(&weights.map(|w| w as f64)).expect("converges");
        assert!((rho - target as f64).abs() < 1e-3, "rho={}", rho);
    }

    #[test]
    fn dense_full_connectivity_fills_every_cell() {
        let mut builder = ReservoirBuilder::new(SEED);
        let weights = builder.dense_weights(7, 3, 1.0);
        assert_eq!(weights.iter().filter(|w| **w != 0.0).count(), 21);
        assert!(weights.iter().all(|w| (-1.0..=1.0).contains(w)));
    }

    #[test]
    fn dense_weights_respect_connectivity() {
        let mut builder = ReservoirBuilder::new(SEED);
        let weights = builder.dense_weights(10, 10, 0.3);
        assert_eq!(weights.iter().filter(|w| **w != 0.0).count(), 30);
    }

    #[test]
    #[should_panic(expected = "reservoir size must be > 1")]
    fn single_neuron_reservoir_is_rejected() {
        let mut builder = ReservoirBuilder::new(SEED);
        let _ = builder.reservoir_weights(1, 0.8, 0.8, 0.7, ReservoirKind::Random);
    }

    #[test]
    fn scale_and_shift_applies_elementwise() {
        let mut weights = DMatrix::from_row_slice(2, 2, &[1.0, -1.0, 0.5, 0.0]);
        ReservoirBuilder::scale_and_shift(&mut weights, 2.0, 1.0);
        assert_eq!(weights, DMatrix::from_row_slice(2, 2, &[3.0, -1.0, 2.0, 1.0]));
    }
}
