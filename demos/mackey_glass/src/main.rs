//! Train an echo state network to forecast a Mackey-Glass time series and
//! render the predictions next to the teacher signal, plus the reservoir
//! state trajectory as a ppm image.

#[macro_use]
extern crate log;

use std::{fs::File, io::Write};

use dialoguer::{theme::ColorfulTheme, Select};
use esn_core::{EchoStateNetwork, Params, ReservoirKind, Trainer, Weight};
use esn_plot::{plot, Series};

/// Delay constants of the Mackey-Glass equation; 17 is the classic mildly
/// chaotic regime, 30 is considerably harder.
const SOFT_MACKEY_GLASS: usize = 17;
const HARD_MACKEY_GLASS: usize = 30;

/// Constant bias fed to the single input neuron.
const INPUT_BIAS: Weight = 0.2;

const NOF_TRIALS: usize = 2;
const SEED: Option<u64> = Some(0);

fn mackeyglass_eq(x_t: f64, x_t_minus_tau: f64, a: f64, b: f64) -> f64 {
    -b * x_t + a * x_t_minus_tau / (1.0 + x_t_minus_tau.powi(10))
}

fn mackeyglass_rk4(x_t: f64, x_t_minus_tau: f64, deltat: f64, a: f64, b: f64) -> f64 {
    let k1 = deltat * mackeyglass_eq(x_t, x_t_minus_tau, a, b);
    let k2 = deltat * mackeyglass_eq(x_t + 0.5 * k1, x_t_minus_tau, a, b);
    let k3 = deltat * mackeyglass_eq(x_t + 0.5 * k2, x_t_minus_tau, a, b);
    let k4 = deltat * mackeyglass_eq(x_t + k3, x_t_minus_tau, a, b);
    x_t + k1 / 6.0 + k2 / 3.0 + k3 / 3.0 + k4 / 6.0
}

/// Generate a Mackey-Glass time series by RK4 integration.
fn mackey(sample_n: usize, tau: usize) -> Vec<f64> {
    let a = 0.2;
    let b = 0.1;
    let x0 = 1.2;
    let deltat = 0.1;

    let history_length = (tau as f64 / deltat).floor() as usize;
    let mut history = vec![0.0; history_length];
    let mut index = 0;
    let mut x_t = x0;

    let mut samples = Vec::with_capacity(sample_n);
    for _ in 0..sample_n {
        samples.push(x_t);

        let x_t_minus_tau = if tau == 0 {
            0.0
        } else {
            history[index]
        };
        let x_t_plus_deltat = mackeyglass_rk4(x_t, x_t_minus_tau, deltat, a, b);
        if tau != 0 {
            history[index] = x_t_plus_deltat;
            index = (index + 1) % history_length;
        }
        x_t = x_t_plus_deltat;
    }
    samples
}

/// Dump the reservoir state trajectory as a ppm image: one row per neuron,
/// one column per timestep, blue for negative and red for positive
/// activation.
fn write_states_ppm(
    states: &[Weight],
    reservoir_size: usize,
    trial_len: usize,
    filename: &str,
) -> std::io::Result<()> {
    let mut file = File::create(filename)?;
    write!(file, "P6\n{} {}\n255\n", trial_len, reservoir_size)?;
    for n in 0..reservoir_size {
        for t in 0..trial_len {
            let value = states[t * reservoir_size + n].clamp(-1.0, 1.0);
            let intensity = (value.abs() * 255.0) as u8;
            let rgb = if value < 0.0 {
                [0, 0, intensity]
            } else {
                [intensity, 0, 0]
            };
            file.write_all(&rgb)?;
        }
    }
    Ok(())
}

fn main() {
    pretty_env_logger::init();

    let difficulties = vec!["soft (tau = 17)", "hard (tau = 30)"];
    let tau = match Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select Mackey-Glass difficulty")
        .items(&difficulties)
        .default(0)
        .interact()
        .unwrap()
    {
        0 => SOFT_MACKEY_GLASS,
        _ => HARD_MACKEY_GLASS,
    };

    let kinds = vec!["random", "balanced excitatory/inhibitory"];
    let reservoir_kind = match Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select reservoir kind")
        .items(&kinds)
        .default(0)
        .interact()
        .unwrap()
    {
        0 => ReservoirKind::Random,
        _ => ReservoirKind::Balanced,
    };

    // the series needs some length before its statistics are usable
    let sample_all = 10_000;
    let raw = mackey(sample_all, tau);

    // downsample, then squash to [-1, 1] around the series mean of ~1
    let down_sample = 10;
    let values: Vec<f64> =
        raw.iter().step_by(down_sample).map(|x| (x - 1.0).tanh()).collect();
    info!("got {} datapoints after downsampling", values.len());

    let trial_len = 1000 / down_sample;

    let mut params = Params::new(1, 1, 200, 0.1);
    params.feedback_connectivity = 1.0;
    params.feedback_scale = 0.56;
    params.input_scale = 1.0;
    params.decay_rate = 0.9;
    params.time_constant = 0.44;
    params.spectral_radius = 0.79;
    params.reservoir_kind = reservoir_kind;
    params.seed = SEED;

    let mut esn = EchoStateNetwork::new(params);
    esn.init().expect("reservoir generation failed");
    esn.log_stats();

    let mut trainer = Trainer::new(esn, SEED);
    let bias = vec![INPUT_BIAS; trial_len];
    for t in 0..NOF_TRIALS {
        let start = 200 + t * trial_len;
        let teacher: Vec<Weight> =
            values[start..start + trial_len].iter().map(|x| *x as Weight).collect();
        trainer.add_trial(bias.clone(), teacher, start as i32);
    }

    trainer.run_trials().expect("training failed");
    info!("training done over {} trials", NOF_TRIALS);

    trainer.esn().save("mackey_glass.esn").expect("saving the checkpoint failed");

    let nof_tests = trainer.test_set().count();
    let reservoir_size = trainer.esn().params().reservoir_size;
    for i in 0..nof_tests {
        let run = trainer.run_test_with_states(i).expect("test run failed");

        let teacher: Series =
            run.teacher.iter().enumerate().map(|(t, v)| (t as f64, *v as f64)).collect();
        let predicted: Series =
            run.predicted.iter().enumerate().map(|(t, v)| (t as f64, *v as f64)).collect();

        let filename = format!("graph{}.png", i);
        info!("plotting test trial {} to {}", i, filename);
        plot(&teacher, &predicted, &filename, (1024, 768));

        let states = run.states.expect("states were requested");
        let ppm = format!("reservoir_state{}.ppm", i);
        write_states_ppm(&states, reservoir_size, trial_len, &ppm)
            .expect("writing the state image failed");
        info!("reservoir states written to {}", ppm);
    }
}
