#[macro_use]
extern crate log;

mod plot;

pub use plot::plot;

pub type Series = Vec<(f64, f64)>;
