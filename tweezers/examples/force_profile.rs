use std::time::Instant;

use hhmmss::Hhmmss;
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;
use tweezers::{
    Complex64,
    beams::{AnalyticBeam, GaussianOptions, Scatterer, TMatrix},
    bsc::{Bsc, Truncation},
    faer::Par,
    force::{ForceTorque, force_torque_on},
    logging::{LogConfig, init_logging},
    multipole::utility::linspace,
    utility::{save_data, save_serialize},
};

pub fn main() {
    init_logging(&LogConfig::default());

    match std::env::args().nth(1).as_deref() {
        Some("lateral") => lateral(),
        Some("axial") | None => axial(),
        Some(other) => panic!("unknown problem {other}, expected axial or lateral"),
    }
}

/// Focused beam of unit power and vacuum wavelength 1.
fn beam() -> Bsc {
    AnalyticBeam::Gaussian {
        waist: 0.6,
        polarisation: [Complex64::ONE, Complex64::ZERO],
        wavenumber: 2. * std::f64::consts::PI,
        options: GaussianOptions::default(),
    }
    .to_bsc(24)
    .unwrap()
}

/// Weakly absorbing particle responding in the lowest degrees.
fn particle() -> TMatrix {
    TMatrix::diagonal(
        5,
        |n| Complex64::new(-0.2 / n as f64, 0.1),
        |n| Complex64::new(-0.15 / n as f64, 0.05),
    )
}

fn axial() {
    ///////////////////////////////////

    let positions = linspace(-1.5, 1.5, 301);

    ///////////////////////////////////

    let beam = beam();
    let particle = particle();

    let start = Instant::now();
    let forces = positions
        .par_iter()
        .progress()
        .map(|&z| {
            let translated = beam.translate_z_with(z, particle.nmax(), Par::Seq).unwrap();

            force_torque_on(&particle, &translated).unwrap()[0]
        })
        .collect::<Vec<ForceTorque>>();

    let elapsed = start.elapsed();
    println!("calculated in {}", elapsed.hhmmssxxx());

    let fz = forces.iter().map(|f| f.force[2]).collect();
    let tz = forces.iter().map(|f| f.torque[2]).collect();

    let header = "z\tfz\ttz";
    let data = vec![positions, fz, tz];

    save_data("axial_force", header, &data).unwrap()
}

fn lateral() {
    ///////////////////////////////////

    let positions = linspace(-1., 1., 41);

    ///////////////////////////////////

    let beam = beam();
    let particle = particle();
    let offsets: Vec<[f64; 3]> = positions.iter().map(|&x| [x, 0., 0.]).collect();

    let start = Instant::now();
    let array = beam
        .translate_many(&offsets)
        .unwrap()
        .set_nmax(particle.nmax(), Truncation::ignore())
        .unwrap();
    let forces = force_torque_on(&particle, &array).unwrap();

    let elapsed = start.elapsed();
    println!("calculated {} positions in {}", forces.len(), elapsed.hhmmssxxx());

    save_serialize("lateral_force", &forces).unwrap()
}
