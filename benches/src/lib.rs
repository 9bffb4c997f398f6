use rand::{Rng, SeedableRng, distr::Uniform, rngs::StdRng};
use tweezers::{
    Basis, Complex64,
    bsc::Bsc,
    faer::Mat,
    multipole::mode_index::max_linear_index,
    rotation::{Rotation, matmul3, rotation_y, rotation_z},
};

/// Dense regular beam with reproducible random coefficients.
pub fn setup_beam(nmax: u32, columns: usize) -> Bsc {
    let mut rng = StdRng::seed_from_u64(nmax as u64);
    let distribution = Uniform::new(-1., 1.).unwrap();
    let len = max_linear_index(nmax);

    let mut random = || Complex64::new(rng.sample(distribution), rng.sample(distribution));
    let a = Mat::from_fn(len, columns, |_, _| random());
    let b = Mat::from_fn(len, columns, |_, _| random());

    Bsc::new(&a, &b, Basis::Regular, 1.).unwrap()
}

pub fn setup_rotation() -> Rotation {
    matmul3(&rotation_z(0.3), &rotation_y(1.1))
}
