use benches::{setup_beam, setup_rotation};
use diol::prelude::*;
use tweezers::rotation::WignerMatrix;

fn main() -> eyre::Result<()> {
    let bench = Bench::new(Config::from_args()?);

    bench.register("wigner matrix", wigner_matrix, [5, 10, 20, 40]);
    bench.register("rotate beam", rotate_beam, [5, 10, 20, 40]);

    bench.run()?;
    Ok(())
}

fn wigner_matrix(bencher: Bencher, nmax: u32) {
    let rotation = setup_rotation();

    bencher.bench(|| {
        let wigner = WignerMatrix::new(nmax, &rotation);

        black_box(wigner);
    });
}

fn rotate_beam(bencher: Bencher, nmax: u32) {
    let beam = setup_beam(nmax, 4);
    let wigner = WignerMatrix::new(nmax, &setup_rotation());

    bencher.bench(|| {
        let rotated = beam.rotate_wigner(&wigner).unwrap();

        black_box(rotated);
    });
}
