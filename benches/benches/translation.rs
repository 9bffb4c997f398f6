use benches::setup_beam;
use diol::prelude::*;
use tweezers::{Basis, faer::Par, translation::TranslationMatrices};

fn main() -> eyre::Result<()> {
    let bench = Bench::new(Config::from_args()?);

    bench.register("translation matrices", translation_matrices, [5, 10, 20, 40]);
    bench.register(
        "translation matrices parallel",
        translation_matrices_parallel,
        [5, 10, 20, 40],
    );
    bench.register("translate beam", translate_beam, [5, 10, 20, 40]);
    bench.register("translate beam off axis", translate_beam_off_axis, [5, 10, 20]);

    bench.run()?;
    Ok(())
}

fn translation_matrices(bencher: Bencher, nmax: u32) {
    bencher.bench(|| {
        let matrices =
            TranslationMatrices::along_z(Basis::Regular, 2., nmax, nmax, Par::Seq).unwrap();

        black_box(matrices);
    });
}

fn translation_matrices_parallel(bencher: Bencher, nmax: u32) {
    bencher.bench(|| {
        let matrices =
            TranslationMatrices::along_z(Basis::Regular, 2., nmax, nmax, Par::rayon(0)).unwrap();

        black_box(matrices);
    });
}

fn translate_beam(bencher: Bencher, nmax: u32) {
    let beam = setup_beam(nmax, 4);
    let matrices = beam.translate_z_matrices(0.5, nmax, Par::Seq).unwrap();

    bencher.bench(|| {
        let translated = beam.apply_translation(&matrices).unwrap();

        black_box(translated);
    });
}

fn translate_beam_off_axis(bencher: Bencher, nmax: u32) {
    let beam = setup_beam(nmax, 1);

    bencher.bench(|| {
        let translated = beam.translate_xyz([0.3, -0.2, 0.4]).unwrap();

        black_box(translated);
    });
}
