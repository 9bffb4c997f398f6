#[cfg(feature = "allocations")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

fn main() {
    #[cfg(feature = "allocations")]
    translation();

    #[cfg(feature = "allocations")]
    rotation();
}

#[cfg(feature = "allocations")]
fn translation() {
    use benches::setup_beam;
    use tweezers::faer::Par;

    let _profiler = dhat::Profiler::new_heap();

    let beam = setup_beam(30, 1);
    beam.translate_z_with(2., 30, Par::Seq).unwrap();
}

#[cfg(feature = "allocations")]
fn rotation() {
    use benches::{setup_beam, setup_rotation};

    let _profiler = dhat::Profiler::new_heap();

    let beam = setup_beam(30, 1);
    beam.rotate(&setup_rotation());
}
