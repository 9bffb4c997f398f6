use std::time::Instant;

use hhmmss::Hhmmss;
use tweezers::{
    Complex64,
    beams::{AnalyticBeam, GaussianOptions},
    bsc::ArrayType,
    faer::Par,
    fields::FieldOptions,
    logging::{LogConfig, init_logging},
    multipole::utility::linspace,
    utility::save_data,
    visualisation::{FieldType, VisualData},
};

pub fn main() {
    init_logging(&LogConfig::default());

    let field_type: FieldType = std::env::args()
        .nth(1)
        .unwrap_or("irradiance".to_string())
        .parse()
        .unwrap();

    ///////////////////////////////////

    let xs = linspace(-2., 2., 161);
    let zs = linspace(-2., 2., 161);
    let separation = 0.8;

    ///////////////////////////////////

    let beam = AnalyticBeam::Gaussian {
        waist: 0.5,
        polarisation: [Complex64::ONE, Complex64::ZERO],
        wavenumber: 2. * std::f64::consts::PI,
        options: GaussianOptions::default(),
    }
    .to_bsc(30)
    .unwrap();

    let pair = beam
        .translate_many(&[[separation, 0., 0.], [-separation, 0., 0.]])
        .unwrap()
        .with_array_type(ArrayType::Incoherent);

    let mut x_grid = Vec::with_capacity(xs.len() * zs.len());
    let mut z_grid = Vec::with_capacity(xs.len() * zs.len());
    let mut points = Vec::with_capacity(xs.len() * zs.len());
    for &z in &zs {
        for &x in &xs {
            x_grid.push(x);
            z_grid.push(z);
            points.push([x, 0., z]);
        }
    }

    let options = FieldOptions {
        parallel: Par::rayon(0),
    };

    let start = Instant::now();
    let data = pair.visualise(field_type, &points, &options).unwrap();
    println!("calculated in {}", start.elapsed().hhmmssxxx());

    let values = match data.into_iter().next() {
        Some(VisualData::Real(values)) => values,
        _ => panic!("{field_type} does not give real data for incoherent beams"),
    };

    let header = format!("x\tz\t{field_type}");
    save_data("two_beams_field_map", &header, &[x_grid, z_grid, values]).unwrap()
}
