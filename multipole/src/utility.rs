pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![start];
    }

    let mut result = Vec::with_capacity(n);
    let step = (end - start) / (n as f64 - 1.0);

    for i in 0..n {
        result.push(start + (i as f64) * step);
    }

    result
}

/// Truncation order needed to represent a field inside a sphere of dimensionless radius `ka`.
pub fn ka2nmax(ka: f64) -> u32 {
    let ka = ka.abs();

    (ka + 3. * ka.cbrt()).ceil() as u32
}

/// Radius of validity `ka` of an expansion truncated at `nmax`,
/// the inverse of [`ka2nmax`] before rounding.
pub fn nmax2ka(nmax: u32) -> f64 {
    // t = ka^(1/3) solves t³ + 3t - nmax = 0
    let half = nmax as f64 / 2.;
    let root = (half * half + 1.).sqrt();
    let t = (half + root).cbrt() + (half - root).cbrt();

    t * t * t
}

/// Converts cartesian coordinates to spherical `[r, θ, φ]`.
pub fn cartesian_to_spherical(point: [f64; 3]) -> [f64; 3] {
    let [x, y, z] = point;
    let rho = x.hypot(y);

    [rho.hypot(z), rho.atan2(z), y.atan2(x)]
}

pub fn spherical_to_cartesian(point: [f64; 3]) -> [f64; 3] {
    let [r, theta, phi] = point;
    let (st, ct) = theta.sin_cos();
    let (sp, cp) = phi.sin_cos();

    [r * st * cp, r * st * sp, r * ct]
}
