pub mod harmonics;
pub mod mode_index;
pub mod radial;
pub mod utility;

pub use num::complex::Complex64;
