pub mod beams;
pub mod bsc;
pub mod coefficients;
pub mod error;
pub mod fields;
pub mod force;
pub mod logging;
pub mod rotation;
pub mod translation;
pub mod utility;
pub mod visualisation;

pub extern crate faer;
pub extern crate multipole;

pub use multipole::Complex64;
pub use multipole::radial::Basis;
