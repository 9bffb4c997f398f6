use std::fmt::Display;

use multipole::radial::Basis;
use thiserror::Error;

/// Failures of beam coefficient operations. All of them are raised at the point of detection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BscError {
    #[error("coefficient shapes differ: a is {a_rows}x{a_cols}, b is {b_rows}x{b_cols}")]
    ShapeMismatch {
        a_rows: usize,
        a_cols: usize,
        b_rows: usize,
        b_cols: usize,
    },

    #[error("coefficient length {0} is not of the form nmax(nmax + 2)")]
    InvalidOrder(usize),

    #[error("truncation to nmax {nmax} loses relative power {loss:e} (tolerance {tolerance:e})")]
    Truncation { nmax: u32, loss: f64, tolerance: f64 },

    #[error("{operation} is not defined for a beam in the {basis:?} basis")]
    Basis { operation: &'static str, basis: Basis },

    #[error("ambiguous request of {outputs} outputs for a beam with {columns} columns")]
    UnsupportedMultiOutput { columns: usize, outputs: usize },

    #[error("cannot combine beams with {left} and {right} columns")]
    ColumnMismatch { left: usize, right: usize },

    #[error("operator of shape {rows}x{cols} cannot act on coefficients of length {expected}")]
    OperatorShape { rows: usize, cols: usize, expected: usize },

    #[error("quadrature rule with {0} points is not available")]
    Quadrature(usize),

    #[error("unknown field type '{0}'")]
    UnknownFieldType(String),

    #[error("field type '{0}' has no incoherent sum")]
    IncoherentFieldType(String),
}

/// Non fatal loss of accuracy, reported through `tracing` once per offending call.
#[derive(Debug, Clone, PartialEq)]
pub enum AccuracyWarning {
    OutsideValidRegion { absdz: f64, radius: f64 },
    PowerLoss { nmax: u32, loss_a: f64, loss_b: f64 },
}

impl AccuracyWarning {
    pub fn emit(&self) {
        tracing::warn!(target: "tweezers::accuracy", "{self}");
    }
}

impl Display for AccuracyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccuracyWarning::OutsideValidRegion { absdz, radius } => write!(
                f,
                "cumulative translation {absdz:e} exceeds the valid radius {radius:e}"
            ),
            AccuracyWarning::PowerLoss { nmax, loss_a, loss_b } => write!(
                f,
                "truncation to nmax {nmax} loses relative power {loss_a:e} in a and {loss_b:e} in b"
            ),
        }
    }
}

#[cfg(test)]
pub(crate) mod test {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::{Layer, layer::Context, prelude::*};

    use super::AccuracyWarning;

    /// Counts warning events emitted while `f` runs on the current thread.
    pub(crate) fn count_warnings<T>(f: impl FnOnce() -> T) -> (T, usize) {
        let counter = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarningCounter(counter.clone()));

        let value = tracing::subscriber::with_default(subscriber, f);

        (value, counter.load(Ordering::SeqCst))
    }

    struct WarningCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for WarningCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_warning_is_counted() {
        let (_, count) = count_warnings(|| {
            AccuracyWarning::PowerLoss {
                nmax: 3,
                loss_a: 0.1,
                loss_b: 0.,
            }
            .emit()
        });

        assert_eq!(count, 1);
    }
}
