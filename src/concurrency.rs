//! Workload-adaptive concurrency sizing
//!
//! Pure policy mapping a workload size to a bounded degree of parallelism.
//! Existence probes are cheap HEAD requests and get a wider band than full
//! image transfers:
//!
//! | workload (fetch) | degree               | workload (probe) | degree                |
//! |------------------|----------------------|------------------|-----------------------|
//! | ≤ 25             | 3                    | ≤ 50             | 5                     |
//! | ≤ 50             | min(5, 2×cores)      | ≤ 100            | min(10, 4×cores)      |
//! | ≤ 100            | min(7, 2×cores)      | ≤ 200            | min(15, 4×cores)      |
//! | larger           | min(10, 2×cores)     | larger           | min(20, 4×cores)      |
//!
//! The result is clamped to the small-workload value as a floor, so fetch
//! degrees always land in [3, 10] and probe degrees in [5, 20] regardless of
//! core count. An unknown or zero core count substitutes 4.

use std::num::NonZeroUsize;

/// Fallback core count when detection fails or reports zero
const FALLBACK_CORES: usize = 4;

/// What kind of work the degree is sized for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConcurrencyMode {
    /// Lightweight existence probes (HEAD requests, no body transfer)
    Probe,
    /// Full image transfers
    Fetch,
}

/// Degree of parallelism for `workload` items of work in the given mode.
///
/// Total and side-effect free apart from reading the detected core count;
/// use [`degree_for_with_cores`] to pin the core count in tests.
pub fn degree_for(workload: usize, mode: ConcurrencyMode) -> usize {
    degree_for_with_cores(workload, mode, detected_cores())
}

/// [`degree_for`] with an explicit core count.
pub fn degree_for_with_cores(workload: usize, mode: ConcurrencyMode, cores: usize) -> usize {
    let cores = if cores == 0 { FALLBACK_CORES } else { cores };
    match mode {
        ConcurrencyMode::Fetch => {
            let base = (cores * 2).min(10);
            let degree = match workload {
                0..=25 => 3,
                26..=50 => base.min(5),
                51..=100 => base.min(7),
                _ => base,
            };
            degree.max(3)
        }
        ConcurrencyMode::Probe => {
            let base = (cores * 4).min(20);
            let degree = match workload {
                0..=50 => 5,
                51..=100 => base.min(10),
                101..=200 => base.min(15),
                _ => base,
            };
            degree.max(5)
        }
    }
}

fn detected_cores() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(FALLBACK_CORES)
}
