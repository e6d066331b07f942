//! Thread-count handling shared by extraction, training and prediction.

use rayon::prelude::*;

// =============================================================================
// Parallelism
// =============================================================================

/// Execution mode hint.
///
/// Passed down through extraction, split search and batch prediction.
/// Components never manage thread pools; they only respect this flag. The
/// pool itself is set up by [`run_with_threads`] from the configured
/// `n_threads`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parallelism {
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Mode for a configured thread count, where `0` means every core the
    /// ambient rayon pool offers.
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        match n_threads {
            1 => Self::Sequential,
            0 if rayon::current_num_threads() == 1 => Self::Sequential,
            _ => Self::Parallel,
        }
    }

    #[inline]
    pub fn is_parallel(self) -> bool {
        self == Self::Parallel
    }

    /// Map in input order, in parallel when allowed.
    #[inline]
    pub fn maybe_par_map<T, B, I, F>(self, iter: I, f: F) -> Vec<B>
    where
        T: Send,
        B: Send,
        I: IntoIterator<Item = T> + IntoParallelIterator<Item = T>,
        F: Fn(T) -> B + Sync + Send,
    {
        match self {
            Self::Parallel => iter.into_par_iter().map(f).collect(),
            Self::Sequential => iter.into_iter().map(f).collect(),
        }
    }

    #[inline]
    pub fn maybe_par_for_each<T, I, F>(self, iter: I, f: F)
    where
        T: Send,
        I: IntoIterator<Item = T> + IntoParallelIterator<Item = T>,
        F: Fn(T) + Sync + Send,
    {
        match self {
            Self::Parallel => iter.into_par_iter().for_each(f),
            Self::Sequential => iter.into_iter().for_each(f),
        }
    }
}

// =============================================================================
// Thread Pools
// =============================================================================

/// Call `f` inside a rayon pool sized for `n_threads`.
///
/// `1` runs `f` on the calling thread with [`Parallelism::Sequential`];
/// `0` uses a pool with rayon's default size; any other value gets exactly
/// that many workers. When the pool cannot be built, `f` runs sequentially.
pub fn run_with_threads<T: Send>(n_threads: usize, f: impl FnOnce(Parallelism) -> T + Send) -> T {
    match Parallelism::from_threads(n_threads) {
        Parallelism::Sequential => f(Parallelism::Sequential),
        Parallelism::Parallel => match rayon::ThreadPoolBuilder::new().num_threads(n_threads).build() {
            Ok(pool) => pool.install(|| f(Parallelism::Parallel)),
            Err(e) => {
                tracing::warn!(error = %e, n_threads, "thread pool unavailable, running sequentially");
                f(Parallelism::Sequential)
            }
        },
    }
}
