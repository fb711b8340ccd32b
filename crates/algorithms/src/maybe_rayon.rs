//! Rayon or sequential execution of grid rows.
//!
//! With the `parallel` feature this re-exports rayon's parallel iterators.
//! Without it, `into_par_iter()` falls back to `into_iter()` so the grid
//! writer compiles unchanged and evaluates its batches on one thread.
#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    /// Sequential stand-in for `rayon::prelude::IntoParallelIterator`.
    pub trait IntoParallelIterator {
        type Iter;
        type Item;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_collect() {
        let rows: Vec<usize> = (0..64usize).into_par_iter().map(|r| r * 2).collect();
        assert_eq!(rows, (0..64).map(|r| r * 2).collect::<Vec<_>>());
    }
}
