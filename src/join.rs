//! Ordered fan-in of concurrent loads

use crate::error::{LoadError, Result};
use crate::model::LoadedAsset;

/// Counter-based join over `N` indexed slots
///
/// Results may arrive in any order; each is stored at its index and the
/// join reports completion exactly once, when every slot is filled.
#[derive(Debug)]
pub struct FanIn<T> {
    slots: Vec<Option<T>>,
    filled: usize,
    fired: bool,
}

impl<T> FanIn<T> {
    /// Create a join waiting on `expected` results
    pub fn new(expected: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(expected).collect(),
            filled: 0,
            fired: false,
        }
    }

    /// Number of slots
    pub fn expected(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots filled so far
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// Whether every slot is filled
    pub fn is_complete(&self) -> bool {
        self.filled == self.slots.len()
    }

    /// Store `value` at `index`
    ///
    /// Returns `true` for the completion that fills the last slot and
    /// `false` otherwise. A second completion for the same index, or one
    /// past the end, is ignored.
    pub fn complete(&mut self, index: usize, value: T) -> bool {
        match self.slots.get_mut(index) {
            Some(slot @ None) => {
                *slot = Some(value);
                self.filled += 1;
            }
            Some(Some(_)) => {
                log::warn!("Ignoring duplicate completion for slot {index}");
                return false;
            }
            None => {
                log::warn!("Ignoring completion for slot {index} of {}", self.slots.len());
                return false;
            }
        }

        if self.is_complete() && !self.fired {
            self.fired = true;
            return true;
        }
        false
    }

    /// The results in slot order, once every slot is filled
    pub fn into_results(self) -> Option<Vec<T>> {
        self.slots.into_iter().collect()
    }
}

/// Ordered results of a batch load
///
/// A failed entry occupies its slot as an error; the others still load.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    results: Vec<Result<LoadedAsset>>,
}

impl BatchResult {
    /// Wrap results that are already in request order
    pub fn new(results: Vec<Result<LoadedAsset>>) -> Self {
        Self { results }
    }

    /// Results in request order
    pub fn results(&self) -> &[Result<LoadedAsset>] {
        &self.results
    }

    /// Take the results in request order
    pub fn into_results(self) -> Vec<Result<LoadedAsset>> {
        self.results
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the batch was empty
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Whether every entry loaded
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|r| r.is_ok())
    }

    /// Errors with their request index
    pub fn failures(&self) -> impl Iterator<Item = (usize, &LoadError)> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().err().map(|err| (i, err)))
    }

    /// All assets, or the first error in request order
    pub fn into_assets(self) -> Result<Vec<LoadedAsset>> {
        self.results.into_iter().collect()
    }
}

impl IntoIterator for BatchResult {
    type Item = Result<LoadedAsset>;
    type IntoIter = std::vec::IntoIter<Result<LoadedAsset>>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}
