use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Bytes attributed to each path over the observation window.
///
/// Paths keep the order in which they were first seen, which breaks ties in
/// [`AccumulatedBytes::top`].
#[derive(Debug, Default, Clone)]
pub struct AccumulatedBytes {
    entries: Vec<(PathBuf, u64)>,
    index: HashMap<PathBuf, usize>,
}

impl AccumulatedBytes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `bytes` to `path`, inserting it with `bytes` if absent.
    pub fn add(&mut self, path: PathBuf, bytes: u64) {
        match self.index.get(&path) {
            Some(&slot) => {
                let total = &mut self.entries[slot].1;
                *total = total.saturating_add(bytes);
            }
            None => {
                self.index.insert(path.clone(), self.entries.len());
                self.entries.push((path, bytes));
            }
        }
    }

    pub fn get(&self, path: &Path) -> Option<u64> {
        self.index.get(path).map(|&slot| self.entries[slot].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns up to `n` paths, largest first; equal totals keep first-seen order.
    pub fn top(&self, n: usize) -> Vec<(&Path, u64)> {
        let mut ranked: Vec<(&Path, u64)> = self
            .entries
            .iter()
            .map(|(path, bytes)| (path.as_path(), *bytes))
            .collect();
        // `sort_by` is stable.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }
}
