//! Train / validation / test node partitions.

use crate::{Error, Result};
use std::collections::HashSet;
use std::ops::Range;

/// Size of the validation window that follows the labeled training range
/// in the citation datasets.
pub const DEFAULT_VAL_SIZE: usize = 500;

/// Node ids of each partition, in the order they are consumed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Split {
    pub train: Vec<usize>,
    pub val: Vec<usize>,
    pub test: Vec<usize>,
}

impl Split {
    pub fn new(train: Vec<usize>, val: Vec<usize>, test: Vec<usize>) -> Self {
        Self { train, val, test }
    }

    /// Contiguous train and validation ranges plus an explicit test list.
    pub fn from_ranges(train: Range<usize>, val: Range<usize>, test: Vec<usize>) -> Self {
        Self::new(train.collect(), val.collect(), test)
    }

    /// Every id must lie in `[0, num_nodes)`.
    pub fn validate(&self, num_nodes: usize) -> Result<()> {
        for (name, part) in self.parts() {
            if let Some(&bad) = part.iter().find(|&&i| i >= num_nodes) {
                return Err(Error::InvalidPartition(format!(
                    "{name} contains node {bad} but the graph has {num_nodes} nodes"
                )));
            }
        }
        Ok(())
    }

    /// Number of distinct nodes that appear in more than one partition.
    pub fn overlap(&self) -> usize {
        let train: HashSet<_> = self.train.iter().collect();
        let val: HashSet<_> = self.val.iter().collect();
        let test: HashSet<_> = self.test.iter().collect();
        let mut shared: HashSet<&usize> = train.intersection(&val).copied().collect();
        shared.extend(train.intersection(&test).copied());
        shared.extend(val.intersection(&test).copied());
        shared.len()
    }

    pub fn parts(&self) -> [(&'static str, &[usize]); 3] {
        [
            ("train", self.train.as_slice()),
            ("val", self.val.as_slice()),
            ("test", self.test.as_slice()),
        ]
    }
}
