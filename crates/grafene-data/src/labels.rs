//! Per-node class labels with an explicit unlabeled marker.
//!
//! Source formats encode "no label" as an all-zero one-hot row or by leaving
//! a node out of every labeled index group. Both become `None` here, so a
//! missing label can never be mistaken for class 0.

use crate::{Error, Result};
use grafene_core::Error as CoreError;
use ndarray::ArrayView2;

/// Class id per node, `None` for unlabeled nodes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelVector {
    labels: Vec<Option<u32>>,
}

impl LabelVector {
    /// `n` unlabeled nodes.
    pub fn unlabeled(n: usize) -> Self {
        Self {
            labels: vec![None; n],
        }
    }

    pub fn from_options(labels: Vec<Option<u32>>) -> Self {
        Self { labels }
    }

    /// Collapse one-hot rows to class ids (first maximum wins).
    ///
    /// Rows with no positive entry are unlabeled.
    pub fn from_one_hot(one_hot: ArrayView2<'_, f32>) -> Self {
        let labels = one_hot
            .rows()
            .into_iter()
            .map(|row| {
                let mut best: Option<(usize, f32)> = None;
                for (c, &v) in row.iter().enumerate() {
                    if v > 0.0 && best.map_or(true, |(_, b)| v > b) {
                        best = Some((c, v));
                    }
                }
                best.map(|(c, _)| c as u32)
            })
            .collect();
        Self { labels }
    }

    /// Assign `classes[k]` to node `nodes[k]`.
    pub fn assign(&mut self, nodes: &[usize], classes: &[u32]) -> Result<()> {
        if nodes.len() != classes.len() {
            return Err(Error::Format(format!(
                "{} nodes but {} labels",
                nodes.len(),
                classes.len()
            )));
        }
        let n = self.labels.len();
        for (&node, &class) in nodes.iter().zip(classes) {
            let slot = self
                .labels
                .get_mut(node)
                .ok_or(CoreError::IndexOutOfBounds { index: node, bound: n })?;
            *slot = Some(class);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, node: usize) -> Option<u32> {
        self.labels.get(node).copied().flatten()
    }

    pub fn as_slice(&self) -> &[Option<u32>] {
        &self.labels
    }

    pub fn num_labeled(&self) -> usize {
        self.labels.iter().filter(|l| l.is_some()).count()
    }

    /// `1 + max class id`, or 0 when nothing is labeled.
    pub fn num_classes(&self) -> usize {
        self.labels
            .iter()
            .flatten()
            .max()
            .map_or(0, |&m| m as usize + 1)
    }

    /// Labels of `nodes`, in order. Every node must be labeled.
    pub fn gather(&self, nodes: &[usize]) -> Result<Vec<u32>> {
        nodes
            .iter()
            .map(|&node| {
                if node >= self.labels.len() {
                    return Err(CoreError::IndexOutOfBounds {
                        index: node,
                        bound: self.labels.len(),
                    }
                    .into());
                }
                self.labels[node].ok_or(Error::Unlabeled(node))
            })
            .collect()
    }

    /// New vector whose entry `i` is `self[source[i]]`.
    pub fn permute(&self, source: &[usize]) -> Result<Self> {
        let n = self.labels.len();
        let labels = source
            .iter()
            .map(|&s| {
                self.labels
                    .get(s)
                    .copied()
                    .ok_or(CoreError::IndexOutOfBounds { index: s, bound: n })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { labels })
    }
}
