use std::collections::BTreeMap;
use std::ops::Range;

use serde::Serialize;

use crate::{Error, Result};

/// Block layout of a lazy array: for every dimension, the ascending block
/// boundaries from 0 to the dimension's extent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkGrid {
    boundaries: Vec<Vec<usize>>,
}

impl ChunkGrid {
    /// Requested sizes win. Otherwise the leading dimension follows
    /// `leading_blocks` (one block per file) when given, and every other
    /// dimension is a single block.
    pub(crate) fn new(
        dims: &[String],
        shape: &[usize],
        leading_blocks: Option<&[usize]>,
        requested: &BTreeMap<String, usize>,
    ) -> Result<Self> {
        if let Some(unknown) = requested.keys().find(|d| !dims.contains(d)) {
            return Err(Error::InvalidOptions(format!(
                "cannot chunk unknown dimension '{}' (dimensions: {})",
                unknown,
                dims.join(", ")
            )));
        }

        let boundaries = dims
            .iter()
            .zip(shape)
            .enumerate()
            .map(|(axis, (dim, &len))| match (requested.get(dim), leading_blocks) {
                (Some(&size), _) => uniform(len, size),
                (None, Some(blocks)) if axis == 0 => from_lengths(blocks),
                _ => vec![0, len],
            })
            .collect();

        Ok(Self { boundaries })
    }

    /// Number of chunks along each dimension.
    pub fn shape(&self) -> Vec<usize> {
        self.boundaries.iter().map(|b| b.len() - 1).collect()
    }

    /// Total number of chunks.
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block sizes along dimension `axis`.
    pub fn sizes(&self, axis: usize) -> Vec<usize> {
        self.boundaries
            .get(axis)
            .map(|b| b.windows(2).map(|w| w[1] - w[0]).collect())
            .unwrap_or_default()
    }

    /// Index ranges covered by chunk `index`.
    pub fn ranges(&self, index: &[usize]) -> Result<Vec<Range<usize>>> {
        let out_of_range = || Error::ChunkOutOfRange {
            index: index.to_vec(),
            grid: self.shape(),
        };
        if index.len() != self.boundaries.len() {
            return Err(out_of_range());
        }
        index
            .iter()
            .zip(&self.boundaries)
            .map(|(&i, bounds)| {
                if i + 1 < bounds.len() {
                    Ok(bounds[i]..bounds[i + 1])
                } else {
                    Err(out_of_range())
                }
            })
            .collect()
    }

    /// Every chunk index in row-major order.
    pub fn indices(&self) -> Vec<Vec<usize>> {
        let shape = self.shape();
        let mut out = Vec::with_capacity(self.len());
        if shape.contains(&0) {
            return out;
        }
        let mut current = vec![0; shape.len()];
        loop {
            out.push(current.clone());
            let mut axis = shape.len();
            loop {
                if axis == 0 {
                    return out;
                }
                axis -= 1;
                current[axis] += 1;
                if current[axis] < shape[axis] {
                    break;
                }
                current[axis] = 0;
            }
        }
    }
}

fn uniform(len: usize, size: usize) -> Vec<usize> {
    let mut bounds: Vec<usize> = (0..len).step_by(size.max(1)).collect();
    bounds.push(len);
    bounds
}

fn from_lengths(lengths: &[usize]) -> Vec<usize> {
    let mut bounds = vec![0];
    for len in lengths.iter().filter(|l| **l > 0) {
        bounds.push(bounds[bounds.len() - 1] + len);
    }
    if bounds.len() == 1 {
        bounds.push(0);
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> Vec<String> {
        vec!["time".to_string(), "yt".to_string(), "xt".to_string()]
    }

    #[test]
    fn test_default_grid_is_one_chunk_per_file() {
        let grid = ChunkGrid::new(&dims(), &[36, 2, 3], Some(&[12, 12, 12]), &BTreeMap::new()).unwrap();
        assert_eq!(grid.shape(), vec![3, 1, 1]);
        assert_eq!(grid.sizes(0), vec![12, 12, 12]);
        assert_eq!(grid.ranges(&[1, 0, 0]).unwrap(), vec![12..24, 0..2, 0..3]);
    }

    #[test]
    fn test_requested_sizes_override_file_blocks() {
        let requested = BTreeMap::from([("time".to_string(), 10), ("xt".to_string(), 2)]);
        let grid = ChunkGrid::new(&dims(), &[36, 2, 3], Some(&[12, 12, 12]), &requested).unwrap();
        assert_eq!(grid.sizes(0), vec![10, 10, 10, 6]);
        assert_eq!(grid.sizes(2), vec![2, 1]);
        assert_eq!(grid.len(), 8);
        assert_eq!(grid.indices().len(), 8);
        assert_eq!(grid.indices()[1], vec![0, 0, 1]);
    }

    #[test]
    fn test_unknown_dimension_and_bad_index() {
        let requested = BTreeMap::from([("depth".to_string(), 1)]);
        assert!(matches!(
            ChunkGrid::new(&dims(), &[1, 2, 3], None, &requested),
            Err(Error::InvalidOptions(_))
        ));

        let grid = ChunkGrid::new(&dims(), &[1, 2, 3], None, &BTreeMap::new()).unwrap();
        assert!(matches!(
            grid.ranges(&[1, 0, 0]),
            Err(Error::ChunkOutOfRange { .. })
        ));
        assert!(grid.ranges(&[0, 0]).is_err());
    }

    #[test]
    fn test_scalar_grid_has_one_chunk() {
        let grid = ChunkGrid::new(&[], &[], None, &BTreeMap::new()).unwrap();
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.indices(), vec![Vec::<usize>::new()]);
        assert!(grid.ranges(&[]).unwrap().is_empty());
    }
}
