//! Dataset (spec §4.3): a named set of dimensions sharing an external index
//! space of rank 1..8.

use crate::dimension::Dimension;
use crate::error::{DasError, Result};

/// Maximum external-index rank a dataset may declare (spec §4.3).
pub const MAX_RANK: u8 = 8;

/// A named set of dimensions sharing an external index space (spec §4.3).
pub struct Dataset {
    name: String,
    rank: u8,
    dimensions: Vec<Dimension>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, rank: u8) -> Result<Self> {
        if rank == 0 || rank > MAX_RANK {
            return Err(DasError::InvalidArgument(format!(
                "dataset rank must be in 1..={MAX_RANK}, got {rank}"
            )));
        }
        Ok(Dataset { name: name.into(), rank, dimensions: Vec::new() })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rank(&self) -> u8 {
        self.rank
    }

    pub fn add_dimension(&mut self, dim: Dimension) {
        self.dimensions.push(dim);
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name() == name)
    }
}
