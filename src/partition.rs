//! Ownership of cells among processes.
use serde::{Deserialize, Serialize};

/// Assigns each cell of a mesh to exactly one process (rank).
///
/// A partition is always seen from the point of view of a single rank: cells owned by that rank
/// are *locally owned*, all other cells belong to other processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellPartition {
    rank: usize,
    num_ranks: usize,
    owners: Vec<usize>,
}

impl CellPartition {
    /// A partition where every cell is owned by the single process.
    pub fn serial(num_cells: usize) -> Self {
        Self {
            rank: 0,
            num_ranks: 1,
            owners: vec![0; num_cells],
        }
    }

    /// Constructs a partition from the owning rank of each cell.
    ///
    /// # Panics
    ///
    /// Panics if `rank` or any owner is not smaller than `num_ranks`.
    pub fn from_owners(rank: usize, num_ranks: usize, owners: Vec<usize>) -> Self {
        assert!(rank < num_ranks, "Rank must be smaller than the number of ranks.");
        assert!(
            owners.iter().all(|&owner| owner < num_ranks),
            "All owners must be smaller than the number of ranks."
        );
        Self { rank, num_ranks, owners }
    }

    /// Splits `num_cells` cells into `num_ranks` contiguous blocks of nearly equal size.
    pub fn contiguous(num_cells: usize, rank: usize, num_ranks: usize) -> Self {
        assert!(num_ranks > 0, "Need at least one rank.");
        let base = num_cells / num_ranks;
        let remainder = num_cells % num_ranks;
        let owners = (0..num_ranks)
            .flat_map(|r| {
                let count = if r < remainder { base + 1 } else { base };
                std::iter::repeat(r).take(count)
            })
            .collect();
        Self::from_owners(rank, num_ranks, owners)
    }

    /// The same assignment of cells seen from another rank.
    pub fn with_rank(&self, rank: usize) -> Self {
        Self::from_owners(rank, self.num_ranks, self.owners.clone())
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn num_ranks(&self) -> usize {
        self.num_ranks
    }

    pub fn num_cells(&self) -> usize {
        self.owners.len()
    }

    pub fn owners(&self) -> &[usize] {
        &self.owners
    }

    /// Returns the owning rank of the cell, or `None` if the cell index is out of bounds.
    pub fn owner(&self, cell: usize) -> Option<usize> {
        self.owners.get(cell).copied()
    }

    pub fn is_locally_owned(&self, cell: usize) -> bool {
        self.owner(cell) == Some(self.rank)
    }

    /// Whether every cell is owned by this process.
    pub fn is_fully_local(&self) -> bool {
        self.owners.iter().all(|&owner| owner == self.rank)
    }

    pub fn owned_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.owners
            .iter()
            .enumerate()
            .filter(move |(_, owner)| **owner == self.rank)
            .map(|(cell, _)| cell)
    }

    pub fn num_owned_cells(&self) -> usize {
        self.owned_cells().count()
    }
}
