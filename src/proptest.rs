//! `proptest` strategies for norms, partitions and per-cell values.
use crate::norm::NormType;
use crate::partition::CellPartition;
use ::proptest::collection::vec;
use ::proptest::prelude::*;
use nalgebra::DVector;

impl Arbitrary for NormType {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        prop::sample::select(NormType::ALL.to_vec()).boxed()
    }
}

/// Per-cell values with `num_cells` entries in the given range.
pub fn cell_values(num_cells: usize, range: std::ops::Range<f64>) -> impl Strategy<Value = DVector<f64>> {
    vec(range, num_cells).prop_map(DVector::from_vec)
}

/// A partition of `num_cells` cells among at most `max_ranks` ranks, seen from an arbitrary rank.
pub fn partition(num_cells: usize, max_ranks: usize) -> impl Strategy<Value = CellPartition> {
    assert!(max_ranks > 0);
    (1..=max_ranks)
        .prop_flat_map(move |num_ranks| (Just(num_ranks), 0..num_ranks, vec(0..num_ranks, num_cells)))
        .prop_map(|(num_ranks, rank, owners)| CellPartition::from_owners(rank, num_ranks, owners))
}

/// Per-cell values together with a partition of the same cells.
pub fn partitioned_cell_values(
    max_cells: usize,
    max_ranks: usize,
) -> impl Strategy<Value = (CellPartition, DVector<f64>)> {
    (0..=max_cells).prop_flat_map(move |num_cells| (partition(num_cells, max_ranks), cell_values(num_cells, -10.0..10.0)))
}
