//! Numbering of degrees of freedom for vertex-based Lagrange fields.
use crate::connectivity::Connectivity;
use crate::mesh::Mesh;
use crate::partition::CellPartition;
use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName, OPoint, Scalar};
use serde::{Deserialize, Serialize};

/// Selects a subset of the components of a field.
///
/// An empty mask selects all components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentMask {
    mask: Vec<bool>,
}

impl ComponentMask {
    /// A mask that selects every component.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn from_mask(mask: Vec<bool>) -> Self {
        Self { mask }
    }

    /// A mask of `num_components` entries that selects only the given components.
    pub fn from_components(num_components: usize, components: &[usize]) -> Self {
        let mut mask = vec![false; num_components];
        for &c in components {
            mask[c] = true;
        }
        Self { mask }
    }

    pub fn is_selected(&self, component: usize) -> bool {
        self.mask.is_empty() || self.mask.get(component).copied().unwrap_or(false)
    }

    /// Whether the mask selects every component of a field with `num_components` components.
    pub fn selects_all(&self, num_components: usize) -> bool {
        (0..num_components).all(|c| self.is_selected(c))
    }

    /// The number of entries of the mask, or `None` if it selects all components.
    pub fn size(&self) -> Option<usize> {
        (!self.mask.is_empty()).then_some(self.mask.len())
    }
}

/// Degrees of freedom of a continuous, piecewise linear field with `num_components` components.
///
/// Every mesh vertex carries one degree of freedom per component, numbered interleaved:
/// the degree of freedom of component `c` at vertex `v` is `num_components * v + c`.
#[derive(Debug, Clone)]
pub struct DofHandler<'a, T, D, C>
where
    T: Scalar,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    mesh: &'a Mesh<T, D, C>,
    partition: CellPartition,
    num_components: usize,
}

impl<'a, T, D, C> DofHandler<'a, T, D, C>
where
    T: Scalar,
    D: DimName,
    C: Connectivity,
    DefaultAllocator: Allocator<T, D>,
{
    /// Degrees of freedom on a mesh where all cells are locally owned.
    pub fn new(mesh: &'a Mesh<T, D, C>, num_components: usize) -> Self {
        Self::with_partition(mesh, num_components, CellPartition::serial(mesh.num_cells()))
    }

    /// # Panics
    ///
    /// Panics if the partition does not have exactly one entry per cell of the mesh, or if
    /// `num_components` is zero.
    pub fn with_partition(mesh: &'a Mesh<T, D, C>, num_components: usize, partition: CellPartition) -> Self {
        assert_eq!(
            partition.num_cells(),
            mesh.num_cells(),
            "Partition must have one entry per cell."
        );
        assert!(num_components > 0, "Need at least one component.");
        Self {
            mesh,
            partition,
            num_components,
        }
    }

    pub fn mesh(&self) -> &'a Mesh<T, D, C> {
        self.mesh
    }

    pub fn partition(&self) -> &CellPartition {
        &self.partition
    }

    pub fn num_components(&self) -> usize {
        self.num_components
    }

    pub fn num_cells(&self) -> usize {
        self.mesh.num_cells()
    }

    pub fn num_dofs(&self) -> usize {
        self.num_components * self.mesh.num_vertices()
    }

    pub fn dof_index(&self, vertex: usize, component: usize) -> usize {
        debug_assert!(component < self.num_components);
        self.num_components * vertex + component
    }

    /// The vertex and component associated with a degree of freedom.
    pub fn dof_vertex_and_component(&self, dof: usize) -> (usize, usize) {
        (dof / self.num_components, dof % self.num_components)
    }

    /// The point at which the basis function of the degree of freedom is one.
    pub fn support_point(&self, dof: usize) -> &OPoint<T, D> {
        &self.mesh.vertices()[dof / self.num_components]
    }

    /// Writes the global indices of the degrees of freedom of the cell into `dofs`,
    /// node by node with all components of each node consecutive.
    pub fn populate_cell_dofs(&self, cell: usize, dofs: &mut Vec<usize>) {
        dofs.clear();
        let nc = self.num_components;
        for &v in self.mesh.connectivity()[cell].vertex_indices() {
            dofs.extend((0..nc).map(|c| nc * v + c));
        }
    }

    pub fn cell_dofs(&self, cell: usize) -> Vec<usize> {
        let mut dofs = Vec::new();
        self.populate_cell_dofs(cell, &mut dofs);
        dofs
    }

    /// Vertices that belong to at least one locally owned cell, sorted.
    pub fn locally_relevant_vertices(&self) -> Vec<usize> {
        let connectivity = self.mesh.connectivity();
        let mut vertices: Vec<usize> = self
            .partition
            .owned_cells()
            .flat_map(|cell| connectivity[cell].vertex_indices().iter().copied())
            .collect();
        vertices.sort_unstable();
        vertices.dedup();
        vertices
    }
}
