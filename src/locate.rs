//! Spatial acceleration for finding the cells that contain a point.
use crate::allocators::DimAllocator;
use crate::connectivity::Connectivity;
use crate::mesh::Mesh;
use crate::{Real, SmallDim};
use nalgebra::{DefaultAllocator, OPoint};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::RTree;

type CellBox = GeomWithData<Rectangle<[f64; 3]>, usize>;

fn to_f64<T: Real>(x: T) -> f64 {
    nalgebra::try_convert(x).expect("Scalar must be representable as f64")
}

/// Pads the coordinates of a point of dimension at most 3 with zeros.
fn padded_coords<T, D>(x: &OPoint<T, D>) -> [f64; 3]
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    assert!(D::dim() <= 3, "Only dimensions up to 3 are supported.");
    let mut coords = [0.0; 3];
    for (i, coord) in coords.iter_mut().enumerate().take(D::dim()) {
        *coord = to_f64(x[i]);
    }
    coords
}

/// An R-tree over the bounding boxes of the cells of a mesh.
///
/// Bounding boxes are slightly enlarged, so that the candidates returned for a point include
/// every cell that contains it up to round-off.
#[derive(Debug, Clone)]
pub struct CellLocator {
    tree: RTree<CellBox>,
}

impl CellLocator {
    pub fn new<T, D, C>(mesh: &Mesh<T, D, C>) -> Self
    where
        T: Real,
        D: SmallDim,
        C: Connectivity,
        DefaultAllocator: DimAllocator<T, D>,
    {
        let vertices = mesh.vertices();
        let boxes = mesh
            .connectivity()
            .iter()
            .enumerate()
            .filter(|(_, conn)| !conn.vertex_indices().is_empty())
            .map(|(cell, conn)| {
                let mut min = [f64::INFINITY; 3];
                let mut max = [f64::NEG_INFINITY; 3];
                for &v in conn.vertex_indices() {
                    let coords = padded_coords(&vertices[v]);
                    for i in 0..3 {
                        min[i] = min[i].min(coords[i]);
                        max[i] = max[i].max(coords[i]);
                    }
                }
                // Enlarge the box to accommodate floating point errors
                let extent = (0..3).map(|i| max[i] - min[i]).fold(0.0, f64::max);
                let margin = 0.01 * extent + 1e-12;
                for i in 0..3 {
                    min[i] -= margin;
                    max[i] += margin;
                }
                GeomWithData::new(Rectangle::from_corners(min, max), cell)
            })
            .collect();

        Self {
            tree: RTree::bulk_load(boxes),
        }
    }

    /// Returns the sorted indices of the cells whose bounding box contains the point.
    pub fn candidate_cells<T, D>(&self, x: &OPoint<T, D>) -> Vec<usize>
    where
        T: Real,
        D: SmallDim,
        DefaultAllocator: DimAllocator<T, D>,
    {
        let mut cells: Vec<usize> = self
            .tree
            .locate_all_at_point(&padded_coords(x))
            .map(|cell_box| cell_box.data)
            .collect();
        cells.sort_unstable();
        cells
    }

    pub fn num_cells(&self) -> usize {
        self.tree.size()
    }
}
