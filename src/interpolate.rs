//! Nodal interpolation of fields onto finite element vectors.
use crate::allocators::DimAllocator;
use crate::dofs::{ComponentMask, DofHandler};
use crate::element::ElementConnectivity;
use crate::error::{Error, Result};
use crate::field::Field;
use crate::point::PointEvaluator;
use crate::{Real, SmallDim};
use log::debug;
use nalgebra::{DVector, DefaultAllocator};
use std::collections::BTreeMap;

/// Per-material fields, keyed by material id.
pub type MaterialFieldMap<'a, T, D> = BTreeMap<usize, &'a dyn Field<T, D>>;

pub(crate) fn check_vector_len<T, D, C>(dofs: &DofHandler<T, D, C>, u: &DVector<T>) -> Result<()>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    if u.len() != dofs.num_dofs() {
        return Err(Error::VectorLengthMismatch {
            expected: dofs.num_dofs(),
            actual: u.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_components(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::ComponentMismatch { expected, actual });
    }
    Ok(())
}

pub(crate) fn check_mask(mask: &ComponentMask, num_components: usize) -> Result<()> {
    match mask.size() {
        Some(size) => check_components(num_components, size),
        None => Ok(()),
    }
}

/// Interpolates on the vertices of locally owned cells, using the field returned for each
/// cell. Cells without a field are skipped.
fn interpolate_on_owned_cells<'f, T, D, C, F>(
    dofs: &DofHandler<T, D, C>,
    field_for_cell: impl Fn(usize) -> Option<&'f F>,
    u: &mut DVector<T>,
    mask: &ComponentMask,
) where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    F: ?Sized + Field<T, D> + 'f,
    DefaultAllocator: DimAllocator<T, D>,
{
    let mesh = dofs.mesh();
    let nc = dofs.num_components();
    let mut visited = vec![false; mesh.num_vertices()];
    let mut value = vec![T::zero(); nc];
    let mut num_interpolated = 0;

    for cell in dofs.partition().owned_cells() {
        let Some(field) = field_for_cell(cell) else { continue };
        for &v in mesh.connectivity()[cell].vertex_indices() {
            if visited[v] {
                continue;
            }
            visited[v] = true;
            field.populate_value(&mesh.vertices()[v], &mut value);
            for (c, &value_c) in value.iter().enumerate() {
                if mask.is_selected(c) {
                    u[dofs.dof_index(v, c)] = value_c;
                }
            }
            num_interpolated += 1;
        }
    }
    debug!("Interpolated {num_interpolated} vertices with {nc} components");
}

/// Interpolates `f` onto the degrees of freedom of locally owned cells.
///
/// Only components selected by `mask` are written; all other entries of `u` are left unchanged.
pub fn interpolate<T, D, C, F>(dofs: &DofHandler<T, D, C>, f: &F, u: &mut DVector<T>, mask: &ComponentMask) -> Result<()>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    F: ?Sized + Field<T, D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    check_vector_len(dofs, u)?;
    check_components(dofs.num_components(), f.num_components())?;
    check_mask(mask, dofs.num_components())?;
    interpolate_on_owned_cells(dofs, |_| Some(f), u, mask);
    Ok(())
}

/// Interpolates a different field on each material.
///
/// Cells whose material id is not in `functions` are skipped. At vertices shared by cells of
/// different materials the field of the cell visited first is used.
pub fn interpolate_based_on_material_id<T, D, C>(
    dofs: &DofHandler<T, D, C>,
    functions: &MaterialFieldMap<T, D>,
    u: &mut DVector<T>,
    mask: &ComponentMask,
) -> Result<()>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    check_vector_len(dofs, u)?;
    check_mask(mask, dofs.num_components())?;
    for f in functions.values() {
        check_components(dofs.num_components(), f.num_components())?;
    }
    let material_ids = dofs.mesh().material_ids();
    interpolate_on_owned_cells(dofs, |cell| functions.get(&material_ids[cell]).copied(), u, mask);
    Ok(())
}

/// Evaluates the finite element field `u_source` at the support points of `target_dofs`.
///
/// Every support point of a locally owned target cell must lie in a locally owned source cell.
///
/// # Errors
///
/// Returns [`Error::PointNotFound`] if a support point lies outside the source mesh, and
/// [`Error::PointNotAvailableHere`] if it lies in a source cell owned by another process.
pub fn interpolate_to_different_mesh<T, D, C1, C2>(
    source_dofs: &DofHandler<T, D, C1>,
    u_source: &DVector<T>,
    target_dofs: &DofHandler<T, D, C2>,
    u_target: &mut DVector<T>,
) -> Result<()>
where
    T: Real,
    D: SmallDim,
    C1: ElementConnectivity<T, ReferenceDim = D>,
    C2: ElementConnectivity<T, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    check_vector_len(source_dofs, u_source)?;
    check_vector_len(target_dofs, u_target)?;
    check_components(target_dofs.num_components(), source_dofs.num_components())?;

    let evaluator = PointEvaluator::new(source_dofs);
    let vertices = target_dofs.mesh().vertices();
    for v in target_dofs.locally_relevant_vertices() {
        let value = evaluator.value(u_source, &vertices[v])?;
        for (c, &value_c) in value.iter().enumerate() {
            u_target[target_dofs.dof_index(v, c)] = value_c;
        }
    }
    Ok(())
}

/// Interpolates the identity map `x -> x` onto the first `dim` components.
///
/// Components beyond the spatial dimension are left unchanged.
pub fn get_position_vector<T, D, C>(dofs: &DofHandler<T, D, C>, u: &mut DVector<T>) -> Result<()>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    let nc = dofs.num_components();
    if nc < D::dim() {
        return Err(Error::NotEnoughComponents {
            required: D::dim(),
            num_components: nc,
        });
    }
    check_vector_len(dofs, u)?;

    let vertices = dofs.mesh().vertices();
    for v in dofs.locally_relevant_vertices() {
        for i in 0..D::dim() {
            u[dofs.dof_index(v, i)] = vertices[v][i];
        }
    }
    Ok(())
}
