//! Constraints on the normal or tangential components of a vector field on the boundary.
//!
//! The vector field occupies the components `first_vector_component..first_vector_component + D`.
//! At each boundary vertex, the constrained directions are determined from the outward normals
//! of the adjacent boundary faces:
//!
//! - normals computed on different cells are averaged, so a polygonal approximation of a
//!   smooth boundary gives a single normal direction;
//! - a cell that has `D` or more distinct normals at the vertex marks a corner, where the
//!   whole vector is constrained;
//! - in 3D, a cell with two distinct normals at the vertex marks an edge. The edge direction
//!   is averaged over such cells and the two directions orthogonal to it are constrained.
//!   Cells with a single normal at the vertex are ignored in that case.
//!
//! Each constraint `a · u = a · g` is turned into constraint lines by solving for the components
//! of `u` that give the best conditioned system. Components that are already constrained are
//! never chosen, and vertices where no suitable choice exists are skipped.
use crate::allocators::DimAllocator;
use crate::boundary::BoundaryFieldMap;
use crate::constraints::AffineConstraints;
use crate::dofs::DofHandler;
use crate::element::ElementConnectivity;
use crate::error::{Error, Result};
use crate::face::{generalized_cross, locally_owned_boundary_faces};
use crate::interpolate::check_components;
use crate::{Real, SmallDim};
use itertools::Itertools;
use log::debug;
use nalgebra::{DMatrix, DVector, DefaultAllocator, OVector};
use numeric_literals::replace_float_literals;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flux {
    Normal,
    Tangential,
}

/// The boundary normals collected at a single vertex.
struct VertexNormals<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    /// The largest id of the adjacent faces, which selects the prescribed field.
    boundary_id: usize,
    normals_by_cell: BTreeMap<usize, Vec<OVector<T, D>>>,
}

enum Directions<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    All,
    Along(Vec<OVector<T, D>>),
}

/// Computes constraints for $u \cdot n = g \cdot n$ on boundary faces of locally owned cells
/// whose id is in `boundary_ids`.
///
/// The field `g` for a face is `functions[id]`, which must have `D` components. Boundary ids
/// without a field are treated as `g = 0`. Existing constraints are left unchanged.
///
/// # Errors
///
/// Returns [`Error::NotEnoughComponents`] if the vector field does not fit into the components
/// of `dofs`.
pub fn compute_nonzero_normal_flux_constraints<T, D, C>(
    dofs: &DofHandler<T, D, C>,
    first_vector_component: usize,
    boundary_ids: &BTreeSet<usize>,
    functions: &BoundaryFieldMap<T, D>,
    constraints: &mut AffineConstraints<T>,
) -> Result<()>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    compute_flux_constraints(dofs, first_vector_component, boundary_ids, functions, Flux::Normal, constraints)
}

/// Computes constraints for $u \cdot n = 0$.
///
/// See [`compute_nonzero_normal_flux_constraints`].
pub fn compute_no_normal_flux_constraints<T, D, C>(
    dofs: &DofHandler<T, D, C>,
    first_vector_component: usize,
    boundary_ids: &BTreeSet<usize>,
    constraints: &mut AffineConstraints<T>,
) -> Result<()>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    compute_flux_constraints(
        dofs,
        first_vector_component,
        boundary_ids,
        &BTreeMap::new(),
        Flux::Normal,
        constraints,
    )
}

/// Computes constraints for $u \times n = g \times n$, constraining exactly the directions that
/// [`compute_nonzero_normal_flux_constraints`] leaves free.
///
/// At corners the whole vector is constrained, except in 1D where the boundary has no
/// tangential directions.
pub fn compute_nonzero_tangential_flux_constraints<T, D, C>(
    dofs: &DofHandler<T, D, C>,
    first_vector_component: usize,
    boundary_ids: &BTreeSet<usize>,
    functions: &BoundaryFieldMap<T, D>,
    constraints: &mut AffineConstraints<T>,
) -> Result<()>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    compute_flux_constraints(
        dofs,
        first_vector_component,
        boundary_ids,
        functions,
        Flux::Tangential,
        constraints,
    )
}

/// Computes constraints for $u \times n = 0$.
pub fn compute_normal_flux_constraints<T, D, C>(
    dofs: &DofHandler<T, D, C>,
    first_vector_component: usize,
    boundary_ids: &BTreeSet<usize>,
    constraints: &mut AffineConstraints<T>,
) -> Result<()>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    compute_flux_constraints(
        dofs,
        first_vector_component,
        boundary_ids,
        &BTreeMap::new(),
        Flux::Tangential,
        constraints,
    )
}

#[replace_float_literals(T::from_f64(literal).unwrap())]
fn compute_flux_constraints<T, D, C>(
    dofs: &DofHandler<T, D, C>,
    first_vector_component: usize,
    boundary_ids: &BTreeSet<usize>,
    functions: &BoundaryFieldMap<T, D>,
    flux: Flux,
    constraints: &mut AffineConstraints<T>,
) -> Result<()>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    let d = D::dim();
    let nc = dofs.num_components();
    if first_vector_component + d > nc {
        return Err(Error::NotEnoughComponents {
            required: first_vector_component + d,
            num_components: nc,
        });
    }
    for (id, f) in functions {
        if boundary_ids.contains(id) {
            check_components(d, f.num_components())?;
        }
    }

    let faces = locally_owned_boundary_faces(dofs, |id| boundary_ids.contains(&id))?;
    let mut vertex_normals = BTreeMap::new();
    for face in &faces {
        for &v in &face.vertices {
            let entry = vertex_normals.entry(v).or_insert_with(|| VertexNormals {
                boundary_id: face.boundary_id,
                normals_by_cell: BTreeMap::new(),
            });
            entry.boundary_id = entry.boundary_id.max(face.boundary_id);
            let normals = entry.normals_by_cell.entry(face.cell).or_insert_with(Vec::new);
            if !normals.iter().any(|n| n.dot(&face.normal) > 1.0 - 1e-10) {
                normals.push(face.normal.clone());
            }
        }
    }

    let mut values = vec![T::zero(); d];
    let mut num_constrained = 0;
    for (v, vertex) in vertex_normals {
        values.fill(T::zero());
        if let Some(f) = functions.get(&vertex.boundary_id) {
            f.populate_value(&dofs.mesh().vertices()[v], &mut values);
        }
        let target = OVector::<T, D>::from_column_slice(&values);
        let component_dofs: Vec<usize> = (0..d)
            .map(|i| dofs.dof_index(v, first_vector_component + i))
            .collect();

        let directions = match (normal_directions(&vertex.normals_by_cell), flux) {
            (Directions::All, Flux::Tangential) if d == 1 => continue,
            (Directions::All, _) => Directions::All,
            (Directions::Along(normal), Flux::Normal) => Directions::Along(normal),
            (Directions::Along(normal), Flux::Tangential) => Directions::Along(orthogonal_complement(&normal)),
        };
        num_constrained += match directions {
            Directions::All => constrain_components(&component_dofs, &target, constraints),
            Directions::Along(directions) => constrain_directions(&component_dofs, &directions, &target, constraints),
        };
    }
    debug!("Added {num_constrained} {flux:?} flux constraints on {} boundary faces", faces.len());
    Ok(())
}

/// The directions in which the vector is constrained by a normal flux condition.
#[replace_float_literals(T::from_f64(literal).unwrap())]
fn normal_directions<T, D>(normals_by_cell: &BTreeMap<usize, Vec<OVector<T, D>>>) -> Directions<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    let d = D::dim();
    let max_normals = normals_by_cell.values().map(Vec::len).max().unwrap_or(0);
    if max_normals >= d {
        Directions::All
    } else if max_normals == 1 {
        let sum = normals_by_cell
            .values()
            .fold(OVector::<T, D>::zeros(), |sum, normals| sum + &normals[0]);
        match sum.try_normalize(1e-10) {
            Some(normal) => Directions::Along(vec![normal]),
            // Opposite normals from different cells
            None => Directions::All,
        }
    } else if max_normals + 1 == d {
        let mut tangent_sum = OVector::<T, D>::zeros();
        for normals in normals_by_cell.values().filter(|normals| normals.len() == max_normals) {
            let tangent = generalized_cross(normals);
            if tangent.dot(&tangent_sum) < T::zero() {
                tangent_sum -= tangent;
            } else {
                tangent_sum += tangent;
            }
        }
        match tangent_sum.try_normalize(1e-10) {
            Some(tangent) => Directions::Along(orthogonal_complement(&[tangent])),
            None => Directions::All,
        }
    } else {
        Directions::All
    }
}

/// An orthonormal basis for the complement of the span of the given orthonormal vectors.
///
/// Coordinate axes are orthogonalized in order of increasing overlap with the given vectors.
fn orthogonal_complement<T, D>(vectors: &[OVector<T, D>]) -> Vec<OVector<T, D>>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    let d = D::dim();
    let overlap = |i: usize| vectors.iter().map(|v| v[i] * v[i]).fold(T::zero(), |a, b| a + b);
    let mut axes: Vec<usize> = (0..d).collect();
    axes.sort_by(|&i, &j| overlap(i).partial_cmp(&overlap(j)).unwrap_or(Ordering::Equal));

    let mut basis = vectors.to_vec();
    for &i in axes.iter().take(d - vectors.len()) {
        let mut e = OVector::<T, D>::zeros();
        e[i] = T::one();
        for b in &basis {
            let projection = b.dot(&e);
            e -= b * projection;
        }
        basis.push(e.normalize());
    }
    basis.split_off(vectors.len())
}

/// Constrains each unconstrained component to the target value.
fn constrain_components<T, D>(
    component_dofs: &[usize],
    target: &OVector<T, D>,
    constraints: &mut AffineConstraints<T>,
) -> usize
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    let mut num_constrained = 0;
    for (i, &dof) in component_dofs.iter().enumerate() {
        if !constraints.is_constrained(dof) {
            constraints.add_line(dof);
            constraints.set_inhomogeneity(dof, target[i]);
            num_constrained += 1;
        }
    }
    num_constrained
}

/// Adds constraint lines for `a · u = a · target` for each direction `a`.
///
/// Returns the number of added lines, which is zero if the vertex was skipped.
#[replace_float_literals(T::from_f64(literal).unwrap())]
fn constrain_directions<T, D>(
    component_dofs: &[usize],
    directions: &[OVector<T, D>],
    target: &OVector<T, D>,
    constraints: &mut AffineConstraints<T>,
) -> usize
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    let d = D::dim();
    let m = directions.len();
    let a = DMatrix::from_fn(m, d, |r, i| directions[r][i]);
    let b = DVector::from_fn(m, |r, _| directions[r].dot(target));

    let free = (0..d).filter(|&i| !constraints.is_constrained(component_dofs[i]));
    let best = free
        .combinations(m)
        .map(|pivots| (a.select_columns(&pivots).determinant().abs(), pivots))
        .max_by(|(det1, _), (det2, _)| det1.partial_cmp(det2).unwrap_or(Ordering::Equal));
    let Some((det, pivots)) = best else {
        debug!("Skipping flux constraint on already constrained dofs {component_dofs:?}");
        return 0;
    };
    if det < 1e-10 {
        debug!("Skipping degenerate flux constraint on dofs {component_dofs:?}");
        return 0;
    }
    let Some(a_pivots_inv) = a.select_columns(&pivots).try_inverse() else {
        return 0;
    };
    let rest: Vec<usize> = (0..d).filter(|i| !pivots.contains(i)).collect();
    let coefficients = -(&a_pivots_inv * a.select_columns(&rest));
    let inhomogeneities = &a_pivots_inv * b;

    for (p, &k) in pivots.iter().enumerate() {
        let row = component_dofs[k];
        constraints.add_line(row);
        for (r, &i) in rest.iter().enumerate() {
            let coefficient = coefficients[(p, r)];
            if coefficient.abs() > 1e-14 {
                constraints.add_entry(row, component_dofs[i], coefficient);
            }
        }
        constraints.set_inhomogeneity(row, inhomogeneities[p]);
    }
    m
}
