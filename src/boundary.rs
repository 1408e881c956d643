//! Boundary values, boundary right-hand sides and projection onto the boundary.
use crate::allocators::DimAllocator;
use crate::assembly::add_local_to_global;
use crate::cg::{CgSettings, ConjugateGradient, JacobiPreconditioner, RelativeResidualCriterion};
use crate::connectivity::Connectivity;
use crate::constraints::AffineConstraints;
use crate::dofs::{ComponentMask, DofHandler};
use crate::element::ElementConnectivity;
use crate::error::{Error, Result};
use crate::face::{barycentric_face_rule, locally_owned_boundary_faces, BoundaryFace};
use crate::field::Field;
use crate::interpolate::{check_components, check_mask, MaterialFieldMap};
use crate::{Real, SmallDim};
use itertools::izip;
use log::debug;
use nalgebra::{DVector, DefaultAllocator};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use std::collections::{BTreeMap, BTreeSet};

/// Fields prescribed on the boundary, keyed by boundary id.
pub type BoundaryFieldMap<'a, T, D> = MaterialFieldMap<'a, T, D>;

/// Computes the nodal values of the boundary fields on the degrees of freedom of boundary
/// faces whose id is contained in `functions`.
///
/// Only faces of locally owned cells are considered, and only components selected by `mask`
/// are returned. Vertices shared by faces with different ids take the value of the face with
/// the largest id.
pub fn interpolate_boundary_values<T, D, C>(
    dofs: &DofHandler<T, D, C>,
    functions: &BoundaryFieldMap<T, D>,
    mask: &ComponentMask,
) -> Result<BTreeMap<usize, T>>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    let nc = dofs.num_components();
    check_mask(mask, nc)?;
    for f in functions.values() {
        check_components(nc, f.num_components())?;
    }

    let mesh = dofs.mesh();
    let partition = dofs.partition();
    let mut faces_by_id = BTreeMap::new();
    for (face, cell, _) in mesh.find_boundary_faces() {
        if partition.is_locally_owned(cell) {
            let boundary_id = mesh.boundary_id(&face);
            if functions.contains_key(&boundary_id) {
                faces_by_id
                    .entry(boundary_id)
                    .or_insert_with(Vec::new)
                    .push(face);
            }
        }
    }

    let mut boundary_values = BTreeMap::new();
    let mut value = vec![T::zero(); nc];
    for (boundary_id, faces) in faces_by_id {
        let f = functions[&boundary_id];
        for face in faces {
            for &v in face.vertex_indices() {
                f.populate_value(&mesh.vertices()[v], &mut value);
                for (c, &value_c) in value.iter().enumerate() {
                    if mask.is_selected(c) {
                        boundary_values.insert(dofs.dof_index(v, c), value_c);
                    }
                }
            }
        }
    }
    debug!("Interpolated {} boundary values", boundary_values.len());
    Ok(boundary_values)
}

/// Adds the boundary values as constraints `x_i = b_i`.
///
/// Degrees of freedom that are already constrained keep their existing constraint.
pub fn interpolate_boundary_values_into<T, D, C>(
    dofs: &DofHandler<T, D, C>,
    functions: &BoundaryFieldMap<T, D>,
    mask: &ComponentMask,
    constraints: &mut AffineConstraints<T>,
) -> Result<()>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    for (dof, value) in interpolate_boundary_values(dofs, functions, mask)? {
        if !constraints.is_constrained(dof) {
            constraints.add_line(dof);
            constraints.set_inhomogeneity(dof, value);
        }
    }
    Ok(())
}

/// Adds $\int_F f \cdot \varphi_a$ for every vertex `a` of the face to `local`, which holds
/// one entry per component for each face vertex.
fn integrate_on_face<T, D, F>(face: &BoundaryFace<T, D>, f: &F, rule: &(Vec<T>, Vec<Vec<T>>), local: &mut [T])
where
    T: Real,
    D: SmallDim,
    F: ?Sized + Field<T, D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    let nc = f.num_components();
    let mut f_value = vec![T::zero(); nc];
    let (weights, points) = rule;
    for (&w, lambda) in izip!(weights, points) {
        f.populate_value(&face.map_barycentric(lambda), &mut f_value);
        for (a, &lambda_a) in lambda.iter().enumerate() {
            for (c, &f_c) in f_value.iter().enumerate() {
                local[nc * a + c] += face.measure * w * lambda_a * f_c;
            }
        }
    }
}

/// Assembles the vector $b_i = \int_\Gamma f \cdot \varphi_i \, ds$ over the boundary faces of
/// locally owned cells whose id is in `boundary_ids`. An empty set selects the whole boundary.
///
/// Face integrals use a rule of the given polynomial strength.
pub fn create_boundary_right_hand_side<T, D, C, F>(
    dofs: &DofHandler<T, D, C>,
    f: &F,
    strength: usize,
    boundary_ids: &BTreeSet<usize>,
) -> Result<DVector<T>>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    F: ?Sized + Field<T, D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    let nc = dofs.num_components();
    check_components(nc, f.num_components())?;

    let faces = locally_owned_boundary_faces(dofs, |id| boundary_ids.is_empty() || boundary_ids.contains(&id))?;
    let rule = barycentric_face_rule::<T, D>(strength);
    let mut rhs = DVector::zeros(dofs.num_dofs());
    let mut local = Vec::new();
    let mut face_dofs = Vec::new();

    for face in &faces {
        local.clear();
        local.resize(nc * face.vertices.len(), T::zero());
        integrate_on_face(face, f, &rule, &mut local);

        face_dofs.clear();
        face_dofs.extend(
            face.vertices
                .iter()
                .flat_map(|&v| (0..nc).map(move |c| dofs.dof_index(v, c))),
        );
        add_local_to_global(&local, &mut rhs, &face_dofs);
    }
    debug!("Assembled boundary right-hand side on {} faces", faces.len());
    Ok(rhs)
}

/// Computes boundary values as the L2 projection of the boundary fields onto the traces of
/// the finite element functions on faces whose id is contained in `functions`.
///
/// Returns values for every component of the vertices on those faces. Face integrals use a
/// rule of the given polynomial strength. On a vertex shared by faces with different ids,
/// each face contributes its own field to the projection.
///
/// # Errors
///
/// Requires every cell to be locally owned, and returns [`Error::DistributedNotSupported`]
/// otherwise.
pub fn project_boundary_values<T, D, C>(
    dofs: &DofHandler<T, D, C>,
    functions: &BoundaryFieldMap<T, D>,
    strength: usize,
    settings: &CgSettings,
) -> Result<BTreeMap<usize, T>>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    if !dofs.partition().is_fully_local() {
        return Err(Error::DistributedNotSupported {
            operation: "project_boundary_values",
        });
    }
    let nc = dofs.num_components();
    for f in functions.values() {
        check_components(nc, f.num_components())?;
    }

    let faces = locally_owned_boundary_faces(dofs, |id| functions.contains_key(&id))?;
    let mut boundary_vertices: Vec<usize> = faces.iter().flat_map(|face| face.vertices.clone()).collect();
    boundary_vertices.sort_unstable();
    boundary_vertices.dedup();
    if boundary_vertices.is_empty() {
        return Ok(BTreeMap::new());
    }
    let local_index = |v: usize| {
        boundary_vertices
            .binary_search(&v)
            .expect("Face vertices are boundary vertices")
    };

    let n = nc * boundary_vertices.len();
    let rule = barycentric_face_rule::<T, D>(strength);
    let (weights, points) = &rule;
    let mut coo = CooMatrix::new(n, n);
    let mut rhs = DVector::zeros(n);
    let mut local = Vec::new();
    let mut face_dofs = Vec::new();

    for face in &faces {
        let face_vertices: Vec<usize> = face.vertices.iter().map(|&v| local_index(v)).collect();
        for (&w, lambda) in izip!(weights, points) {
            for (&a, &lambda_a) in izip!(&face_vertices, lambda) {
                for (&b, &lambda_b) in izip!(&face_vertices, lambda) {
                    for c in 0..nc {
                        coo.push(nc * a + c, nc * b + c, face.measure * w * lambda_a * lambda_b);
                    }
                }
            }
        }

        local.clear();
        local.resize(nc * face_vertices.len(), T::zero());
        integrate_on_face(face, functions[&face.boundary_id], &rule, &mut local);
        face_dofs.clear();
        face_dofs.extend(
            face_vertices
                .iter()
                .flat_map(|&a| (0..nc).map(move |c| nc * a + c)),
        );
        add_local_to_global(&local, &mut rhs, &face_dofs);
    }

    let mass = CsrMatrix::from(&coo);
    let mut solution = DVector::zeros(n);
    let output = ConjugateGradient::with_operator(&mass)
        .with_preconditioner(JacobiPreconditioner::from_csr(&mass))
        .with_stopping_criterion(RelativeResidualCriterion::new(nalgebra::convert::<f64, T>(settings.tolerance)))
        .with_max_iter(settings.max_iterations)
        .solve_with_guess(&rhs, &mut solution)?;
    debug!(
        "Projected boundary values onto {} degrees of freedom in {} CG iterations",
        n, output.num_iterations
    );

    Ok(boundary_vertices
        .iter()
        .enumerate()
        .flat_map(|(a, &v)| (0..nc).map(move |c| (dofs.dof_index(v, c), nc * a + c)))
        .map(|(dof, i)| (dof, solution[i]))
        .collect())
}
