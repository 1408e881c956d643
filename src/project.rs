//! Mass matrices, right-hand sides and L2 projection.
use crate::allocators::DimAllocator;
use crate::assembly::add_local_to_global;
use crate::cg::{CgSettings, ConjugateGradient, JacobiPreconditioner, LinearOperator, RelativeResidualCriterion};
use crate::constraints::AffineConstraints;
use crate::dofs::DofHandler;
use crate::element::{ElementConnectivity, FiniteElement, ReferenceFiniteElement};
use crate::error::{Error, Result};
use crate::field::Field;
use crate::interpolate::check_components;
use crate::point::PointEvaluator;
use crate::quadrature::Quadrature;
use crate::{Real, SmallDim};
use itertools::izip;
use log::debug;
use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut, DefaultAllocator, OPoint};
use nalgebra_sparse::ops::serial::spmm_csr_dense;
use nalgebra_sparse::ops::Op;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use serde::{Deserialize, Serialize};

/// Settings for [`project`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionSettings {
    /// Constrain every degree of freedom on the boundary to zero, in addition to the given
    /// constraints.
    pub enforce_zero_boundary: bool,
    pub cg: CgSettings,
}

fn jacobian_determinant<T, Element>(element: &Element, xi: &OPoint<T, Element::ReferenceDim>, cell: usize) -> Result<T>
where
    T: Real,
    Element: FiniteElement<T>,
    DefaultAllocator: DimAllocator<T, Element::ReferenceDim>,
{
    let j_det = element.reference_jacobian(xi).determinant();
    if j_det == T::zero() || !j_det.is_finite() {
        return Err(Error::DegenerateCell { cell });
    }
    Ok(j_det.abs())
}

/// Assembles the mass matrix $M_{ij} = \int \varphi_i \cdot \varphi_j$ on locally owned cells.
///
/// Basis functions of different components are orthogonal, so the matrix couples only degrees
/// of freedom of the same component.
pub fn create_mass_matrix<T, D, C>(dofs: &DofHandler<T, D, C>, quadrature: &impl Quadrature<T, D>) -> Result<CsrMatrix<T>>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    let mesh = dofs.mesh();
    let nc = dofs.num_components();
    let mut coo = CooMatrix::new(dofs.num_dofs(), dofs.num_dofs());
    let mut basis = Vec::new();
    let mut local = DMatrix::zeros(0, 0);

    for cell in dofs.partition().owned_cells() {
        let element = mesh.cell_element(cell).ok_or(Error::DegenerateCell { cell })?;
        let n = element.num_nodes();
        basis.resize(n, T::zero());
        local.resize_mut(n, n, T::zero());
        local.fill(T::zero());

        for (&w, xi) in izip!(quadrature.weights(), quadrature.points()) {
            element.populate_basis(&mut basis, xi);
            let j_det = jacobian_determinant(&element, xi, cell)?;
            for (a, &phi_a) in basis.iter().enumerate() {
                for (b, &phi_b) in basis.iter().enumerate() {
                    local[(a, b)] += w * j_det * phi_a * phi_b;
                }
            }
        }

        let vertices = mesh.connectivity()[cell].vertex_indices();
        for (a, &v_a) in vertices.iter().enumerate() {
            for (b, &v_b) in vertices.iter().enumerate() {
                for c in 0..nc {
                    coo.push(dofs.dof_index(v_a, c), dofs.dof_index(v_b, c), local[(a, b)]);
                }
            }
        }
    }

    Ok(CsrMatrix::from(&coo))
}

/// Assembles the vector $b_i = \int f \cdot \varphi_i$ on locally owned cells.
pub fn create_right_hand_side<T, D, C, F>(
    dofs: &DofHandler<T, D, C>,
    f: &F,
    quadrature: &impl Quadrature<T, D>,
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

    let mesh = dofs.mesh();
    let mut rhs = DVector::zeros(dofs.num_dofs());
    let mut basis = Vec::new();
    let mut f_value = vec![T::zero(); nc];
    let mut cell_dofs = Vec::new();
    let mut local = Vec::new();

    for cell in dofs.partition().owned_cells() {
        let element = mesh.cell_element(cell).ok_or(Error::DegenerateCell { cell })?;
        let n = element.num_nodes();
        basis.resize(n, T::zero());
        local.clear();
        local.resize(n * nc, T::zero());

        for (&w, xi) in izip!(quadrature.weights(), quadrature.points()) {
            element.populate_basis(&mut basis, xi);
            let j_det = jacobian_determinant(&element, xi, cell)?;
            let x = element.map_reference_coords(xi);
            f.populate_value(&x, &mut f_value);
            for (a, &phi_a) in basis.iter().enumerate() {
                for (c, &f_c) in f_value.iter().enumerate() {
                    local[nc * a + c] += w * j_det * f_c * phi_a;
                }
            }
        }

        dofs.populate_cell_dofs(cell, &mut cell_dofs);
        add_local_to_global(&local, &mut rhs, &cell_dofs);
    }

    Ok(rhs)
}

/// The vector $b_i = \varphi_i(x_0) \cdot w$ of a point source with weights `w` (one per
/// component) located at `point`.
///
/// # Errors
///
/// Returns [`Error::PointNotAvailableHere`] if the point lies in a cell that is not owned by
/// this process.
pub fn create_point_source_vector<T, D, C>(
    dofs: &DofHandler<T, D, C>,
    point: &OPoint<T, D>,
    weights: &DVector<T>,
) -> Result<DVector<T>>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    let nc = dofs.num_components();
    check_components(nc, weights.len())?;

    let (cell, xi) = PointEvaluator::new(dofs).locate(point)?;
    let element = dofs
        .mesh()
        .cell_element(cell)
        .ok_or(Error::DegenerateCell { cell })?;
    let mut basis = vec![T::zero(); element.num_nodes()];
    element.populate_basis(&mut basis, &xi);

    let mut rhs = DVector::zeros(dofs.num_dofs());
    let vertices = dofs.mesh().connectivity()[cell].vertex_indices();
    for (&v, &phi) in izip!(vertices, &basis) {
        for c in 0..nc {
            rhs[dofs.dof_index(v, c)] = phi * weights[c];
        }
    }
    Ok(rhs)
}

/// The operator `P^T M P` on unconstrained degrees of freedom and the identity on
/// constrained ones.
struct ConstrainedOperator<'a, T: Real> {
    matrix: &'a CsrMatrix<T>,
    constraints: &'a AffineConstraints<T>,
}

impl<'a, T: Real> LinearOperator<T> for ConstrainedOperator<'a, T> {
    fn apply(
        &self,
        mut y: DVectorViewMut<T>,
        x: DVectorView<T>,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut px = x.clone_owned();
        self.constraints.distribute_homogeneous(&mut px);
        let mut mpx = DVector::zeros(px.len());
        spmm_csr_dense(T::zero(), &mut mpx, T::one(), Op::NoOp(self.matrix), Op::NoOp(&px));
        self.constraints.condense(&mut mpx);
        for line in self.constraints.lines() {
            mpx[line.index] = x[line.index];
        }
        y.copy_from(&mpx);
        Ok(())
    }
}

/// Computes the L2 projection of `f` onto the finite element space subject to the given
/// constraints.
///
/// Writing the solution as `x = P y + g`, the system `P^T M P y = P^T (b - M g)` is solved with
/// the Jacobi-preconditioned conjugate gradient method.
///
/// # Errors
///
/// Projection requires every cell to be locally owned, and returns
/// [`Error::DistributedNotSupported`] otherwise.
pub fn project<T, D, C, F>(
    dofs: &DofHandler<T, D, C>,
    constraints: &AffineConstraints<T>,
    quadrature: &impl Quadrature<T, D>,
    f: &F,
    settings: &ProjectionSettings,
) -> Result<DVector<T>>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    F: ?Sized + Field<T, D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    if !dofs.partition().is_fully_local() {
        return Err(Error::DistributedNotSupported { operation: "project" });
    }
    check_components(dofs.num_components(), f.num_components())?;

    let mut constraints = constraints.clone();
    if settings.enforce_zero_boundary {
        for v in dofs.mesh().find_boundary_vertices() {
            for c in 0..dofs.num_components() {
                let dof = dofs.dof_index(v, c);
                if !constraints.is_constrained(dof) {
                    constraints.add_line(dof);
                }
            }
        }
    }
    constraints.close()?;

    let mass = create_mass_matrix(dofs, quadrature)?;
    let mut rhs = create_right_hand_side(dofs, f, quadrature)?;
    let g = constraints.inhomogeneity_vector(dofs.num_dofs());
    let n = g.len();
    // b - M g
    spmm_csr_dense(T::one(), &mut rhs, -T::one(), Op::NoOp(&mass), Op::NoOp(&g));
    constraints.condense(&mut rhs);

    let operator = ConstrainedOperator {
        matrix: &mass,
        constraints: &constraints,
    };
    let mut solution = DVector::zeros(n);
    let output = ConjugateGradient::with_operator(operator)
        .with_preconditioner(JacobiPreconditioner::from_csr(&mass))
        .with_stopping_criterion(RelativeResidualCriterion::new(nalgebra::convert::<f64, T>(settings.cg.tolerance)))
        .with_max_iter(settings.cg.max_iterations)
        .solve_with_guess(&rhs, &mut solution)?;
    constraints.distribute(&mut solution);

    debug!(
        "Projected field onto {} degrees of freedom ({} constrained) in {} CG iterations",
        n,
        constraints.num_constraints(),
        output.num_iterations
    );
    Ok(solution)
}
