//! Affine constraints on degrees of freedom.
//!
//! A constraint line expresses a degree of freedom as an affine combination of other degrees
//! of freedom, $x_i = \sum_j a_{ij} x_j + b_i$. Boundary values are constraints without
//! entries, i.e. $x_i = b_i$.
//!
//! Writing the full vector as $x = P y + g$, where $y$ holds the unconstrained degrees of
//! freedom and $g$ the inhomogeneities, [`AffineConstraints::distribute`] computes $x$ and
//! [`AffineConstraints::condense`] applies $P^T$.
use crate::error::{Error, Result};
use crate::Real;
use log::debug;
use nalgebra::DVector;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintLine<T> {
    pub index: usize,
    pub entries: Vec<(usize, T)>,
    pub inhomogeneity: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AffineConstraints<T> {
    lines: BTreeMap<usize, ConstraintLine<T>>,
    closed: bool,
}

impl<T: Real> Default for AffineConstraints<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Real> AffineConstraints<T> {
    pub fn new() -> Self {
        Self {
            lines: BTreeMap::new(),
            closed: false,
        }
    }

    /// Constrains the degree of freedom to zero. Entries and an inhomogeneity can be added
    /// afterwards. Does nothing if the degree of freedom is already constrained.
    pub fn add_line(&mut self, index: usize) {
        self.closed = false;
        self.lines.entry(index).or_insert_with(|| ConstraintLine {
            index,
            entries: Vec::new(),
            inhomogeneity: T::zero(),
        });
    }

    /// Adds the term `coefficient * x_column` to the constraint of `x_row`.
    ///
    /// # Panics
    ///
    /// Panics if `row` has no constraint line or if `row == column`.
    pub fn add_entry(&mut self, row: usize, column: usize, coefficient: T) {
        assert_ne!(row, column, "A degree of freedom cannot be constrained to itself.");
        self.closed = false;
        let line = self
            .lines
            .get_mut(&row)
            .expect("Must add a line before adding entries to it.");
        match line.entries.iter_mut().find(|(j, _)| *j == column) {
            Some((_, a)) => *a += coefficient,
            None => line.entries.push((column, coefficient)),
        }
    }

    /// # Panics
    ///
    /// Panics if `index` has no constraint line.
    pub fn set_inhomogeneity(&mut self, index: usize, value: T) {
        self.closed = false;
        self.lines
            .get_mut(&index)
            .expect("Must add a line before setting its inhomogeneity.")
            .inhomogeneity = value;
    }

    pub fn is_constrained(&self, index: usize) -> bool {
        self.lines.contains_key(&index)
    }

    pub fn is_inhomogeneously_constrained(&self, index: usize) -> bool {
        self.lines
            .get(&index)
            .map(|line| line.inhomogeneity != T::zero())
            .unwrap_or(false)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn num_constraints(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, index: usize) -> Option<&ConstraintLine<T>> {
        self.lines.get(&index)
    }

    /// Constraint lines ordered by the index of the constrained degree of freedom.
    pub fn lines(&self) -> impl Iterator<Item = &ConstraintLine<T>> {
        self.lines.values()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.closed = false;
    }

    /// Resolves chains of constraints so that every entry refers to an unconstrained degree
    /// of freedom.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CyclicConstraints`] if a constraint depends on itself, in which case
    /// the constraints are left unchanged.
    pub fn close(&mut self) -> Result<()> {
        let mut resolved = BTreeMap::new();
        let mut visiting = BTreeSet::new();
        for &index in self.lines.keys() {
            self.resolve_line(index, &mut resolved, &mut visiting)?;
        }
        debug!("Closed {} constraint lines", resolved.len());
        self.lines = resolved;
        self.closed = true;
        Ok(())
    }

    fn resolve_line(
        &self,
        index: usize,
        resolved: &mut BTreeMap<usize, ConstraintLine<T>>,
        visiting: &mut BTreeSet<usize>,
    ) -> Result<()> {
        if resolved.contains_key(&index) {
            return Ok(());
        }
        if !visiting.insert(index) {
            return Err(Error::CyclicConstraints { dof: index });
        }

        let line = &self.lines[&index];
        let mut entries = BTreeMap::new();
        let mut inhomogeneity = line.inhomogeneity;
        for &(j, a_ij) in &line.entries {
            if self.lines.contains_key(&j) {
                self.resolve_line(j, resolved, visiting)?;
                let other = &resolved[&j];
                for &(k, a_jk) in &other.entries {
                    *entries.entry(k).or_insert_with(T::zero) += a_ij * a_jk;
                }
                inhomogeneity += a_ij * other.inhomogeneity;
            } else {
                *entries.entry(j).or_insert_with(T::zero) += a_ij;
            }
        }

        visiting.remove(&index);
        resolved.insert(
            index,
            ConstraintLine {
                index,
                entries: entries.into_iter().filter(|&(_, a)| a != T::zero()).collect(),
                inhomogeneity,
            },
        );
        Ok(())
    }

    /// Sets every constrained entry to the value prescribed by its constraint.
    ///
    /// # Panics
    ///
    /// Panics if the constraints have not been closed.
    pub fn distribute(&self, u: &mut DVector<T>) {
        assert!(self.closed, "Constraints must be closed before distributing.");
        for line in self.lines.values() {
            u[line.index] = line.inhomogeneity + Self::combination(&line.entries, u);
        }
    }

    /// Like [`distribute`](Self::distribute), but ignoring the inhomogeneities (applies `P`).
    pub fn distribute_homogeneous(&self, u: &mut DVector<T>) {
        assert!(self.closed, "Constraints must be closed before distributing.");
        for line in self.lines.values() {
            u[line.index] = Self::combination(&line.entries, u);
        }
    }

    fn combination(entries: &[(usize, T)], u: &DVector<T>) -> T {
        entries
            .iter()
            .fold(T::zero(), |sum, &(j, a)| sum + a * u[j])
    }

    /// Sets every constrained entry to zero.
    pub fn set_zero(&self, u: &mut DVector<T>) {
        for &index in self.lines.keys() {
            u[index] = T::zero();
        }
    }

    /// Applies `P^T` in place: the value of each constrained entry is distributed to the
    /// entries it depends on, and the constrained entry is set to zero.
    ///
    /// # Panics
    ///
    /// Panics if the constraints have not been closed.
    pub fn condense(&self, v: &mut DVector<T>) {
        assert!(self.closed, "Constraints must be closed before condensing.");
        for line in self.lines.values() {
            let v_i = v[line.index];
            for &(j, a) in &line.entries {
                v[j] += a * v_i;
            }
        }
        self.set_zero(v);
    }

    /// The vector `g` with the inhomogeneities on constrained entries and zeros elsewhere.
    pub fn inhomogeneity_vector(&self, len: usize) -> DVector<T> {
        let mut g = DVector::zeros(len);
        for line in self.lines.values() {
            g[line.index] = line.inhomogeneity;
        }
        g
    }
}
