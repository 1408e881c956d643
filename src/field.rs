//! Functions of space with one or more components.
//!
//! A [`Field`] is the continuous counterpart of a finite element field: reference solutions,
//! right-hand sides, weights and boundary data are all given as fields.
use crate::allocators::DimAllocator;
use crate::{Real, SmallDim};
use nalgebra::{DVector, DefaultAllocator, Dyn, OMatrix, OPoint, OVector};
use std::ops::Range;

pub trait Field<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    fn num_components(&self) -> usize;

    /// Writes the value of every component at `x` into `value`.
    ///
    /// # Panics
    ///
    /// May panic if `value` does not have length `num_components()`.
    fn populate_value(&self, x: &OPoint<T, D>, value: &mut [T]);

    /// Whether [`populate_gradient`](Self::populate_gradient) is available.
    fn has_gradient(&self) -> bool {
        false
    }

    /// Writes the gradient of every component at `x` into the corresponding column of
    /// `gradient`, which has `num_components()` columns.
    ///
    /// Only called if [`has_gradient`](Self::has_gradient) returns `true`.
    fn populate_gradient(&self, _x: &OPoint<T, D>, _gradient: &mut OMatrix<T, D, Dyn>) {}

    fn value(&self, x: &OPoint<T, D>) -> DVector<T> {
        let mut value = DVector::zeros(self.num_components());
        self.populate_value(x, value.as_mut_slice());
        value
    }

    fn gradient(&self, x: &OPoint<T, D>) -> Option<OMatrix<T, D, Dyn>> {
        self.has_gradient().then(|| {
            let mut gradient = OMatrix::<T, D, Dyn>::zeros(self.num_components());
            self.populate_gradient(x, &mut gradient);
            gradient
        })
    }
}

impl<T, D, F> Field<T, D> for &F
where
    T: Real,
    D: SmallDim,
    F: ?Sized + Field<T, D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    fn num_components(&self) -> usize {
        F::num_components(self)
    }

    fn populate_value(&self, x: &OPoint<T, D>, value: &mut [T]) {
        F::populate_value(self, x, value)
    }

    fn has_gradient(&self) -> bool {
        F::has_gradient(self)
    }

    fn populate_gradient(&self, x: &OPoint<T, D>, gradient: &mut OMatrix<T, D, Dyn>) {
        F::populate_gradient(self, x, gradient)
    }
}

/// A field given by a closure returning all components.
#[derive(Debug, Clone, Copy)]
pub struct FnField<F> {
    num_components: usize,
    f: F,
}

/// A field with `num_components` components given by a closure.
pub fn field_fn<T, D, F>(num_components: usize, f: F) -> FnField<F>
where
    T: Real,
    D: SmallDim,
    F: Fn(&OPoint<T, D>) -> DVector<T>,
    DefaultAllocator: DimAllocator<T, D>,
{
    FnField { num_components, f }
}

impl<F> FnField<F> {
    /// Attaches a gradient to the field.
    ///
    /// The closure receives the point and a matrix with one column per component.
    pub fn with_gradient<G>(self, gradient: G) -> WithGradient<Self, G> {
        WithGradient { field: self, gradient }
    }
}

impl<T, D, F> Field<T, D> for FnField<F>
where
    T: Real,
    D: SmallDim,
    F: Fn(&OPoint<T, D>) -> DVector<T>,
    DefaultAllocator: DimAllocator<T, D>,
{
    fn num_components(&self) -> usize {
        self.num_components
    }

    fn populate_value(&self, x: &OPoint<T, D>, value: &mut [T]) {
        let result = (self.f)(x);
        assert_eq!(
            result.len(),
            self.num_components,
            "Closure must return one value per component."
        );
        value.copy_from_slice(result.as_slice());
    }
}

/// A scalar field given by a closure.
#[derive(Debug, Clone, Copy)]
pub struct ScalarFnField<F> {
    f: F,
}

pub fn scalar_field_fn<T, D, F>(f: F) -> ScalarFnField<F>
where
    T: Real,
    D: SmallDim,
    F: Fn(&OPoint<T, D>) -> T,
    DefaultAllocator: DimAllocator<T, D>,
{
    ScalarFnField { f }
}

impl<F> ScalarFnField<F> {
    /// Attaches the gradient of the scalar function to the field.
    pub fn with_gradient<G>(self, gradient: G) -> WithGradient<Self, ScalarGradient<G>> {
        WithGradient {
            field: self,
            gradient: ScalarGradient(gradient),
        }
    }
}

impl<T, D, F> Field<T, D> for ScalarFnField<F>
where
    T: Real,
    D: SmallDim,
    F: Fn(&OPoint<T, D>) -> T,
    DefaultAllocator: DimAllocator<T, D>,
{
    fn num_components(&self) -> usize {
        1
    }

    fn populate_value(&self, x: &OPoint<T, D>, value: &mut [T]) {
        value[0] = (self.f)(x);
    }
}

/// Computes the gradient of a field into a matrix with one column per component.
pub trait GradientFn<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    fn populate_gradient(&self, x: &OPoint<T, D>, gradient: &mut OMatrix<T, D, Dyn>);
}

impl<T, D, G> GradientFn<T, D> for G
where
    T: Real,
    D: SmallDim,
    G: Fn(&OPoint<T, D>, &mut OMatrix<T, D, Dyn>),
    DefaultAllocator: DimAllocator<T, D>,
{
    fn populate_gradient(&self, x: &OPoint<T, D>, gradient: &mut OMatrix<T, D, Dyn>) {
        self(x, gradient)
    }
}

/// Adapts a closure returning the gradient vector of a scalar function.
#[derive(Debug, Clone, Copy)]
pub struct ScalarGradient<G>(pub G);

impl<T, D, G> GradientFn<T, D> for ScalarGradient<G>
where
    T: Real,
    D: SmallDim,
    G: Fn(&OPoint<T, D>) -> OVector<T, D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    fn populate_gradient(&self, x: &OPoint<T, D>, gradient: &mut OMatrix<T, D, Dyn>) {
        gradient.set_column(0, &(self.0)(x));
    }
}

/// A field together with its gradient.
#[derive(Debug, Clone, Copy)]
pub struct WithGradient<F, G> {
    field: F,
    gradient: G,
}

impl<T, D, F, G> Field<T, D> for WithGradient<F, G>
where
    T: Real,
    D: SmallDim,
    F: Field<T, D>,
    G: GradientFn<T, D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    fn num_components(&self) -> usize {
        self.field.num_components()
    }

    fn populate_value(&self, x: &OPoint<T, D>, value: &mut [T]) {
        self.field.populate_value(x, value)
    }

    fn has_gradient(&self) -> bool {
        true
    }

    fn populate_gradient(&self, x: &OPoint<T, D>, gradient: &mut OMatrix<T, D, Dyn>) {
        self.gradient.populate_gradient(x, gradient)
    }
}

/// A field that takes the same value everywhere.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantField<T: Real> {
    values: DVector<T>,
}

impl<T: Real> ConstantField<T> {
    pub fn new(values: DVector<T>) -> Self {
        Self { values }
    }

    pub fn scalar(value: T) -> Self {
        Self::new(DVector::from_element(1, value))
    }
}

impl<T, D> Field<T, D> for ConstantField<T>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    fn num_components(&self) -> usize {
        self.values.len()
    }

    fn populate_value(&self, _x: &OPoint<T, D>, value: &mut [T]) {
        value.copy_from_slice(self.values.as_slice());
    }

    fn has_gradient(&self) -> bool {
        true
    }

    fn populate_gradient(&self, _x: &OPoint<T, D>, gradient: &mut OMatrix<T, D, Dyn>) {
        gradient.fill(T::zero());
    }
}

/// The zero function with the given number of components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZeroField {
    pub num_components: usize,
}

impl ZeroField {
    pub fn new(num_components: usize) -> Self {
        Self { num_components }
    }
}

impl<T, D> Field<T, D> for ZeroField
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    fn num_components(&self) -> usize {
        self.num_components
    }

    fn populate_value(&self, _x: &OPoint<T, D>, value: &mut [T]) {
        value.fill(T::zero());
    }

    fn has_gradient(&self) -> bool {
        true
    }

    fn populate_gradient(&self, _x: &OPoint<T, D>, gradient: &mut OMatrix<T, D, Dyn>) {
        gradient.fill(T::zero());
    }
}

/// A weight that is one on a range of components and zero on all others.
///
/// Used as the weight of an error computation to restrict it to some of the components of
/// a field, e.g. only the velocity of a velocity-pressure system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSelect {
    num_components: usize,
    selected: Range<usize>,
}

impl ComponentSelect {
    /// # Panics
    ///
    /// Panics if the range is not contained in `0 .. num_components`.
    pub fn new(num_components: usize, selected: Range<usize>) -> Self {
        assert!(selected.end <= num_components, "Selected components out of bounds.");
        Self {
            num_components,
            selected,
        }
    }

    pub fn single(num_components: usize, component: usize) -> Self {
        Self::new(num_components, component..component + 1)
    }
}

impl<T, D> Field<T, D> for ComponentSelect
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    fn num_components(&self) -> usize {
        self.num_components
    }

    fn populate_value(&self, _x: &OPoint<T, D>, value: &mut [T]) {
        for (c, v) in value.iter_mut().enumerate() {
            *v = if self.selected.contains(&c) { T::one() } else { T::zero() };
        }
    }

    fn has_gradient(&self) -> bool {
        true
    }

    fn populate_gradient(&self, _x: &OPoint<T, D>, gradient: &mut OMatrix<T, D, Dyn>) {
        gradient.fill(T::zero());
    }
}
