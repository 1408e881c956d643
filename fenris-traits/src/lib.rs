use nalgebra::{DimMin, DimName, RealField};

pub use nalgebra;

pub mod allocators;

/// A real scalar type that is cheap to copy.
pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}

/// A small, fixed-size dimension.
///
/// Used as a trait alias for the traits needed by generic routines that compute determinants
/// and inverses of square matrices of this dimension.
pub trait SmallDim: DimName + DimMin<Self, Output = Self> {}

impl<D> SmallDim for D where D: DimName + DimMin<Self, Output = Self> {}
