//! Error estimation and related tools for vertex-based Lagrange finite element fields.
//!
//! The central operations are [`estimate::integrate_difference`], which integrates a chosen
//! [`NormType`](norm::NormType) of the difference between a reference field and a finite
//! element field over every locally owned cell, and [`norm::compute_global_error`], which
//! combines the per-cell values across all processes into a single number.
pub mod allocators;
pub mod assembly;
pub mod boundary;
pub mod cg;
pub mod communicator;
pub mod config;
pub mod connectivity;
pub mod constraints;
pub mod dofs;
pub mod element;
pub mod error;
pub mod estimate;
pub mod face;
pub mod field;
pub mod flux;
pub mod interpolate;
pub mod locate;
pub mod mean;
pub mod mesh;
pub mod norm;
pub mod partition;
pub mod point;
pub mod project;
pub mod quadrature;

#[cfg(feature = "proptest")]
pub mod proptest;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

pub use fenris_traits::{Real, SmallDim};
