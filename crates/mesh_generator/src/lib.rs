#![forbid(unsafe_code)]
//! mesh_generator: Image-driven particle meshes with grid-accelerated redistribution.
//!
//! Modules:
//! - density: image density fields and pluggable acceptance curves
//! - placement: parallel rejection sampling of the initial particle set
//! - relaxation, redistribution: iterative spacing improvement on a cell grid
//! - rdf: radial distribution diagnostics
//! - generator: the end-to-end pipeline with progress events
//!
//! A run is reproducible: the same parameters and seed give the same mesh for any worker count.
pub mod density;
pub mod error;
pub mod events;
pub mod generator;
pub mod geometry;
pub mod grid;
pub mod params;
pub mod placement;
pub mod rdf;
pub mod redistribution;
pub mod relaxation;
pub mod sampling;

#[cfg(test)]
mod testing;

/// Convenient re-exports for common types. Import with `use mesh_generator::prelude::*;`.
pub mod prelude {
    pub use crate::density::{
        AcceptanceCurve, ConstantCurve, DensityField, DensitySample, ImageDensityField,
        PowerBlendCurve,
    };
    pub use crate::error::{Error, Result};
    pub use crate::events::{EventSink, FnSink, MeshEvent, MeshEventKind, Stage, VecSink};
    pub use crate::generator::{Mesh, MeshGenerator};
    pub use crate::geometry::Domain;
    pub use crate::grid::DomainGrid;
    pub use crate::params::Parameters;
    pub use crate::placement::{ParticlePlacer, PlacementStats};
    pub use crate::rdf::RadialDistribution;
    pub use crate::redistribution::{select_most_crowded, PassReport, Redistributor};
    pub use crate::relaxation::{CentroidalRelaxer, RelaxationReport};
    pub use crate::sampling::derive_seed;
}
