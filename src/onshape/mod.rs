//! Onshape REST API access.
//!
//! [`OnshapeClient`] implements the analysis collaborator traits:
//!
//! - [`AssemblySource`](crate::analysis::AssemblySource): assembly
//!   definitions and occurrence transforms
//! - [`PartGeometrySource`](crate::analysis::PartGeometrySource): part
//!   bounding boxes
//!
//! All lengths exchanged with the API are in metres.

mod assemblies;
pub mod client;
pub mod error;
mod partstudio;

pub use client::OnshapeClient;
pub use error::{OnshapeError, OnshapeResult};
