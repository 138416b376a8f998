//! onshape-mcp: MCP server for Onshape assembly analysis
//!
//! This library lets AI assistants inspect and adjust Onshape assemblies
//! using bounding-box geometry.
//!
//! # Architecture
//!
//! - **Interference**: pairwise AABB overlap between part instances, with
//!   penetration depth and overlap volume
//! - **Positioning**: per-instance position reports, absolute placement and
//!   flush alignment against a face of another instance
//!
//! The analysis engines talk to Onshape through two small traits, so they can
//! run against the REST client or an in-memory assembly.
//!
//! # Modules
//!
//! - [`analysis`]: geometry, bounding-box cache, interference and positioning
//! - [`config`]: configuration loading and validation
//! - [`error`]: configuration error types
//! - [`mcp`]: MCP protocol implementation
//! - [`onshape`]: Onshape REST API client

pub mod analysis;
pub mod config;
pub mod error;
pub mod mcp;
pub mod onshape;
