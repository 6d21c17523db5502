// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::too_many_lines)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]
// Tests lean on unwrap and glob imports.
#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::wildcard_imports, clippy::float_cmp)
)]

//! Instance batching for interactive 3D teaching scenes.
//!
//! Many logical objects that share one geometry and one material are drawn
//! with a single instanced draw call. The crate keeps the authoritative,
//! sparse list of those objects and a dense, fixed-capacity buffer the GPU
//! reads, and brings the two back in line once per frame.
//!
//! # Key entry points
//!
//! - [`instancing::InstanceRegistry`] - groups, instance CRUD, flush, stats
//! - [`instancing::SharedRegistry`] - the registry behind one lock
//! - [`gpu::InstanceUploader`] - uploads flushed buffers to wgpu
//! - [`options::RegistryOptions`] - TOML-backed behavior options
//! - [`resources`] - geometry/material traits the host implements
//!
//! # Frame flow
//!
//! Between frames, callers add, update and remove instances; each mutation
//! only edits the instance list and marks its group dirty. Before drawing,
//! the render loop calls [`instancing::InstanceRegistry::flush`], which
//! rewrites the buffers of dirty groups, then
//! [`gpu::InstanceUploader::sync`] to push whatever was flagged.

pub mod error;
pub mod gpu;
pub mod instancing;
pub mod options;
pub mod resources;

pub use error::InstancingError;
