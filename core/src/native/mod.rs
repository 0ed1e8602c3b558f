//! Native interop with the TensorFlow C library.
//!
//! This module finds libtensorflow on disk, binds the C entry points at
//! runtime, and exposes them through the [`TfApi`] trait. Use the owners in
//! [`crate::runtime`] rather than calling the trait directly.

pub mod api;
pub mod binding;
pub mod ffi;
pub mod locator;

pub use api::TfApi;
pub use binding::{read_cstring, BindingTable, CFunctions, SymbolLookup, Utf8Arena};
pub use ffi::TfOutput;
pub use locator::{resolve_home, resolve_home_from, resolve_libraries, Libraries, Platform};
