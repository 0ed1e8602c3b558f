//! tfc-rs: drive the TensorFlow C API from Rust without a prebuilt binding.
//!
//! The crate finds an unpacked `libtensorflow` archive on disk, opens it with
//! `libloading`, binds the C entry points it needs, and wraps every native
//! object in an owner that releases it exactly once.
//!
//! # Example
//!
//! ```ignore
//! use tfc_rs::native::BindingTable;
//! use tfc_rs::runtime::{run_graph, Graph, Status};
//!
//! let tf = BindingTable::load()?;
//! let status = Status::create(&tf)?;
//! let graph = Graph::new(&tf)?;
//!
//! let a = graph.const_scalar(&status, "a", 1.5f32)?;
//! let b = graph.const_scalar(&status, "b", 2.25f32)?;
//! let sum = graph.add::<f32>(&status, "add", a, b)?;
//!
//! let value: f32 = run_graph(&graph, &status, sum)?;
//! assert_eq!(value, 3.75);
//! ```
//!
//! # Locating the library
//!
//! The installation root is the directory the official archive unpacks to.
//! Set it with `--tensorflow-home`, `tensorflow.home` in a YAML config, or
//! the `TENSORFLOW_HOME` environment variable. Libraries are looked up in
//! `<root>/lib`, falling back to `<root>`.
//!
//! # Threading
//!
//! Everything is synchronous and single-threaded. `BindingTable` is `!Sync`;
//! a host that shares one across threads must serialize whole
//! build-run-read sequences behind a lock.

pub mod cli;
pub mod config;
pub mod demo;
pub mod error;
pub mod native;
pub mod runtime;

// Re-export commonly used types
pub use error::{Result, TfError};
pub use native::{BindingTable, Libraries, TfApi};
pub use runtime::{run_graph, Graph, Operation, Session, Status, Tensor};
