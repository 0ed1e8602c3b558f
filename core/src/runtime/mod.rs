//! Safe owners for native TensorFlow objects.
//!
//! Every handle here has one creating call and one destroying call, and the
//! destroying call runs on drop. Owners borrow the [`TfApi`](crate::native::TfApi)
//! they came from, so they cannot outlive the loaded library.

mod graph;
mod session;
mod status;
mod tensor;

pub use graph::{Graph, Operation, OperationDescription};
pub use session::{run_graph, Session, SessionState};
pub use status::Status;
pub use tensor::{Element, Tensor};
