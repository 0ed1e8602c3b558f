//! The scalar-sum demo: `Const(a) + Const(b)` evaluated by TensorFlow.

use tracing::info;

use crate::error::Result;
use crate::native::binding::read_cstring;
use crate::native::TfApi;
use crate::runtime::{run_graph, Graph, Status};

/// Version string reported by `TF_Version`, if any.
pub fn version<A: TfApi + ?Sized>(api: &A) -> Option<String> {
    // SAFETY: TF_Version returns a static string owned by the library.
    unsafe { read_cstring(api.version()) }
}

/// Build `a + b` as a graph, run it in a fresh session, and return the sum.
///
/// Every native object created here is released before returning, including
/// on failure.
pub fn add_scalars<A: TfApi + ?Sized>(api: &A, a: f32, b: f32) -> Result<f32> {
    let status = Status::create(api)?;
    let graph = Graph::new(api)?;

    let result = build_and_run(&graph, &status, a, b);

    graph.delete();
    status.release();
    result
}

fn build_and_run<A: TfApi + ?Sized>(
    graph: &Graph<'_, A>,
    status: &Status<'_, A>,
    a: f32,
    b: f32,
) -> Result<f32> {
    let const_a = graph.const_scalar(status, "a", a)?;
    let const_b = graph.const_scalar(status, "b", b)?;
    let add = graph.add::<f32>(status, "add", const_a, const_b)?;

    info!("Running computation: {} + {}", a, b);
    run_graph(graph, status, add)
}
