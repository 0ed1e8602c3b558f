//! Graph construction: constant scalars and element-wise addition.

use std::ffi::c_int;
use std::marker::PhantomData;
use std::ptr::NonNull;

use tracing::{debug, warn};

use super::status::Status;
use super::tensor::{Element, Tensor};
use crate::error::{Result, TfError};
use crate::native::ffi::{TF_DataType, TF_Graph, TF_Operation, TF_OperationDescription, TF_OK};
use crate::native::{TfApi, TfOutput};

/// Unique owner of a `TF_Graph`. Deleting it frees every operation it holds.
pub struct Graph<'a, A: TfApi + ?Sized> {
    api: &'a A,
    raw: NonNull<TF_Graph>,
}

/// Finished operation whose output 0 has element type `T`.
///
/// Borrows the graph that owns it, so it cannot outlive it, and remembers
/// that graph so it is rejected anywhere else. The element type travels with
/// the operation, so a result can only be fetched as the type it was built as:
///
/// ```no_run
/// use tfc_rs::runtime::{run_graph, Graph, Status};
/// use tfc_rs::{Result, TfApi};
///
/// fn fetch<A: TfApi>(graph: &Graph<'_, A>, status: &Status<'_, A>) -> Result<f32> {
///     let a = graph.const_scalar(status, "a", 1.5f32)?;
///     let b = graph.const_scalar(status, "b", 2.25f32)?;
///     let sum = graph.add(status, "add", a, b)?;
///     run_graph(graph, status, sum)
/// }
/// ```
///
/// ```compile_fail
/// use tfc_rs::runtime::{run_graph, Graph, Status};
/// use tfc_rs::{Result, TfApi};
///
/// fn fetch<A: TfApi>(graph: &Graph<'_, A>, status: &Status<'_, A>) -> Result<f64> {
///     let a = graph.const_scalar(status, "a", 1.5f32)?;
///     let b = graph.const_scalar(status, "b", 2.25f32)?;
///     let sum = graph.add(status, "add", a, b)?;
///     run_graph(graph, status, sum)
/// }
/// ```
#[derive(Debug)]
pub struct Operation<'g, T: Element> {
    raw: NonNull<TF_Operation>,
    graph: NonNull<TF_Graph>,
    _marker: PhantomData<(&'g (), T)>,
}

impl<T: Element> Clone for Operation<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Element> Copy for Operation<'_, T> {}

impl<T: Element> Operation<'_, T> {
    pub fn as_ptr(&self) -> *mut TF_Operation {
        self.raw.as_ptr()
    }

    /// Descriptor for output slot `index`.
    pub fn output(&self, index: c_int) -> TfOutput {
        TfOutput::new(self.raw.as_ptr(), index)
    }

    /// Fail with [`TfError::ForeignOperation`] unless this operation was built in `graph`.
    pub(crate) fn check_graph(&self, graph: NonNull<TF_Graph>, action: &str) -> Result<()> {
        if self.graph == graph {
            Ok(())
        } else {
            Err(TfError::ForeignOperation {
                action: action.to_string(),
            })
        }
    }
}

impl<'a, A: TfApi + ?Sized> Graph<'a, A> {
    /// Create an empty graph.
    pub fn new(api: &'a A) -> Result<Self> {
        // SAFETY: TF_NewGraph has no preconditions.
        let raw = unsafe { api.new_graph() };
        let raw = NonNull::new(raw).ok_or_else(|| TfError::null_result("TF_NewGraph"))?;
        debug!("TF_NewGraph -> {:p}", raw);
        Ok(Self { api, raw })
    }

    pub fn api(&self) -> &'a A {
        self.api
    }

    pub fn as_ptr(&self) -> *mut TF_Graph {
        self.raw.as_ptr()
    }

    pub(crate) fn raw(&self) -> NonNull<TF_Graph> {
        self.raw
    }

    /// Add a `Const` operation holding `value`.
    ///
    /// The staging tensor is deleted before returning on every path; the
    /// library copies its bytes into the operation when it is finished.
    pub fn const_scalar<T: Element>(
        &self,
        status: &Status<'_, A>,
        name: &str,
        value: T,
    ) -> Result<Operation<'_, T>> {
        let tensor = Tensor::scalar(self.api, value)?;

        let mut desc = OperationDescription::new(self, status, "Const", name)?;
        desc.set_attr_type("dtype", T::DTYPE)?;
        desc.set_attr_tensor("value", &tensor)?;
        let op = desc.finish("TF_FinishOperation(Const)")?;

        tensor.delete();
        debug!("Const {} = {:?}", name, value);
        Ok(op)
    }

    /// Add an `Add` operation of type `T` over output 0 of `left` and `right`.
    pub fn add<T: Element>(
        &self,
        status: &Status<'_, A>,
        name: &str,
        left: Operation<'_, T>,
        right: Operation<'_, T>,
    ) -> Result<Operation<'_, T>> {
        left.check_graph(self.raw, "Add")?;
        right.check_graph(self.raw, "Add")?;

        let mut desc = OperationDescription::new(self, status, "Add", name)?;
        desc.add_input(left)?;
        desc.add_input(right)?;
        desc.set_attr_type("T", T::DTYPE)?;
        let op = desc.finish("TF_FinishOperation(Add)")?;
        debug!("Add {}", name);
        Ok(op)
    }

    /// Delete the graph and every operation in it.
    pub fn delete(self) {}
}

impl<A: TfApi + ?Sized> Drop for Graph<'_, A> {
    fn drop(&mut self) {
        debug!("TF_DeleteGraph({:p})", self.raw);
        // SAFETY: Owned exclusively by `self`; deleted only here. Every
        // `Operation` borrows the graph, so none survive this point.
        unsafe { self.api.delete_graph(self.raw.as_ptr()) };
    }
}

/// Operation under construction.
///
/// `TF_FinishOperation` is the only call that frees a description, so a
/// description dropped before [`OperationDescription::finish`] is finished
/// anyway and the outcome discarded.
pub struct OperationDescription<'g, 's, A: TfApi + ?Sized> {
    api: &'g A,
    status: &'s Status<'s, A>,
    raw: Option<NonNull<TF_OperationDescription>>,
    graph: NonNull<TF_Graph>,
    _graph: PhantomData<&'g ()>,
}

impl<'g, 's, A: TfApi + ?Sized> OperationDescription<'g, 's, A> {
    /// Start an operation of kind `op_type` named `name` in `graph`.
    pub fn new(
        graph: &'g Graph<'_, A>,
        status: &'s Status<'s, A>,
        op_type: &str,
        name: &str,
    ) -> Result<Self> {
        let api = graph.api;
        let op_type_ptr = api.alloc_utf8(op_type)?;
        let name_ptr = api.alloc_utf8(name)?;
        // SAFETY: The graph is live and both strings are arena-owned and NUL-terminated.
        let raw = unsafe { api.new_operation(graph.as_ptr(), op_type_ptr, name_ptr) };
        let raw = NonNull::new(raw)
            .ok_or_else(|| TfError::null_result(format!("TF_NewOperation({})", op_type)))?;
        Ok(Self {
            api,
            status,
            raw: Some(raw),
            graph: graph.raw,
            _graph: PhantomData,
        })
    }

    fn raw(&self) -> *mut TF_OperationDescription {
        self.raw
            .map(NonNull::as_ptr)
            .unwrap_or(std::ptr::null_mut())
    }

    pub fn set_attr_type(&mut self, attr: &str, dtype: TF_DataType) -> Result<()> {
        let attr_ptr = self.api.alloc_utf8(attr)?;
        // SAFETY: The description is unfinished and the name is arena-owned.
        unsafe { self.api.set_attr_type(self.raw(), attr_ptr, dtype) };
        Ok(())
    }

    /// Set a tensor attribute. The library copies the tensor, so it may be deleted afterwards.
    pub fn set_attr_tensor(&mut self, attr: &str, tensor: &Tensor<'_, A>) -> Result<()> {
        let attr_ptr = self.api.alloc_utf8(attr)?;
        // SAFETY: Description, tensor and status are live; the name is arena-owned.
        unsafe {
            self.api
                .set_attr_tensor(self.raw(), attr_ptr, tensor.as_ptr(), self.status.as_ptr())
        };
        self.status
            .raise_if_error(&format!("TF_SetAttrTensor({})", attr))
    }

    /// Wire output 0 of `input`, which must belong to the same graph.
    pub fn add_input<T: Element>(&mut self, input: Operation<'_, T>) -> Result<()> {
        input.check_graph(self.graph, "TF_AddInput")?;
        // SAFETY: The description is unfinished; `input` is a live operation of the same graph.
        unsafe { self.api.add_input(self.raw(), input.output(0)) };
        Ok(())
    }

    /// Finish the operation, consuming the description. `T` is the element
    /// type of the finished operation's output 0.
    pub fn finish<T: Element>(mut self, action: &str) -> Result<Operation<'g, T>> {
        let Some(raw) = self.raw.take() else {
            return Err(TfError::null_result(action));
        };
        // SAFETY: `raw` is unfinished; TF_FinishOperation frees it on every outcome.
        let op = unsafe { self.api.finish_operation(raw.as_ptr(), self.status.as_ptr()) };
        self.status.raise_if_error(action)?;
        let raw = NonNull::new(op).ok_or_else(|| TfError::null_result(action))?;
        Ok(Operation {
            raw,
            graph: self.graph,
            _marker: PhantomData,
        })
    }
}

impl<A: TfApi + ?Sized> Drop for OperationDescription<'_, '_, A> {
    fn drop(&mut self) {
        let Some(raw) = self.raw.take() else {
            return;
        };
        // SAFETY: `raw` is unfinished and finishing is the only way to free it.
        // Any error has already been read out of the status by the caller.
        unsafe { self.api.finish_operation(raw.as_ptr(), self.status.as_ptr()) };
        if self.status.code() != TF_OK {
            debug!("Released abandoned operation description: {}", self.status.message());
        } else {
            warn!("Abandoned operation description finished successfully; it stays in the graph");
        }
    }
}
