//! The call surface the runtime owners are written against.
//!
//! [`BindingTable`] forwards each method to the bound entry point. Tests use
//! a resource-tracking implementation of the same trait.

use std::ffi::{c_char, c_int, c_void};

use super::binding::BindingTable;
use super::ffi::*;
use crate::error::Result;

/// TensorFlow C API entry points used by this crate.
///
/// Method names follow the C functions (`new_status` is `TF_NewStatus`).
///
/// # Safety
///
/// Every `unsafe` method has the contract of the C function it mirrors:
/// handles must come from the same implementation and still be alive, and
/// pointer arguments must be valid for the sizes the C API documents.
#[allow(clippy::missing_safety_doc, clippy::too_many_arguments)]
pub trait TfApi {
    /// Copy `value` into a native string that lives as long as `self`.
    fn alloc_utf8(&self, value: &str) -> Result<*const c_char>;

    unsafe fn version(&self) -> *const c_char;

    unsafe fn new_status(&self) -> *mut TF_Status;
    unsafe fn delete_status(&self, status: *mut TF_Status);
    unsafe fn get_code(&self, status: *const TF_Status) -> c_int;
    unsafe fn message(&self, status: *const TF_Status) -> *const c_char;

    unsafe fn new_graph(&self) -> *mut TF_Graph;
    unsafe fn delete_graph(&self, graph: *mut TF_Graph);

    unsafe fn new_session_options(&self) -> *mut TF_SessionOptions;
    unsafe fn delete_session_options(&self, options: *mut TF_SessionOptions);
    unsafe fn new_session(
        &self,
        graph: *mut TF_Graph,
        options: *const TF_SessionOptions,
        status: *mut TF_Status,
    ) -> *mut TF_Session;
    unsafe fn close_session(&self, session: *mut TF_Session, status: *mut TF_Status);
    unsafe fn delete_session(&self, session: *mut TF_Session, status: *mut TF_Status);

    unsafe fn new_operation(
        &self,
        graph: *mut TF_Graph,
        op_type: *const c_char,
        oper_name: *const c_char,
    ) -> *mut TF_OperationDescription;
    unsafe fn set_attr_type(
        &self,
        desc: *mut TF_OperationDescription,
        attr_name: *const c_char,
        value: TF_DataType,
    );
    unsafe fn set_attr_tensor(
        &self,
        desc: *mut TF_OperationDescription,
        attr_name: *const c_char,
        value: *mut TF_Tensor,
        status: *mut TF_Status,
    );
    unsafe fn add_input(&self, desc: *mut TF_OperationDescription, input: TfOutput);
    unsafe fn finish_operation(
        &self,
        desc: *mut TF_OperationDescription,
        status: *mut TF_Status,
    ) -> *mut TF_Operation;

    unsafe fn allocate_tensor(
        &self,
        dtype: TF_DataType,
        dims: *const i64,
        num_dims: c_int,
        len: usize,
    ) -> *mut TF_Tensor;
    unsafe fn tensor_data(&self, tensor: *const TF_Tensor) -> *mut c_void;
    unsafe fn delete_tensor(&self, tensor: *mut TF_Tensor);

    unsafe fn session_run(
        &self,
        session: *mut TF_Session,
        run_options: *const TF_Buffer,
        inputs: *const TfOutput,
        input_values: *const *mut TF_Tensor,
        ninputs: c_int,
        outputs: *const TfOutput,
        output_values: *mut *mut TF_Tensor,
        noutputs: c_int,
        target_opers: *const *const TF_Operation,
        ntargets: c_int,
        run_metadata: *mut TF_Buffer,
        status: *mut TF_Status,
    );
}

impl TfApi for BindingTable {
    fn alloc_utf8(&self, value: &str) -> Result<*const c_char> {
        self.arena().alloc(value)
    }

    unsafe fn version(&self) -> *const c_char {
        (self.fns().tf_version)()
    }

    unsafe fn new_status(&self) -> *mut TF_Status {
        (self.fns().tf_new_status)()
    }

    unsafe fn delete_status(&self, status: *mut TF_Status) {
        (self.fns().tf_delete_status)(status)
    }

    unsafe fn get_code(&self, status: *const TF_Status) -> c_int {
        (self.fns().tf_get_code)(status)
    }

    unsafe fn message(&self, status: *const TF_Status) -> *const c_char {
        (self.fns().tf_message)(status)
    }

    unsafe fn new_graph(&self) -> *mut TF_Graph {
        (self.fns().tf_new_graph)()
    }

    unsafe fn delete_graph(&self, graph: *mut TF_Graph) {
        (self.fns().tf_delete_graph)(graph)
    }

    unsafe fn new_session_options(&self) -> *mut TF_SessionOptions {
        (self.fns().tf_new_session_options)()
    }

    unsafe fn delete_session_options(&self, options: *mut TF_SessionOptions) {
        (self.fns().tf_delete_session_options)(options)
    }

    unsafe fn new_session(
        &self,
        graph: *mut TF_Graph,
        options: *const TF_SessionOptions,
        status: *mut TF_Status,
    ) -> *mut TF_Session {
        (self.fns().tf_new_session)(graph, options, status)
    }

    unsafe fn close_session(&self, session: *mut TF_Session, status: *mut TF_Status) {
        (self.fns().tf_close_session)(session, status)
    }

    unsafe fn delete_session(&self, session: *mut TF_Session, status: *mut TF_Status) {
        (self.fns().tf_delete_session)(session, status)
    }

    unsafe fn new_operation(
        &self,
        graph: *mut TF_Graph,
        op_type: *const c_char,
        oper_name: *const c_char,
    ) -> *mut TF_OperationDescription {
        (self.fns().tf_new_operation)(graph, op_type, oper_name)
    }

    unsafe fn set_attr_type(
        &self,
        desc: *mut TF_OperationDescription,
        attr_name: *const c_char,
        value: TF_DataType,
    ) {
        (self.fns().tf_set_attr_type)(desc, attr_name, value)
    }

    unsafe fn set_attr_tensor(
        &self,
        desc: *mut TF_OperationDescription,
        attr_name: *const c_char,
        value: *mut TF_Tensor,
        status: *mut TF_Status,
    ) {
        (self.fns().tf_set_attr_tensor)(desc, attr_name, value, status)
    }

    unsafe fn add_input(&self, desc: *mut TF_OperationDescription, input: TfOutput) {
        (self.fns().tf_add_input)(desc, input)
    }

    unsafe fn finish_operation(
        &self,
        desc: *mut TF_OperationDescription,
        status: *mut TF_Status,
    ) -> *mut TF_Operation {
        (self.fns().tf_finish_operation)(desc, status)
    }

    unsafe fn allocate_tensor(
        &self,
        dtype: TF_DataType,
        dims: *const i64,
        num_dims: c_int,
        len: usize,
    ) -> *mut TF_Tensor {
        (self.fns().tf_allocate_tensor)(dtype, dims, num_dims, len)
    }

    unsafe fn tensor_data(&self, tensor: *const TF_Tensor) -> *mut c_void {
        (self.fns().tf_tensor_data)(tensor)
    }

    unsafe fn delete_tensor(&self, tensor: *mut TF_Tensor) {
        (self.fns().tf_delete_tensor)(tensor)
    }

    #[allow(clippy::too_many_arguments)]
    unsafe fn session_run(
        &self,
        session: *mut TF_Session,
        run_options: *const TF_Buffer,
        inputs: *const TfOutput,
        input_values: *const *mut TF_Tensor,
        ninputs: c_int,
        outputs: *const TfOutput,
        output_values: *mut *mut TF_Tensor,
        noutputs: c_int,
        target_opers: *const *const TF_Operation,
        ntargets: c_int,
        run_metadata: *mut TF_Buffer,
        status: *mut TF_Status,
    ) {
        (self.fns().tf_session_run)(
            session,
            run_options,
            inputs,
            input_values,
            ninputs,
            outputs,
            output_values,
            noutputs,
            target_opers,
            ntargets,
            run_metadata,
            status,
        )
    }
}
