//! Raw declarations for the TensorFlow C API.
//!
//! Nothing here is linked at build time. The function pointer types are
//! resolved against the shared library by [`super::binding`]; use the safe
//! owners in [`crate::runtime`] instead of calling these directly.

#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_int, c_void};
use std::marker::{PhantomData, PhantomPinned};
use std::mem;
use std::ptr;

macro_rules! opaque {
    ($($(#[$meta:meta])* $name:ident;)*) => {
        $(
            $(#[$meta])*
            #[repr(C)]
            pub struct $name {
                _data: [u8; 0],
                _marker: PhantomData<(*mut u8, PhantomPinned)>,
            }
        )*
    };
}

opaque! {
    /// Outcome of the most recent fallible call.
    TF_Status;
    /// Computation graph.
    TF_Graph;
    /// Operation under construction. Consumed by `TF_FinishOperation`.
    TF_OperationDescription;
    /// Finished operation, owned by its graph.
    TF_Operation;
    /// Dense tensor with a native backing buffer.
    TF_Tensor;
    /// Session configuration.
    TF_SessionOptions;
    /// Execution context bound to one graph.
    TF_Session;
    /// Serialized protobuf buffer (run options, run metadata).
    TF_Buffer;
}

/// Element type tag (`TF_DataType` enum in `c_api.h`).
pub type TF_DataType = c_int;

pub const TF_FLOAT: TF_DataType = 1;
pub const TF_DOUBLE: TF_DataType = 2;
pub const TF_INT32: TF_DataType = 3;
pub const TF_INT64: TF_DataType = 9;

/// `TF_OK` from `TF_Code`.
pub const TF_OK: c_int = 0;

/// `TF_Output`: one output slot of an operation.
///
/// The C struct is `{ TF_Operation* oper; int index; }`. On 64-bit targets
/// the compiler pads it to 16 bytes; the padding is spelled out here so the
/// layout does not depend on inference.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TfOutput {
    pub oper: *mut TF_Operation,
    pub index: c_int,
    #[cfg(target_pointer_width = "64")]
    _padding: [u8; 4],
}

impl TfOutput {
    pub fn new(oper: *mut TF_Operation, index: c_int) -> Self {
        Self {
            oper,
            index,
            #[cfg(target_pointer_width = "64")]
            _padding: [0; 4],
        }
    }

    pub fn null() -> Self {
        Self::new(ptr::null_mut(), 0)
    }
}

const _: () = {
    assert!(mem::size_of::<TfOutput>() == 2 * mem::size_of::<*mut c_void>());
    assert!(mem::align_of::<TfOutput>() == mem::align_of::<*mut c_void>());
    assert!(mem::offset_of!(TfOutput, oper) == 0);
    assert!(mem::offset_of!(TfOutput, index) == mem::size_of::<*mut c_void>());
};

// Entry point signatures.

pub type TfVersionFn = unsafe extern "C" fn() -> *const c_char;

pub type TfNewStatusFn = unsafe extern "C" fn() -> *mut TF_Status;
pub type TfDeleteStatusFn = unsafe extern "C" fn(status: *mut TF_Status);
pub type TfGetCodeFn = unsafe extern "C" fn(status: *const TF_Status) -> c_int;
pub type TfMessageFn = unsafe extern "C" fn(status: *const TF_Status) -> *const c_char;

pub type TfNewGraphFn = unsafe extern "C" fn() -> *mut TF_Graph;
pub type TfDeleteGraphFn = unsafe extern "C" fn(graph: *mut TF_Graph);

pub type TfNewSessionOptionsFn = unsafe extern "C" fn() -> *mut TF_SessionOptions;
pub type TfDeleteSessionOptionsFn = unsafe extern "C" fn(options: *mut TF_SessionOptions);
pub type TfNewSessionFn = unsafe extern "C" fn(
    graph: *mut TF_Graph,
    options: *const TF_SessionOptions,
    status: *mut TF_Status,
) -> *mut TF_Session;
pub type TfCloseSessionFn = unsafe extern "C" fn(session: *mut TF_Session, status: *mut TF_Status);
pub type TfDeleteSessionFn =
    unsafe extern "C" fn(session: *mut TF_Session, status: *mut TF_Status);

pub type TfNewOperationFn = unsafe extern "C" fn(
    graph: *mut TF_Graph,
    op_type: *const c_char,
    oper_name: *const c_char,
) -> *mut TF_OperationDescription;
pub type TfSetAttrTypeFn = unsafe extern "C" fn(
    desc: *mut TF_OperationDescription,
    attr_name: *const c_char,
    value: TF_DataType,
);
pub type TfSetAttrTensorFn = unsafe extern "C" fn(
    desc: *mut TF_OperationDescription,
    attr_name: *const c_char,
    value: *mut TF_Tensor,
    status: *mut TF_Status,
);
pub type TfAddInputFn = unsafe extern "C" fn(desc: *mut TF_OperationDescription, input: TfOutput);
pub type TfFinishOperationFn = unsafe extern "C" fn(
    desc: *mut TF_OperationDescription,
    status: *mut TF_Status,
) -> *mut TF_Operation;

pub type TfAllocateTensorFn = unsafe extern "C" fn(
    dtype: TF_DataType,
    dims: *const i64,
    num_dims: c_int,
    len: usize,
) -> *mut TF_Tensor;
pub type TfTensorDataFn = unsafe extern "C" fn(tensor: *const TF_Tensor) -> *mut c_void;
pub type TfDeleteTensorFn = unsafe extern "C" fn(tensor: *mut TF_Tensor);

pub type TfSessionRunFn = unsafe extern "C" fn(
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
