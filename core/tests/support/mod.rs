//! In-process stand-in for libtensorflow.
//!
//! `FakeTf` implements `TfApi` with heap objects behind the opaque handle
//! types. It evaluates `Const` and `Add`, logs every call, counts live
//! handles, and can be told to fail at one step.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::ptr;

use tfc_rs::native::ffi::*;
use tfc_rs::native::{TfApi, Utf8Arena};
use tfc_rs::Result;

/// Step at which the fake reports failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    AllocateTensor,
    SetAttrTensor,
    FinishConst,
    FinishAdd,
    NewSession,
    SessionRun,
    NullOutput,
    CloseSession,
}

pub const INVALID_ARGUMENT: c_int = 3;
pub const INTERNAL: c_int = 13;

struct FakeStatus {
    code: c_int,
    message: Option<CString>,
}

struct FakeGraph {
    ops: Vec<Box<FakeOp>>,
}

struct FakeOp {
    dtype: TF_DataType,
    bytes: Vec<u8>,
}

struct FakeDesc {
    graph: *mut FakeGraph,
    op_type: String,
    dtype: Option<TF_DataType>,
    value: Option<(TF_DataType, Vec<u8>)>,
    inputs: Vec<TfOutput>,
}

struct FakeTensor {
    dtype: TF_DataType,
    data: Vec<u8>,
}

struct FakeSession {
    closed: bool,
}

struct FakeOptions {
    target: String,
}

pub struct FakeTf {
    arena: Utf8Arena,
    fail_at: Option<FailAt>,
    live: RefCell<BTreeMap<usize, &'static str>>,
    calls: RefCell<Vec<&'static str>>,
}

impl FakeTf {
    pub fn new() -> Self {
        Self {
            arena: Utf8Arena::new(),
            fail_at: None,
            live: RefCell::new(BTreeMap::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn failing_at(step: FailAt) -> Self {
        Self {
            fail_at: Some(step),
            ..Self::new()
        }
    }

    /// Kinds of handles created and not yet destroyed.
    pub fn outstanding(&self) -> Vec<&'static str> {
        self.live.borrow().values().copied().collect()
    }

    /// Every C function called so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.borrow().iter().filter(|c| **c == call).count()
    }

    fn fails(&self, step: FailAt) -> bool {
        self.fail_at == Some(step)
    }

    fn record(&self, call: &'static str) {
        self.calls.borrow_mut().push(call);
    }

    fn track<T>(&self, kind: &'static str, value: T) -> *mut T {
        let ptr = Box::into_raw(Box::new(value));
        self.live.borrow_mut().insert(ptr as usize, kind);
        ptr
    }

    /// Free a tracked object. Panics on a handle that is not live.
    unsafe fn untrack<T>(&self, kind: &'static str, ptr: *mut T) -> Box<T> {
        match self.live.borrow_mut().remove(&(ptr as usize)) {
            Some(found) if found == kind => {}
            Some(found) => panic!("{kind} handle {ptr:p} is actually a {found}"),
            None => panic!("{kind} handle {ptr:p} is not live (double free?)"),
        }
        Box::from_raw(ptr)
    }

    /// Overwrite a status as a failing native call would. `None` makes
    /// `TF_Message` return NULL.
    pub fn set_status(&self, status: *mut TF_Status, code: c_int, message: Option<&str>) {
        self.assert_live("status", status.cast());
        // SAFETY: Checked live above; statuses from this fake are `FakeStatus`.
        let status = unsafe { status_mut(status) };
        status.code = code;
        status.message = message.map(|m| CString::new(m).unwrap());
    }

    fn assert_live(&self, kind: &'static str, ptr: *const c_void) {
        match self.live.borrow().get(&(ptr as usize)) {
            Some(found) if *found == kind => {}
            _ => panic!("{kind} handle {ptr:p} used after free"),
        }
    }
}

impl Default for FakeTf {
    fn default() -> Self {
        Self::new()
    }
}

unsafe fn status_mut<'a>(status: *mut TF_Status) -> &'a mut FakeStatus {
    &mut *(status as *mut FakeStatus)
}

unsafe fn set_ok(status: *mut TF_Status) {
    let status = status_mut(status);
    status.code = TF_OK;
    status.message = Some(CString::default());
}

unsafe fn set_error(status: *mut TF_Status, code: c_int, message: &str) {
    let status = status_mut(status);
    status.code = code;
    status.message = Some(CString::new(message).unwrap());
}

fn add_bytes(dtype: TF_DataType, left: &[u8], right: &[u8]) -> Option<Vec<u8>> {
    macro_rules! sum {
        ($t:ty) => {{
            let l = <$t>::from_ne_bytes(left.try_into().ok()?);
            let r = <$t>::from_ne_bytes(right.try_into().ok()?);
            Some((l + r).to_ne_bytes().to_vec())
        }};
    }
    match dtype {
        TF_FLOAT => sum!(f32),
        TF_DOUBLE => sum!(f64),
        TF_INT32 => sum!(i32),
        TF_INT64 => sum!(i64),
        _ => None,
    }
}

impl TfApi for FakeTf {
    fn alloc_utf8(&self, value: &str) -> Result<*const c_char> {
        self.arena.alloc(value)
    }

    unsafe fn version(&self) -> *const c_char {
        self.record("TF_Version");
        c"2.18.0-fake".as_ptr()
    }

    unsafe fn new_status(&self) -> *mut TF_Status {
        self.record("TF_NewStatus");
        self.track(
            "status",
            FakeStatus {
                code: TF_OK,
                message: Some(CString::default()),
            },
        )
        .cast()
    }

    unsafe fn delete_status(&self, status: *mut TF_Status) {
        self.record("TF_DeleteStatus");
        self.untrack::<FakeStatus>("status", status.cast());
    }

    unsafe fn get_code(&self, status: *const TF_Status) -> c_int {
        self.assert_live("status", status.cast());
        (*(status as *const FakeStatus)).code
    }

    unsafe fn message(&self, status: *const TF_Status) -> *const c_char {
        self.assert_live("status", status.cast());
        (*(status as *const FakeStatus))
            .message
            .as_ref()
            .map_or(ptr::null(), |m| m.as_ptr())
    }

    unsafe fn new_graph(&self) -> *mut TF_Graph {
        self.record("TF_NewGraph");
        self.track("graph", FakeGraph { ops: Vec::new() }).cast()
    }

    unsafe fn delete_graph(&self, graph: *mut TF_Graph) {
        self.record("TF_DeleteGraph");
        self.untrack::<FakeGraph>("graph", graph.cast());
    }

    unsafe fn new_session_options(&self) -> *mut TF_SessionOptions {
        self.record("TF_NewSessionOptions");
        self.track(
            "session_options",
            FakeOptions {
                target: String::new(),
            },
        )
        .cast()
    }

    unsafe fn delete_session_options(&self, options: *mut TF_SessionOptions) {
        self.record("TF_DeleteSessionOptions");
        self.untrack::<FakeOptions>("session_options", options.cast());
    }

    unsafe fn new_session(
        &self,
        graph: *mut TF_Graph,
        options: *const TF_SessionOptions,
        status: *mut TF_Status,
    ) -> *mut TF_Session {
        self.record("TF_NewSession");
        self.assert_live("graph", graph.cast());
        self.assert_live("session_options", options.cast());
        set_ok(status);
        if self.fails(FailAt::NewSession) {
            set_error(status, INTERNAL, "no CPU device registered");
            return ptr::null_mut();
        }
        self.track("session", FakeSession { closed: false }).cast()
    }

    unsafe fn close_session(&self, session: *mut TF_Session, status: *mut TF_Status) {
        self.record("TF_CloseSession");
        self.assert_live("session", session.cast());
        set_ok(status);
        (*(session as *mut FakeSession)).closed = true;
        if self.fails(FailAt::CloseSession) {
            set_error(status, INTERNAL, "close failed");
        }
    }

    unsafe fn delete_session(&self, session: *mut TF_Session, status: *mut TF_Status) {
        self.record("TF_DeleteSession");
        set_ok(status);
        let session = self.untrack::<FakeSession>("session", session.cast());
        assert!(session.closed, "session deleted before it was closed");
    }

    unsafe fn new_operation(
        &self,
        graph: *mut TF_Graph,
        op_type: *const c_char,
        _oper_name: *const c_char,
    ) -> *mut TF_OperationDescription {
        self.record("TF_NewOperation");
        self.assert_live("graph", graph.cast());
        let op_type = CStr::from_ptr(op_type).to_string_lossy().into_owned();
        self.track(
            "operation_description",
            FakeDesc {
                graph: graph.cast(),
                op_type,
                dtype: None,
                value: None,
                inputs: Vec::new(),
            },
        )
        .cast()
    }

    unsafe fn set_attr_type(
        &self,
        desc: *mut TF_OperationDescription,
        _attr_name: *const c_char,
        value: TF_DataType,
    ) {
        self.record("TF_SetAttrType");
        self.assert_live("operation_description", desc.cast());
        (*(desc as *mut FakeDesc)).dtype = Some(value);
    }

    unsafe fn set_attr_tensor(
        &self,
        desc: *mut TF_OperationDescription,
        _attr_name: *const c_char,
        value: *mut TF_Tensor,
        status: *mut TF_Status,
    ) {
        self.record("TF_SetAttrTensor");
        self.assert_live("operation_description", desc.cast());
        self.assert_live("tensor", value.cast());
        set_ok(status);
        if self.fails(FailAt::SetAttrTensor) {
            set_error(status, INVALID_ARGUMENT, "tensor attr rejected");
            return;
        }
        let tensor = &*(value as *const FakeTensor);
        (*(desc as *mut FakeDesc)).value = Some((tensor.dtype, tensor.data.clone()));
    }

    unsafe fn add_input(&self, desc: *mut TF_OperationDescription, input: TfOutput) {
        self.record("TF_AddInput");
        self.assert_live("operation_description", desc.cast());
        (*(desc as *mut FakeDesc)).inputs.push(input);
    }

    unsafe fn finish_operation(
        &self,
        desc: *mut TF_OperationDescription,
        status: *mut TF_Status,
    ) -> *mut TF_Operation {
        self.record("TF_FinishOperation");
        set_ok(status);
        let desc = self.untrack::<FakeDesc>("operation_description", desc.cast());
        self.assert_live("graph", desc.graph as *const c_void);

        let op = match desc.op_type.as_str() {
            "Const" if self.fails(FailAt::FinishConst) => None,
            "Add" if self.fails(FailAt::FinishAdd) => None,
            "Const" => desc.value.clone().and_then(|(dtype, bytes)| {
                (desc.dtype == Some(dtype)).then_some(FakeOp { dtype, bytes })
            }),
            "Add" => match (desc.dtype, desc.inputs.as_slice()) {
                (Some(dtype), [left, right]) => {
                    let left = &*(left.oper as *const FakeOp);
                    let right = &*(right.oper as *const FakeOp);
                    add_bytes(dtype, &left.bytes, &right.bytes)
                        .map(|bytes| FakeOp { dtype, bytes })
                }
                _ => None,
            },
            _ => None,
        };

        match op {
            Some(op) => {
                let mut op = Box::new(op);
                let raw: *mut FakeOp = &mut *op;
                (*desc.graph).ops.push(op);
                raw.cast()
            }
            None => {
                set_error(
                    status,
                    INVALID_ARGUMENT,
                    &format!("{} could not be finished", desc.op_type),
                );
                ptr::null_mut()
            }
        }
    }

    unsafe fn allocate_tensor(
        &self,
        dtype: TF_DataType,
        _dims: *const i64,
        num_dims: c_int,
        len: usize,
    ) -> *mut TF_Tensor {
        self.record("TF_AllocateTensor");
        assert_eq!(num_dims, 0, "only scalars are allocated");
        if self.fails(FailAt::AllocateTensor) {
            return ptr::null_mut();
        }
        self.track(
            "tensor",
            FakeTensor {
                dtype,
                data: vec![0; len],
            },
        )
        .cast()
    }

    unsafe fn tensor_data(&self, tensor: *const TF_Tensor) -> *mut c_void {
        self.assert_live("tensor", tensor.cast());
        (*(tensor as *mut FakeTensor)).data.as_mut_ptr().cast()
    }

    unsafe fn delete_tensor(&self, tensor: *mut TF_Tensor) {
        self.record("TF_DeleteTensor");
        self.untrack::<FakeTensor>("tensor", tensor.cast());
    }

    unsafe fn session_run(
        &self,
        session: *mut TF_Session,
        _run_options: *const TF_Buffer,
        _inputs: *const TfOutput,
        _input_values: *const *mut TF_Tensor,
        ninputs: c_int,
        outputs: *const TfOutput,
        output_values: *mut *mut TF_Tensor,
        noutputs: c_int,
        _target_opers: *const *const TF_Operation,
        ntargets: c_int,
        _run_metadata: *mut TF_Buffer,
        status: *mut TF_Status,
    ) {
        self.record("TF_SessionRun");
        self.assert_live("session", session.cast());
        assert_eq!((ninputs, ntargets), (0, 0));
        set_ok(status);
        if self.fails(FailAt::SessionRun) {
            set_error(status, INVALID_ARGUMENT, "fetch is not in the graph");
            return;
        }
        for i in 0..noutputs as usize {
            let out = *outputs.add(i);
            assert_eq!(out.index, 0, "Const and Add have a single output");
            if self.fails(FailAt::NullOutput) {
                *output_values.add(i) = ptr::null_mut();
                continue;
            }
            let op = &*(out.oper as *const FakeOp);
            let tensor = self.track(
                "tensor",
                FakeTensor {
                    dtype: op.dtype,
                    data: op.bytes.clone(),
                },
            );
            *output_values.add(i) = tensor.cast();
        }
    }
}
