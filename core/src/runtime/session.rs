//! Session lifecycle and graph execution.

use std::ptr::{self, NonNull};

use tracing::{debug, warn};

use super::graph::{Graph, Operation};
use super::status::Status;
use super::tensor::{Element, Tensor};
use crate::error::{Result, TfError};
use crate::native::ffi::{TF_Graph, TF_Session, TF_SessionOptions, TF_Tensor};
use crate::native::TfApi;

/// Lifecycle of a [`Session`]. States only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    Created,
    OptionsSet,
    Open,
    Executed,
    Closed,
    Deleted,
}

struct SessionOptions<'a, A: TfApi + ?Sized> {
    api: &'a A,
    raw: NonNull<TF_SessionOptions>,
}

impl<A: TfApi + ?Sized> Drop for SessionOptions<'_, A> {
    fn drop(&mut self) {
        debug!("TF_DeleteSessionOptions({:p})", self.raw);
        // SAFETY: Created by TF_NewSessionOptions in `Session::open`; deleted only here.
        unsafe { self.api.delete_session_options(self.raw.as_ptr()) };
    }
}

/// A session bound to one graph.
///
/// Teardown is close, delete, then delete the options. [`Session::close`]
/// runs it with errors reported; dropping an unclosed session runs it with
/// errors logged.
pub struct Session<'s, A: TfApi + ?Sized> {
    api: &'s A,
    status: &'s Status<'s, A>,
    raw: Option<NonNull<TF_Session>>,
    graph: NonNull<TF_Graph>,
    // Declared after `raw` so the options outlive the session.
    _options: SessionOptions<'s, A>,
    state: SessionState,
}

impl<'s, A: TfApi + ?Sized> Session<'s, A> {
    /// Create options and open a session on `graph`.
    pub fn open(graph: &'s Graph<'s, A>, status: &'s Status<'s, A>) -> Result<Self> {
        let api = graph.api();
        let mut state = SessionState::Created;

        // SAFETY: TF_NewSessionOptions has no preconditions.
        let options = unsafe { api.new_session_options() };
        let options = NonNull::new(options)
            .ok_or_else(|| TfError::null_result("TF_NewSessionOptions"))?;
        let options = SessionOptions { api, raw: options };
        transition(&mut state, SessionState::OptionsSet);

        // SAFETY: Graph, options and status are live.
        let raw = unsafe { api.new_session(graph.as_ptr(), options.raw.as_ptr(), status.as_ptr()) };
        let mut session = Self {
            api,
            status,
            raw: NonNull::new(raw),
            graph: graph.raw(),
            _options: options,
            state,
        };
        status.raise_if_error("TF_NewSession")?;
        if session.raw.is_none() {
            return Err(TfError::null_result("TF_NewSession"));
        }
        transition(&mut session.state, SessionState::Open);
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the graph with no feeds and fetch output 0 of `output` as a scalar.
    ///
    /// The fetched tensor is deleted before this returns.
    pub fn run<T: Element>(&mut self, output: Operation<'_, T>) -> Result<T> {
        let raw = self.live("TF_SessionRun")?;
        if self.state != SessionState::Open {
            return Err(TfError::InvalidState {
                action: "TF_SessionRun".to_string(),
                state: format!("{:?}", self.state),
            });
        }
        output.check_graph(self.graph, "TF_SessionRun")?;

        let outputs = [output.output(0)];
        let mut output_values: [*mut TF_Tensor; 1] = [ptr::null_mut()];
        // SAFETY: One output descriptor and one writable tensor slot; every
        // optional argument is null with a zero count.
        unsafe {
            self.api.session_run(
                raw.as_ptr(),
                ptr::null(),
                ptr::null(),
                ptr::null(),
                0,
                outputs.as_ptr(),
                output_values.as_mut_ptr(),
                1,
                ptr::null(),
                0,
                ptr::null_mut(),
                self.status.as_ptr(),
            )
        };
        transition(&mut self.state, SessionState::Executed);

        // Own the result before checking the status so it is freed on every path.
        let tensor = Tensor::from_raw(self.api, output_values[0], T::DTYPE);
        self.status.raise_if_error("TF_SessionRun")?;
        let tensor =
            tensor.ok_or_else(|| TfError::null_result("TF_SessionRun output tensor"))?;
        let value = tensor.read_scalar::<T>()?;
        tensor.delete();
        Ok(value)
    }

    /// Close and delete the session, then its options. The first failure is returned.
    pub fn close(mut self) -> Result<()> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<()> {
        let Some(raw) = self.raw else {
            return Ok(());
        };

        let mut closed = Ok(());
        if self.state < SessionState::Closed {
            // SAFETY: The session is live and not yet closed.
            unsafe { self.api.close_session(raw.as_ptr(), self.status.as_ptr()) };
            closed = self.status.raise_if_error("TF_CloseSession");
            transition(&mut self.state, SessionState::Closed);
        }

        // SAFETY: Closed above; deleted exactly once because `raw` is cleared.
        unsafe { self.api.delete_session(raw.as_ptr(), self.status.as_ptr()) };
        self.raw = None;
        let deleted = self.status.raise_if_error("TF_DeleteSession");
        transition(&mut self.state, SessionState::Deleted);

        closed.and(deleted)
    }

    fn live(&self, action: &str) -> Result<NonNull<TF_Session>> {
        self.raw.ok_or_else(|| TfError::null_result(action))
    }
}

impl<A: TfApi + ?Sized> Drop for Session<'_, A> {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            warn!("Session teardown failed: {}", err);
        }
    }
}

fn transition(state: &mut SessionState, next: SessionState) {
    debug_assert!(next > *state, "session state {:?} -> {:?}", state, next);
    debug!("Session {:?} -> {:?}", state, next);
    *state = next;
}

/// Execute `graph` and fetch output 0 of `output` as a scalar `T`.
///
/// The session is torn down on every path. A run failure takes precedence
/// over a teardown failure, which is then only logged.
pub fn run_graph<'s, A, T>(
    graph: &'s Graph<'s, A>,
    status: &'s Status<'s, A>,
    output: Operation<'_, T>,
) -> Result<T>
where
    A: TfApi + ?Sized,
    T: Element,
{
    let mut session = Session::open(graph, status)?;
    let result = session.run(output);
    let closed = session.close();

    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            warn!("Ignoring session teardown error after failed run: {}", close_err);
            Err(err)
        }
    }
}
