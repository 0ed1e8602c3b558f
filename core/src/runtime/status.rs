//! Scoped ownership of a `TF_Status`.

use std::ptr::NonNull;

use tracing::debug;

use crate::error::{Result, TfError};
use crate::native::binding::read_cstring;
use crate::native::ffi::{TF_Status, TF_OK};
use crate::native::TfApi;

const UNREADABLE_MESSAGE: &str = "<failed to read TF_Status message>";

/// Native status object, deleted exactly once when dropped or released.
pub struct Status<'a, A: TfApi + ?Sized> {
    api: &'a A,
    raw: NonNull<TF_Status>,
}

impl<'a, A: TfApi + ?Sized> Status<'a, A> {
    /// Allocate a fresh status.
    pub fn create(api: &'a A) -> Result<Self> {
        // SAFETY: TF_NewStatus has no preconditions.
        let raw = unsafe { api.new_status() };
        let raw = NonNull::new(raw).ok_or_else(|| TfError::null_result("TF_NewStatus"))?;
        debug!("TF_NewStatus -> {:p}", raw);
        Ok(Self { api, raw })
    }

    pub fn api(&self) -> &'a A {
        self.api
    }

    /// Raw pointer for passing into native calls. Stays owned by `self`.
    pub fn as_ptr(&self) -> *mut TF_Status {
        self.raw.as_ptr()
    }

    /// Current status code; `0` is `TF_OK`.
    pub fn code(&self) -> i32 {
        // SAFETY: `raw` is a live status owned by `self`.
        unsafe { self.api.get_code(self.raw.as_ptr()) }
    }

    /// Fail with [`TfError::NativeCall`] unless the last call through this status succeeded.
    pub fn raise_if_error(&self, action: &str) -> Result<()> {
        let code = self.code();
        if code == TF_OK {
            return Ok(());
        }
        Err(TfError::native_call(action, code, self.message()))
    }

    /// Message attached to the status; a placeholder if the library returns none.
    pub fn message(&self) -> String {
        // SAFETY: `raw` is live, and TF_Message returns a buffer owned by the
        // status that stays valid until the status is next modified.
        unsafe { read_cstring(self.api.message(self.raw.as_ptr())) }
            .unwrap_or_else(|| UNREADABLE_MESSAGE.to_string())
    }

    /// Delete the native status.
    pub fn release(self) {}
}

impl<A: TfApi + ?Sized> Drop for Status<'_, A> {
    fn drop(&mut self) {
        debug!("TF_DeleteStatus({:p})", self.raw);
        // SAFETY: Created by TF_NewStatus in `create` and deleted only here.
        unsafe { self.api.delete_status(self.raw.as_ptr()) };
    }
}
