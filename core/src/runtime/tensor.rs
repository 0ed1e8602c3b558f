//! Scalar tensors and their element types.

use std::fmt;
use std::mem;
use std::ptr::{self, NonNull};

use tracing::debug;

use crate::error::{Result, TfError};
use crate::native::ffi::{TF_DataType, TF_Tensor, TF_DOUBLE, TF_FLOAT, TF_INT32, TF_INT64};
use crate::native::TfApi;

/// Rust scalar with a TensorFlow element type.
pub trait Element: Copy + fmt::Debug + 'static {
    /// `TF_DataType` code.
    const DTYPE: TF_DataType;
}

impl Element for f32 {
    const DTYPE: TF_DataType = TF_FLOAT;
}

impl Element for f64 {
    const DTYPE: TF_DataType = TF_DOUBLE;
}

impl Element for i32 {
    const DTYPE: TF_DataType = TF_INT32;
}

impl Element for i64 {
    const DTYPE: TF_DataType = TF_INT64;
}

/// Unique owner of a `TF_Tensor`; `TF_DeleteTensor` runs on drop.
pub struct Tensor<'a, A: TfApi + ?Sized> {
    api: &'a A,
    raw: NonNull<TF_Tensor>,
    dtype: TF_DataType,
}

impl<'a, A: TfApi + ?Sized> Tensor<'a, A> {
    /// Allocate a rank-0 tensor holding `value`.
    pub fn scalar<T: Element>(api: &'a A, value: T) -> Result<Self> {
        // SAFETY: Zero dims with a null dims pointer describes a scalar; the
        // byte length matches one element of `T::DTYPE`.
        let raw = unsafe { api.allocate_tensor(T::DTYPE, ptr::null(), 0, mem::size_of::<T>()) };
        let tensor = Self::from_raw(api, raw, T::DTYPE)
            .ok_or_else(|| TfError::null_result("TF_AllocateTensor"))?;
        tensor.write_scalar(value)?;
        Ok(tensor)
    }

    /// Take ownership of a tensor returned by the library. `None` for null.
    ///
    /// `dtype` must be the element type the library produced; reads are
    /// bounds-checked against it.
    pub(crate) fn from_raw(api: &'a A, raw: *mut TF_Tensor, dtype: TF_DataType) -> Option<Self> {
        let raw = NonNull::new(raw)?;
        debug!("Tensor {:p} owned (dtype {})", raw, dtype);
        Some(Self { api, raw, dtype })
    }

    pub fn as_ptr(&self) -> *mut TF_Tensor {
        self.raw.as_ptr()
    }

    pub fn dtype(&self) -> TF_DataType {
        self.dtype
    }

    /// Read the first element as `T`. Fails unless `T` is the tensor's element type.
    pub fn read_scalar<T: Element>(&self) -> Result<T> {
        if T::DTYPE != self.dtype {
            return Err(TfError::DtypeMismatch {
                expected: T::DTYPE,
                actual: self.dtype,
            });
        }
        let data = self.data()?;
        // SAFETY: The buffer holds at least one element of `self.dtype`, which
        // is `T`. TF buffers are aligned, but unaligned reads keep this
        // independent of that.
        Ok(unsafe { data.cast::<T>().as_ptr().read_unaligned() })
    }

    fn write_scalar<T: Element>(&self, value: T) -> Result<()> {
        let data = self.data()?;
        // SAFETY: `scalar` allocated exactly `size_of::<T>()` bytes.
        unsafe { data.cast::<T>().as_ptr().write_unaligned(value) };
        Ok(())
    }

    fn data(&self) -> Result<NonNull<std::ffi::c_void>> {
        // SAFETY: `raw` is a live tensor owned by `self`.
        let data = unsafe { self.api.tensor_data(self.raw.as_ptr()) };
        NonNull::new(data).ok_or_else(|| TfError::null_result("TF_TensorData"))
    }

    /// Delete the native tensor now.
    pub fn delete(self) {}
}

impl<A: TfApi + ?Sized> Drop for Tensor<'_, A> {
    fn drop(&mut self) {
        debug!("TF_DeleteTensor({:p})", self.raw);
        // SAFETY: Owned exclusively by `self`; deleted only here.
        unsafe { self.api.delete_tensor(self.raw.as_ptr()) };
    }
}
