//! Runtime binding of the TensorFlow C API.
//!
//! [`BindingTable`] opens the located shared libraries with `libloading`,
//! resolves every entry point the crate uses up front, and owns the arena
//! that backs strings handed to native code.

use std::cell::RefCell;
use std::ffi::{c_char, c_void, CStr, CString};
use std::mem;
use std::path::Path;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};

use libloading::Library;
use tracing::{debug, info};

use super::ffi::*;
use super::locator::{self, Libraries, Platform};
use crate::error::{Result, TfError};

/// Source of raw symbol addresses.
pub trait SymbolLookup {
    /// Address of `name`, or `None` when no source exports it.
    fn find(&self, name: &CStr) -> Option<NonNull<c_void>>;
}

/// Ordered chain of opened libraries; earlier entries win.
pub struct LibrarySet {
    libs: Vec<Library>,
}

impl LibrarySet {
    /// Open `libraries`. The chain resolves from the main library, then the framework
    /// library, then symbols already visible in the process.
    pub fn open(libraries: &Libraries) -> Result<Self> {
        // The framework goes in first so the main library's dependency on it resolves.
        let framework = libraries
            .framework
            .as_deref()
            .map(open_dependency)
            .transpose()?;
        let main = open_library(&libraries.tensorflow)?;

        let mut libs = vec![main];
        libs.extend(framework);
        if let Some(process) = process_symbols() {
            libs.push(process);
        }
        Ok(Self { libs })
    }
}

impl SymbolLookup for LibrarySet {
    fn find(&self, name: &CStr) -> Option<NonNull<c_void>> {
        self.libs.iter().find_map(|lib| {
            // SAFETY: The symbol is only read as an address here; callers assign it a type.
            let symbol = unsafe { lib.get::<*mut c_void>(name.to_bytes_with_nul()) }.ok()?;
            NonNull::new(*symbol)
        })
    }
}

fn open_library(path: &Path) -> Result<Library> {
    debug!("Opening {}", path.display());
    // SAFETY: Loading libtensorflow runs its static initializers, which have no
    // preconditions on the host process.
    unsafe { Library::new(path) }.map_err(|source| TfError::LibraryOpen {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(unix)]
fn open_dependency(path: &Path) -> Result<Library> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_NOW};

    debug!("Opening {} (global)", path.display());
    // SAFETY: Same as `open_library`; RTLD_GLOBAL only widens symbol visibility.
    unsafe { UnixLibrary::open(Some(path), RTLD_NOW | RTLD_GLOBAL) }
        .map(Library::from)
        .map_err(|source| TfError::LibraryOpen {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(not(unix))]
fn open_dependency(path: &Path) -> Result<Library> {
    open_library(path)
}

#[cfg(unix)]
fn process_symbols() -> Option<Library> {
    Some(libloading::os::unix::Library::this().into())
}

#[cfg(windows)]
fn process_symbols() -> Option<Library> {
    libloading::os::windows::Library::this().ok().map(Library::from)
}

#[cfg(not(any(unix, windows)))]
fn process_symbols() -> Option<Library> {
    None
}

/// Resolved entry points.
pub struct CFunctions {
    pub tf_version: TfVersionFn,

    pub tf_new_status: TfNewStatusFn,
    pub tf_delete_status: TfDeleteStatusFn,
    pub tf_get_code: TfGetCodeFn,
    pub tf_message: TfMessageFn,

    pub tf_new_graph: TfNewGraphFn,
    pub tf_delete_graph: TfDeleteGraphFn,
    pub tf_new_session_options: TfNewSessionOptionsFn,
    pub tf_delete_session_options: TfDeleteSessionOptionsFn,
    pub tf_new_session: TfNewSessionFn,
    pub tf_close_session: TfCloseSessionFn,
    pub tf_delete_session: TfDeleteSessionFn,

    pub tf_new_operation: TfNewOperationFn,
    pub tf_set_attr_type: TfSetAttrTypeFn,
    pub tf_set_attr_tensor: TfSetAttrTensorFn,
    pub tf_add_input: TfAddInputFn,
    pub tf_finish_operation: TfFinishOperationFn,

    pub tf_allocate_tensor: TfAllocateTensorFn,
    pub tf_tensor_data: TfTensorDataFn,
    pub tf_delete_tensor: TfDeleteTensorFn,

    pub tf_session_run: TfSessionRunFn,
}

impl CFunctions {
    /// Resolve every entry point, failing on the first one `lookup` cannot find.
    ///
    /// # Safety
    ///
    /// Every address `lookup` returns must be a function with the C signature
    /// declared for that name in [`super::ffi`].
    pub unsafe fn bind<L: SymbolLookup + ?Sized>(lookup: &L) -> Result<Self> {
        Ok(Self {
            tf_version: load_symbol(lookup, c"TF_Version")?,

            tf_new_status: load_symbol(lookup, c"TF_NewStatus")?,
            tf_delete_status: load_symbol(lookup, c"TF_DeleteStatus")?,
            tf_get_code: load_symbol(lookup, c"TF_GetCode")?,
            tf_message: load_symbol(lookup, c"TF_Message")?,

            tf_new_graph: load_symbol(lookup, c"TF_NewGraph")?,
            tf_delete_graph: load_symbol(lookup, c"TF_DeleteGraph")?,
            tf_new_session_options: load_symbol(lookup, c"TF_NewSessionOptions")?,
            tf_delete_session_options: load_symbol(lookup, c"TF_DeleteSessionOptions")?,
            tf_new_session: load_symbol(lookup, c"TF_NewSession")?,
            tf_close_session: load_symbol(lookup, c"TF_CloseSession")?,
            tf_delete_session: load_symbol(lookup, c"TF_DeleteSession")?,

            tf_new_operation: load_symbol(lookup, c"TF_NewOperation")?,
            tf_set_attr_type: load_symbol(lookup, c"TF_SetAttrType")?,
            tf_set_attr_tensor: load_symbol(lookup, c"TF_SetAttrTensor")?,
            tf_add_input: load_symbol(lookup, c"TF_AddInput")?,
            tf_finish_operation: load_symbol(lookup, c"TF_FinishOperation")?,

            tf_allocate_tensor: load_symbol(lookup, c"TF_AllocateTensor")?,
            tf_tensor_data: load_symbol(lookup, c"TF_TensorData")?,
            tf_delete_tensor: load_symbol(lookup, c"TF_DeleteTensor")?,

            tf_session_run: load_symbol(lookup, c"TF_SessionRun")?,
        })
    }
}

/// # Safety
///
/// `T` must be the function pointer type matching the symbol's C signature.
unsafe fn load_symbol<T: Copy, L: SymbolLookup + ?Sized>(lookup: &L, name: &CStr) -> Result<T> {
    debug_assert_eq!(mem::size_of::<T>(), mem::size_of::<*mut c_void>());
    let addr = lookup
        .find(name)
        .ok_or_else(|| TfError::missing_symbol(name.to_string_lossy()))?;
    Ok(mem::transmute_copy::<*mut c_void, T>(&addr.as_ptr()))
}

/// Owner of C strings passed into native calls.
///
/// Grows monotonically; pointers stay valid until the arena is dropped.
#[derive(Debug, Default)]
pub struct Utf8Arena {
    strings: RefCell<Vec<CString>>,
}

impl Utf8Arena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `value` into a NUL-terminated buffer owned by the arena.
    pub fn alloc(&self, value: &str) -> Result<*const c_char> {
        let owned = CString::new(value)
            .map_err(|_| TfError::marshal(format!("interior NUL byte in {:?}", value)))?;
        // The CString's heap buffer does not move when the Vec reallocates.
        let ptr = owned.as_ptr();
        self.strings.borrow_mut().push(owned);
        Ok(ptr)
    }

    /// Number of strings allocated so far.
    pub fn len(&self) -> usize {
        self.strings.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.borrow().is_empty()
    }
}

/// Decode a NUL-terminated native string. Returns `None` for a null pointer.
///
/// # Safety
///
/// A non-null `ptr` must point at a NUL-terminated buffer that stays valid for
/// the duration of the call.
pub unsafe fn read_cstring(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

static LOADED: AtomicBool = AtomicBool::new(false);

/// Marks the process-wide library state as taken until dropped.
#[derive(Debug)]
struct LoadGuard(());

impl LoadGuard {
    fn acquire() -> Result<Self> {
        LOADED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(()))
            .map_err(|_| TfError::AlreadyLoaded)
    }
}

impl Drop for LoadGuard {
    fn drop(&mut self) {
        LOADED.store(false, Ordering::Release);
    }
}

/// The loaded TensorFlow C API.
///
/// At most one table exists per process. Dropping it (or calling
/// [`BindingTable::close`]) frees the string arena and unmaps the libraries.
pub struct BindingTable {
    fns: CFunctions,
    arena: Utf8Arena,
    libraries: Libraries,
    _libs: LibrarySet,
    _guard: LoadGuard,
}

impl BindingTable {
    /// Load using the home from `TENSORFLOW_HOME`.
    pub fn load() -> Result<Self> {
        Self::load_from_home(&locator::resolve_home(None)?)
    }

    /// Load the libraries found under `home`.
    pub fn load_from_home(home: &Path) -> Result<Self> {
        let libraries = locator::resolve_libraries(home, Platform::current())?;
        Self::open(libraries)
    }

    /// Open already-resolved libraries and bind the C API.
    pub fn open(libraries: Libraries) -> Result<Self> {
        let guard = LoadGuard::acquire()?;
        let libs = LibrarySet::open(&libraries)?;
        // SAFETY: The chain is rooted at libtensorflow, whose exports match the
        // signatures declared in `ffi`.
        let fns = unsafe { CFunctions::bind(&libs)? };
        info!("TensorFlow C API bound from {}", libraries.tensorflow.display());
        Ok(Self {
            fns,
            arena: Utf8Arena::new(),
            libraries,
            _libs: libs,
            _guard: guard,
        })
    }

    /// Paths this table was loaded from.
    pub fn libraries(&self) -> &Libraries {
        &self.libraries
    }

    pub(crate) fn fns(&self) -> &CFunctions {
        &self.fns
    }

    pub(crate) fn arena(&self) -> &Utf8Arena {
        &self.arena
    }

    /// Decode a native string; see [`read_cstring`].
    ///
    /// # Safety
    ///
    /// Same contract as [`read_cstring`].
    pub unsafe fn read_cstring(&self, ptr: *const c_char) -> Option<String> {
        read_cstring(ptr)
    }

    /// Release the arena and unmap the libraries. Must be the last native action.
    pub fn close(self) {
        info!(
            "Closing TensorFlow binding table ({} arena strings)",
            self.arena.len()
        );
        drop(self);
    }
}
