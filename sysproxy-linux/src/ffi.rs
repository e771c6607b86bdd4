//! C ABI for linking sysproxy-linux as a static library from a C/C++ host.
//! The host creates one handle at startup, calls `sysproxy_restore_pending`, and
//! `sysproxy_reset` before exit. Calls block while external tools run.

use std::ffi::{c_void, CStr};
use std::os::raw::{c_char, c_int};
use std::panic::{catch_unwind, AssertUnwindSafe};

use sysproxy_core::{ProxyConfig, SNAPSHOT_VERSION};

use crate::config;
use crate::system::{self, SystemCoordinator};

/// Snapshot format version written by this library.
#[no_mangle]
pub extern "C" fn sysproxy_snapshot_version() -> c_int {
    SNAPSHOT_VERSION as c_int
}

fn into_handle(coordinator: SystemCoordinator) -> *mut c_void {
    Box::into_raw(Box::new(coordinator)) as *mut c_void
}

/// Run `f` against the handle. -1 if h is null, 0 if `f` panicked.
fn with_handle(h: *mut c_void, f: impl FnOnce(&SystemCoordinator) -> c_int) -> c_int {
    if h.is_null() {
        return -1;
    }
    let coordinator = unsafe { &*(h as *const SystemCoordinator) };
    catch_unwind(AssertUnwindSafe(|| f(coordinator))).unwrap_or_else(|_| {
        tracing::error!("panic inside sysproxy call");
        0
    })
}

/// Borrow a C string. Null or non-UTF-8 gives None.
unsafe fn c_str<'a>(p: *const c_char) -> Option<&'a str> {
    if p.is_null() {
        return None;
    }
    CStr::from_ptr(p).to_str().ok()
}

/// Create a coordinator using the default config files. Returns opaque handle or null on failure.
#[no_mangle]
pub extern "C" fn sysproxy_create() -> *mut c_void {
    let built = catch_unwind(|| {
        let cfg = config::load(None).unwrap_or_else(|e| {
            tracing::warn!(error = %format!("{:#}", e), "using default configuration");
            config::Config::default()
        });
        system::coordinator(&cfg)
    });
    match built {
        Ok(coordinator) => into_handle(coordinator),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Destroy a handle. No-op if h is null. Does not reset the proxy.
#[no_mangle]
pub extern "C" fn sysproxy_destroy(h: *mut c_void) {
    if h.is_null() {
        return;
    }
    let _ = unsafe { Box::from_raw(h as *mut SystemCoordinator) };
}

/// Apply a system proxy. `scheme` and `no_proxy` may be null.
/// Returns 1 on success, 0 for invalid input, -1 if h is null.
#[no_mangle]
pub extern "C" fn sysproxy_apply(
    h: *mut c_void,
    host: *const c_char,
    port: c_int,
    scheme: *const c_char,
    no_proxy: *const c_char,
) -> c_int {
    with_handle(h, |coordinator| {
        let Some(host) = (unsafe { c_str(host) }) else {
            tracing::warn!("sysproxy_apply: host is null or not UTF-8");
            return 0;
        };
        let scheme = unsafe { c_str(scheme) }.unwrap_or_default();
        let no_proxy = unsafe { c_str(no_proxy) }.unwrap_or_default();
        let cfg = ProxyConfig::new(host, i64::from(port), scheme, no_proxy);
        c_int::from(coordinator.apply_system_proxy(&cfg))
    })
}

/// Restore the settings captured by the last apply. Returns 1, 0 on panic, -1 if h is null.
#[no_mangle]
pub extern "C" fn sysproxy_reset(h: *mut c_void) -> c_int {
    with_handle(h, |coordinator| {
        coordinator.reset_system_proxy();
        1
    })
}

/// Restore a snapshot left by a crashed session. Call once at startup.
/// Returns 1, 0 on panic, -1 if h is null.
#[no_mangle]
pub extern "C" fn sysproxy_restore_pending(h: *mut c_void) -> c_int {
    with_handle(h, |coordinator| {
        coordinator.restore_pending_snapshot();
        1
    })
}

/// 1 if a proxy is applied, 0 if not, -1 if h is null.
#[no_mangle]
pub extern "C" fn sysproxy_is_applied(h: *mut c_void) -> c_int {
    with_handle(h, |coordinator| c_int::from(coordinator.is_applied()))
}
