//! FFI bindings for the proctoring engine
//!
//! This module provides C-compatible functions for driving an engine from other
//! languages. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `proctor_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::EngineConfig;
use crate::engine::ProctoringEngine;
use crate::error::ProctorError;
use crate::report::ReportBuilder;
use crate::types::{FrameSignal, Recording};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Stable integer codes for engine errors
fn error_code(e: &ProctorError) -> i32 {
    match e {
        ProctorError::InvalidInput(_) => -2,
        ProctorError::SessionAlreadyActive => -3,
        ProctorError::NoActiveSession => -4,
        _ => -1,
    }
}

// ============================================================================
// Engine Lifecycle
// ============================================================================

/// Opaque handle to a ProctoringEngine
pub struct ProctorEngineHandle {
    engine: ProctoringEngine,
}

/// Create a new engine.
///
/// # Safety
/// - `config_json` may be NULL (defaults) or a valid null-terminated C string.
/// - Returns a pointer that must be freed with `proctor_engine_free`.
/// - Returns NULL on error; call `proctor_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn proctor_engine_new(config_json: *const c_char) -> *mut ProctorEngineHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        EngineConfig::default()
    } else {
        let json = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        };
        match EngineConfig::from_json(&json) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    match ProctoringEngine::with_config(config) {
        Ok(engine) => Box::into_raw(Box::new(ProctorEngineHandle { engine })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free an engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `proctor_engine_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn proctor_engine_free(engine: *mut ProctorEngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Start a session.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `proctor_engine_new`.
/// - `candidate_label` must be a valid null-terminated C string.
/// - Returns 0 on success; -2 for an empty label, -3 if a session is already
///   active, -1 for other errors. Call `proctor_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn proctor_engine_start(
    engine: *mut ProctorEngineHandle,
    candidate_label: *const c_char,
) -> i32 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    let handle = &mut *engine;

    let label = match cstr_to_string(candidate_label) {
        Some(s) => s,
        None => {
            set_last_error("Invalid candidate label pointer");
            return -1;
        }
    };

    match handle.engine.start(&label) {
        Ok(_) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            error_code(&e)
        }
    }
}

/// Analyze one frame signal and return the newly emitted events as a JSON array.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `proctor_engine_new`.
/// - `signal_json` must be a valid null-terminated C string holding a frame signal.
/// - Returns a newly allocated string that must be freed with `proctor_free_string`.
/// - Returns NULL on error; call `proctor_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn proctor_engine_analyze_frame(
    engine: *mut ProctorEngineHandle,
    signal_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &mut *engine;

    let json_str = match cstr_to_string(signal_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let signal: FrameSignal = match serde_json::from_str(&json_str) {
        Ok(signal) => signal,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let events = handle.engine.analyze_frame(&signal);
    match serde_json::to_string(&events) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// End the active session and return its report as JSON.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `proctor_engine_new`.
/// - `recording` may be NULL; otherwise it must point to `recording_len` readable bytes.
/// - `recording_mime` may be NULL (treated as "application/octet-stream").
/// - Returns a newly allocated string that must be freed with `proctor_free_string`.
/// - Returns NULL on error; call `proctor_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn proctor_engine_end(
    engine: *mut ProctorEngineHandle,
    recording: *const u8,
    recording_len: usize,
    recording_mime: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &mut *engine;

    let result = if recording.is_null() {
        handle.engine.end()
    } else {
        let recording = Recording {
            bytes: std::slice::from_raw_parts(recording, recording_len).to_vec(),
            mime_type: cstr_to_string(recording_mime)
                .unwrap_or_else(|| "application/octet-stream".to_string()),
        };
        handle.engine.end_with_recording(&recording)
    };

    match result.and_then(|closed| ReportBuilder::build_json(&closed)) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Live integrity score of the active session (100 when idle), or -1 on error.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `proctor_engine_new`.
#[no_mangle]
pub unsafe extern "C" fn proctor_engine_integrity_score(engine: *const ProctorEngineHandle) -> i32 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    i32::from((*engine).engine.integrity_score())
}

/// Running event counts per kind as a JSON object.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `proctor_engine_new`.
/// - Returns a newly allocated string that must be freed with `proctor_free_string`.
/// - Returns NULL on error; call `proctor_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn proctor_engine_event_counts(
    engine: *const ProctorEngineHandle,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    match serde_json::to_string(&(*engine).engine.event_counts()) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by engine functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an engine function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn proctor_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next engine function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn proctor_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn proctor_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
