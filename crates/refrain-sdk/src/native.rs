// SPDX-License-Identifier: GPL-3.0-or-later

//! [`NativeEngine`] backed by the linked `pexsdk` C library.

use std::ffi::{c_char, c_int, c_void, CStr};
use std::ptr;

use crate::engine::{Handle, NativeEngine, ResourceKind};
use crate::status::{Status, StatusCode};

const INIT_MESSAGE_LEN: usize = 100;

#[link(name = "pexsdk")]
extern "C" {
    fn Pex_Init(
        client_id: *const c_char,
        client_secret: *const c_char,
        status_code: *mut c_int,
        status_message: *mut c_char,
        status_message_size: usize,
    );
    fn Pex_Cleanup();
    fn Pex_Lock();
    fn Pex_Unlock();

    fn Pex_Status_New() -> *mut c_void;
    fn Pex_Status_Delete(status: *mut *mut c_void);
    fn Pex_Status_GetCode(status: *const c_void) -> c_int;
    fn Pex_Status_GetMessage(status: *const c_void) -> *const c_char;

    fn Pex_Client_New() -> *mut c_void;
    fn Pex_Client_Init(
        client: *mut c_void,
        client_type: c_int,
        client_id: *const c_char,
        client_secret: *const c_char,
        status: *mut c_void,
    );
    fn Pex_Client_Delete(client: *mut *mut c_void);

    fn Pex_Buffer_New() -> *mut c_void;
    fn Pex_Buffer_Delete(buffer: *mut *mut c_void);
    fn Pex_Buffer_Set(buffer: *mut c_void, data: *const c_void, size: usize);

    fn Pex_StartSearchRequest_New() -> *mut c_void;
    fn Pex_StartSearchRequest_Delete(request: *mut *mut c_void);
    fn Pex_StartSearchRequest_SetISRC(request: *mut c_void, isrc: *const c_char, types: c_int);
    fn Pex_StartSearchRequest_SetFingerprint(
        request: *mut c_void,
        buffer: *const c_void,
        status: *mut c_void,
    );
    fn Pex_StartSearchRequest_SetType(request: *mut c_void, search_type: c_int);

    fn Pex_StartSearchResult_New() -> *mut c_void;
    fn Pex_StartSearchResult_Delete(result: *mut *mut c_void);
    fn Pex_StartSearchResult_NextLookupID(
        result: *const c_void,
        index: *mut usize,
        lookup_id: *mut *const c_char,
    ) -> bool;

    fn Pex_StartSearch(
        client: *mut c_void,
        request: *const c_void,
        result: *mut c_void,
        status: *mut c_void,
    );

    fn Pex_CheckSearchRequest_New() -> *mut c_void;
    fn Pex_CheckSearchRequest_Delete(request: *mut *mut c_void);
    fn Pex_CheckSearchRequest_AddLookupID(request: *mut c_void, lookup_id: *const c_char);

    fn Pex_CheckSearchResult_New() -> *mut c_void;
    fn Pex_CheckSearchResult_Delete(result: *mut *mut c_void);
    fn Pex_CheckSearchResult_GetJSON(result: *const c_void) -> *const c_char;

    fn Pex_CheckSearch(
        client: *mut c_void,
        request: *const c_void,
        result: *mut c_void,
        status: *mut c_void,
    );
}

fn ptr_of(handle: Handle) -> *mut c_void {
    handle.as_raw() as *mut c_void
}

fn handle_of(ptr: *mut c_void) -> Option<Handle> {
    Handle::from_raw(ptr as usize)
}

/// Copy a C string owned by the engine; null reads as empty.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for the duration of the call.
unsafe fn owned_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

/// The engine library linked into this binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkedEngine;

impl NativeEngine for LinkedEngine {
    fn init(&self, client_id: &CStr, client_secret: &CStr) -> Result<(), Status> {
        let mut code: c_int = 0;
        let mut message = [0 as c_char; INIT_MESSAGE_LEN];

        // SAFETY: both strings are NUL-terminated and the message buffer
        // length is passed alongside it.
        unsafe {
            Pex_Init(
                client_id.as_ptr(),
                client_secret.as_ptr(),
                &mut code,
                message.as_mut_ptr(),
                message.len(),
            );
        }

        let code = StatusCode::from_raw(code);
        if code == StatusCode::Ok {
            return Ok(());
        }

        message[INIT_MESSAGE_LEN - 1] = 0;
        // SAFETY: the buffer is NUL-terminated by the line above.
        let message = unsafe { owned_string(message.as_ptr()) };
        Err(Status::new(code, message))
    }

    fn cleanup(&self) {
        // SAFETY: no preconditions.
        unsafe { Pex_Cleanup() }
    }

    fn lock(&self) {
        // SAFETY: no preconditions.
        unsafe { Pex_Lock() }
    }

    fn unlock(&self) {
        // SAFETY: paired with `lock` by `EngineLock`.
        unsafe { Pex_Unlock() }
    }

    fn alloc(&self, kind: ResourceKind) -> Option<Handle> {
        // SAFETY: constructors have no preconditions and may return null.
        let ptr = unsafe {
            match kind {
                ResourceKind::Status => Pex_Status_New(),
                ResourceKind::Client => Pex_Client_New(),
                ResourceKind::StartSearchRequest => Pex_StartSearchRequest_New(),
                ResourceKind::StartSearchResult => Pex_StartSearchResult_New(),
                ResourceKind::CheckSearchRequest => Pex_CheckSearchRequest_New(),
                ResourceKind::CheckSearchResult => Pex_CheckSearchResult_New(),
                ResourceKind::Buffer => Pex_Buffer_New(),
            }
        };
        handle_of(ptr)
    }

    fn free(&self, kind: ResourceKind, handle: Handle) {
        let mut ptr = ptr_of(handle);
        // SAFETY: `handle` came from `alloc` with the same kind and is freed
        // exactly once by its guard or owning client.
        unsafe {
            match kind {
                ResourceKind::Status => Pex_Status_Delete(&mut ptr),
                ResourceKind::Client => Pex_Client_Delete(&mut ptr),
                ResourceKind::StartSearchRequest => Pex_StartSearchRequest_Delete(&mut ptr),
                ResourceKind::StartSearchResult => Pex_StartSearchResult_Delete(&mut ptr),
                ResourceKind::CheckSearchRequest => Pex_CheckSearchRequest_Delete(&mut ptr),
                ResourceKind::CheckSearchResult => Pex_CheckSearchResult_Delete(&mut ptr),
                ResourceKind::Buffer => Pex_Buffer_Delete(&mut ptr),
            }
        }
    }

    fn status(&self, status: Handle) -> Status {
        // SAFETY: `status` is a live status handle; the message pointer is
        // copied before any further engine call.
        unsafe {
            let code = StatusCode::from_raw(Pex_Status_GetCode(ptr_of(status)));
            let message = owned_string(Pex_Status_GetMessage(ptr_of(status)));
            Status::new(code, message)
        }
    }

    fn client_init(
        &self,
        client: Handle,
        client_type: i32,
        client_id: &CStr,
        client_secret: &CStr,
        status: Handle,
    ) {
        // SAFETY: live handles and NUL-terminated strings.
        unsafe {
            Pex_Client_Init(
                ptr_of(client),
                client_type,
                client_id.as_ptr(),
                client_secret.as_ptr(),
                ptr_of(status),
            )
        }
    }

    fn buffer_set(&self, buffer: Handle, bytes: &[u8]) {
        // SAFETY: the engine copies `bytes.len()` bytes out of the slice.
        unsafe { Pex_Buffer_Set(ptr_of(buffer), bytes.as_ptr().cast(), bytes.len()) }
    }

    fn set_isrc(&self, request: Handle, isrc: &CStr, match_types: u32) {
        // SAFETY: live handle and NUL-terminated string. Masks fit in c_int.
        unsafe { Pex_StartSearchRequest_SetISRC(ptr_of(request), isrc.as_ptr(), match_types as c_int) }
    }

    fn set_fingerprint(&self, request: Handle, buffer: Handle, status: Handle) {
        // SAFETY: live handles.
        unsafe { Pex_StartSearchRequest_SetFingerprint(ptr_of(request), ptr_of(buffer), ptr_of(status)) }
    }

    fn set_type(&self, request: Handle, mode: i32) {
        // SAFETY: live handle.
        unsafe { Pex_StartSearchRequest_SetType(ptr_of(request), mode) }
    }

    fn start_search(&self, client: Handle, request: Handle, result: Handle, status: Handle) {
        // SAFETY: live handles.
        unsafe {
            Pex_StartSearch(
                ptr_of(client),
                ptr_of(request),
                ptr_of(result),
                ptr_of(status),
            )
        }
    }

    fn next_lookup_id(&self, result: Handle, index: &mut usize) -> Option<String> {
        let mut lookup_id: *const c_char = ptr::null();
        // SAFETY: live handle; the returned string is owned by the result
        // object and copied before it can be freed.
        unsafe {
            if Pex_StartSearchResult_NextLookupID(ptr_of(result), index, &mut lookup_id) {
                Some(owned_string(lookup_id))
            } else {
                None
            }
        }
    }

    fn add_lookup_id(&self, request: Handle, lookup_id: &CStr) {
        // SAFETY: live handle and NUL-terminated string.
        unsafe { Pex_CheckSearchRequest_AddLookupID(ptr_of(request), lookup_id.as_ptr()) }
    }

    fn check_search(&self, client: Handle, request: Handle, result: Handle, status: Handle) {
        // SAFETY: live handles.
        unsafe {
            Pex_CheckSearch(
                ptr_of(client),
                ptr_of(request),
                ptr_of(result),
                ptr_of(status),
            )
        }
    }

    fn result_json(&self, result: Handle) -> String {
        // SAFETY: live handle; the JSON text is owned by the result object
        // and copied before it can be freed.
        unsafe { owned_string(Pex_CheckSearchResult_GetJSON(ptr_of(result))) }
    }
}
