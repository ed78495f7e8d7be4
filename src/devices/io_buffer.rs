use core::ptr::NonNull;

/// Caller memory an I/O operation reads into or writes out of.
///
/// The buffer lives in the requesting process's address space and is only
/// touched while that process is blocked on the request, so the engine holds
/// it as a raw pointer instead of a borrow.
#[derive(Debug, Clone, Copy)]
pub struct IoBuffer {
    ptr: NonNull<u8>,
    len: usize,
}

// The single-CPU kernel only touches a buffer from the syscall path or the
// serial ISR, never both at once.
unsafe impl Send for IoBuffer {}

impl IoBuffer {
    /// Wraps a syscall-supplied pointer. Returns `None` for null.
    ///
    /// # Safety
    ///
    /// `ptr..ptr + len` must stay valid for reads and writes until the
    /// request completes or is cancelled.
    pub unsafe fn from_raw(ptr: *mut u8, len: usize) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// # Safety
    ///
    /// The memory must still be valid, and no slice from
    /// [`as_mut_slice`](Self::as_mut_slice) on any copy of this handle may
    /// be alive.
    pub unsafe fn as_slice(&self) -> &[u8] {
        core::slice::from_raw_parts(self.ptr.as_ptr(), self.len)
    }

    /// # Safety
    ///
    /// The memory must still be valid, and no other slice over it, from
    /// this handle or a copy, may be alive.
    pub unsafe fn as_mut_slice(&mut self) -> &mut [u8] {
        core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len)
    }
}

impl From<&'static mut [u8]> for IoBuffer {
    fn from(slice: &'static mut [u8]) -> Self {
        Self {
            len: slice.len(),
            ptr: NonNull::from(slice).cast(),
        }
    }
}
