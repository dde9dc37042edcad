//! Buffer descriptors for native calls.
//!
//! Every buffer handed to the engine is described by an [`MdbVal`]. The types
//! here build those descriptors from Rust slices without copying, and read
//! them back after the engine fills them.

use crate::error::{BridgeError, BridgeResult};
use lmbridge_engine::MdbVal;
use std::borrow::Cow;
use std::ffi::{c_void, CStr};
use std::marker::PhantomData;

/// A non-owning descriptor of a byte range.
///
/// A `Val` built with [`Val::wrap`] borrows its slice for `'a`, so the
/// descriptor cannot outlive the bytes it points at. A `Val` filled by the
/// engine points at engine-owned memory whose validity is governed by the
/// engine's own rules (the enclosing transaction).
#[repr(transparent)]
#[derive(Clone, Copy)]
pub struct Val<'a> {
    raw: MdbVal,
    _marker: PhantomData<&'a [u8]>,
}

impl<'a> Val<'a> {
    /// Describes `bytes` without copying.
    pub fn wrap(bytes: &'a [u8]) -> Self {
        Self {
            raw: MdbVal::from_slice(bytes),
            _marker: PhantomData,
        }
    }

    /// An empty descriptor (null pointer, zero length).
    pub const fn empty() -> Self {
        Self {
            raw: MdbVal::empty(),
            _marker: PhantomData,
        }
    }

    /// Describes `len` bytes starting at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads of `len` bytes for `'a`, or `len` must
    /// be zero.
    pub unsafe fn from_raw(ptr: *const u8, len: usize) -> Self {
        Self {
            raw: MdbVal {
                mv_size: len,
                mv_data: ptr as *mut c_void,
            },
            _marker: PhantomData,
        }
    }

    /// Adopts a descriptor filled in by the engine.
    ///
    /// # Safety
    ///
    /// The described memory must stay valid for `'a`.
    pub(crate) unsafe fn from_mdb(raw: MdbVal) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// Returns the underlying descriptor.
    pub fn into_raw(self) -> MdbVal {
        self.raw
    }

    /// Returns the address and length of the described range.
    pub fn into_parts(self) -> (*const u8, usize) {
        (self.ptr(), self.len())
    }

    /// Returns a pointer suitable for an in/out descriptor argument.
    pub fn raw_mut(&mut self) -> *mut MdbVal {
        &mut self.raw
    }

    /// Number of bytes described.
    pub fn len(&self) -> usize {
        self.raw.mv_size
    }

    /// True if no bytes are described.
    pub fn is_empty(&self) -> bool {
        self.raw.mv_size == 0
    }

    /// Address of the first byte.
    pub fn ptr(&self) -> *const u8 {
        self.raw.mv_data as *const u8
    }

    /// Views the described bytes.
    ///
    /// # Safety
    ///
    /// The memory must still be valid. For descriptors returned by the engine
    /// this means the transaction that produced them is still open and has
    /// not written since.
    pub unsafe fn as_bytes(&self) -> &'a [u8] {
        bytes_of(&self.raw)
    }

    /// Copies the described bytes.
    ///
    /// # Safety
    ///
    /// Same as [`Val::as_bytes`].
    pub unsafe fn to_vec(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl Default for Val<'_> {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for Val<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Val")
            .field("ptr", &self.raw.mv_data)
            .field("len", &self.raw.mv_size)
            .finish()
    }
}

impl<'a> From<&'a [u8]> for Val<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::wrap(bytes)
    }
}

/// Views the bytes behind a raw descriptor. Null or empty descriptors
/// yield an empty slice.
///
/// # Safety
///
/// `val` must be null or point at a descriptor whose memory is valid for
/// `'a`.
pub unsafe fn bytes_of<'a>(val: *const MdbVal) -> &'a [u8] {
    match val.as_ref() {
        Some(val) if val.mv_size > 0 && !val.mv_data.is_null() => {
            std::slice::from_raw_parts(val.mv_data as *const u8, val.mv_size)
        }
        _ => &[],
    }
}

/// A page of fixed-stride records for a single multi-value put.
///
/// The record count is derived from the page length and the stride, so a
/// `MultiVal` can only be built when the two agree.
pub struct MultiVal<'a> {
    vals: [MdbVal; 2],
    _marker: PhantomData<&'a [u8]>,
}

impl<'a> MultiVal<'a> {
    /// Describes `page` as `page.len() / stride` records of `stride` bytes.
    ///
    /// An empty page describes zero records.
    pub fn wrap(page: &'a [u8], stride: usize) -> BridgeResult<Self> {
        if page.is_empty() {
            return Ok(Self::from_parts(page, stride, 0));
        }
        if stride == 0 || page.len() % stride != 0 {
            return Err(BridgeError::IncongruentMulti {
                len: page.len(),
                stride,
            });
        }
        Ok(Self::from_parts(page, stride, page.len() / stride))
    }

    fn from_parts(page: &'a [u8], stride: usize, count: usize) -> Self {
        Self {
            vals: [
                MdbVal {
                    mv_size: stride,
                    mv_data: page.as_ptr() as *mut c_void,
                },
                MdbVal {
                    mv_size: count,
                    mv_data: std::ptr::null_mut(),
                },
            ],
            _marker: PhantomData,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.vals[1].mv_size
    }

    /// True if the page holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes per record.
    pub fn stride(&self) -> usize {
        self.vals[0].mv_size
    }

    /// Total bytes in the page.
    pub fn size(&self) -> usize {
        self.len() * self.stride()
    }

    /// The whole page.
    pub fn page(&self) -> &'a [u8] {
        // SAFETY: built from a slice borrowed for 'a.
        unsafe { std::slice::from_raw_parts(self.vals[0].mv_data as *const u8, self.size()) }
    }

    /// The `i`th record.
    pub fn get(&self, i: usize) -> Option<&'a [u8]> {
        if i >= self.len() {
            return None;
        }
        let stride = self.stride();
        Some(&self.page()[i * stride..(i + 1) * stride])
    }

    /// Iterates over the records in order.
    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Pointer to the two-descriptor array expected with `MDB_MULTIPLE`.
    ///
    /// After the call the second descriptor's size holds the number of
    /// records the engine wrote; read it back with [`MultiVal::written`].
    pub fn as_mut_ptr(&mut self) -> *mut MdbVal {
        self.vals.as_mut_ptr()
    }

    /// The count slot as last written by the engine.
    pub(crate) fn written(&self) -> usize {
        self.vals[1].mv_size
    }
}

impl std::fmt::Debug for MultiVal<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiVal")
            .field("count", &self.len())
            .field("stride", &self.stride())
            .finish()
    }
}

/// One null-terminated line delivered by the engine's message function.
#[derive(Clone, Copy)]
pub struct MessageLine<'a> {
    text: &'a CStr,
}

impl<'a> MessageLine<'a> {
    /// Wraps a line borrowed from the engine.
    pub fn new(text: &'a CStr) -> Self {
        Self { text }
    }

    /// The line's bytes, without the terminator.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.text.to_bytes()
    }

    /// The line as UTF-8, if it is valid UTF-8.
    pub fn to_str(&self) -> Option<&'a str> {
        self.text.to_str().ok()
    }

    /// The line as UTF-8, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> Cow<'a, str> {
        self.text.to_string_lossy()
    }

    /// The line without trailing newline characters.
    pub fn trimmed(&self) -> Cow<'a, str> {
        match self.to_string_lossy() {
            Cow::Borrowed(s) => Cow::Borrowed(s.trim_end_matches(['\n', '\r'])),
            Cow::Owned(s) => Cow::Owned(s.trim_end_matches(['\n', '\r']).to_owned()),
        }
    }
}

impl std::fmt::Display for MessageLine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl std::fmt::Debug for MessageLine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MessageLine").field(&self.text).finish()
    }
}
