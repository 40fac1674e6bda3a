//! C-compatible surface of the proving engine.
//!
//! Every entry point takes and returns fixed 32-byte buffers plus a status
//! code from the closed set below. The proof construction itself is a
//! placeholder transcript hash standing in for the full membership-proof
//! circuit; the buffer shapes, status codes, and struct layouts are the
//! stable contract callers build against.
//!
//! # Safety
//!
//! All pointer-taking functions are `unsafe` and require valid pointers of
//! the documented sizes. The caller owns all memory.

use std::ffi::c_char;
use std::{ptr, slice};

use blake2::{Blake2b512, Digest};
use curve25519_dalek::Scalar;
use curve25519_dalek::constants::{ED25519_BASEPOINT_COMPRESSED, ED25519_BASEPOINT_POINT};
use curve25519_dalek::edwards::CompressedEdwardsY;
use rand_core::OsRng;
use zeroize::Zeroize;

use curvetree_pedersen::hash_to_point;

/// Success.
pub const FCMP_SUCCESS: i32 = 0;
/// Invalid parameter (null pointer, wrong size, empty branch).
pub const FCMP_ERROR_INVALID_PARAM: i32 = -1;
/// Proof generation failed.
pub const FCMP_ERROR_PROOF_GENERATION: i32 = -2;
/// Proof verification failed.
pub const FCMP_ERROR_PROOF_VERIFICATION: i32 = -3;
/// Output buffer too small.
pub const FCMP_ERROR_MEMORY: i32 = -4;
/// Invalid point on curve.
pub const FCMP_ERROR_INVALID_POINT: i32 = -5;
/// Invalid scalar.
pub const FCMP_ERROR_INVALID_SCALAR: i32 = -6;
/// Internal error.
pub const FCMP_ERROR_INTERNAL: i32 = -99;

/// Size of a scalar in bytes.
pub const SCALAR_SIZE: usize = 32;
/// Size of a compressed point in bytes.
pub const POINT_SIZE: usize = 32;
/// Size of a serialized output tuple (three points).
pub const OUTPUT_TUPLE_SIZE: usize = POINT_SIZE * 3;
/// Size of the placeholder proof transcript.
pub const PROOF_TRANSCRIPT_SIZE: usize = 64;

/// Branch data handed to the prover.
#[repr(C)]
pub struct FcmpBranch {
    /// Leaf index in the tree.
    pub leaf_index: u64,
    /// Number of layers.
    pub num_layers: u32,
    /// Pointer to `num_layers` layer descriptors.
    pub layers: *const FcmpBranchLayer,
}

/// One branch layer: a flat array of 32-byte scalars.
#[repr(C)]
pub struct FcmpBranchLayer {
    /// Number of scalars in this layer.
    pub num_elements: u32,
    /// Pointer to `num_elements * 32` bytes of scalar data.
    pub elements: *const u8,
}

/// Public input for verification.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FcmpInput {
    /// Re-randomized `O` point (x, y coordinates as scalars).
    pub o_tilde: [u8; 64],
    /// Re-randomized `I` point.
    pub i_tilde: [u8; 64],
    /// `R` value for the spend-authorization layer.
    pub r: [u8; 64],
    /// Re-randomized `C` point.
    pub c_tilde: [u8; 64],
}

impl Default for FcmpInput {
    fn default() -> Self {
        Self {
            o_tilde: [0u8; 64],
            i_tilde: [0u8; 64],
            r: [0u8; 64],
            c_tilde: [0u8; 64],
        }
    }
}

/// # Safety
/// `ptr` must be valid for 32 bytes of reads.
unsafe fn read_32(ptr: *const u8) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    unsafe {
        ptr::copy_nonoverlapping(ptr, bytes.as_mut_ptr(), 32);
    }
    bytes
}

/// # Safety
/// `ptr` must be valid for 32 bytes of writes.
unsafe fn write_32(ptr: *mut u8, bytes: &[u8; 32]) {
    unsafe {
        ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, 32);
    }
}

fn decompress(bytes: &[u8; 32]) -> Option<curve25519_dalek::edwards::EdwardsPoint> {
    CompressedEdwardsY(*bytes).decompress()
}

/// Generate a uniformly random scalar.
///
/// # Safety
/// `out` must point to at least 32 bytes of writable memory.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fcmp_scalar_random(out: *mut u8) -> i32 {
    if out.is_null() {
        return FCMP_ERROR_INVALID_PARAM;
    }
    let scalar = Scalar::random(&mut OsRng);
    let mut bytes = scalar.to_bytes();
    unsafe {
        write_32(out, &bytes);
    }
    bytes.zeroize();
    FCMP_SUCCESS
}

/// `out = a + b (mod l)`.
///
/// # Safety
/// All pointers must point to at least 32 bytes; `out` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fcmp_scalar_add(out: *mut u8, a: *const u8, b: *const u8) -> i32 {
    if out.is_null() || a.is_null() || b.is_null() {
        return FCMP_ERROR_INVALID_PARAM;
    }
    let (a, b) = unsafe { (read_32(a), read_32(b)) };
    let a = Scalar::from_bytes_mod_order(a);
    let b = Scalar::from_bytes_mod_order(b);
    unsafe {
        write_32(out, &(a + b).to_bytes());
    }
    FCMP_SUCCESS
}

/// `out = a * b (mod l)`.
///
/// # Safety
/// All pointers must point to at least 32 bytes; `out` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fcmp_scalar_mul(out: *mut u8, a: *const u8, b: *const u8) -> i32 {
    if out.is_null() || a.is_null() || b.is_null() {
        return FCMP_ERROR_INVALID_PARAM;
    }
    let (a, b) = unsafe { (read_32(a), read_32(b)) };
    let a = Scalar::from_bytes_mod_order(a);
    let b = Scalar::from_bytes_mod_order(b);
    unsafe {
        write_32(out, &(a * b).to_bytes());
    }
    FCMP_SUCCESS
}

/// `out = scalar * point`.
///
/// # Safety
/// All pointers must point to at least 32 bytes; `out` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fcmp_point_mul(out: *mut u8, scalar: *const u8, point: *const u8) -> i32 {
    if out.is_null() || scalar.is_null() || point.is_null() {
        return FCMP_ERROR_INVALID_PARAM;
    }
    let (scalar_bytes, point_bytes) = unsafe { (read_32(scalar), read_32(point)) };
    let Some(point) = decompress(&point_bytes) else {
        return FCMP_ERROR_INVALID_POINT;
    };
    let scalar = Scalar::from_bytes_mod_order(scalar_bytes);
    unsafe {
        write_32(out, &(scalar * point).compress().to_bytes());
    }
    FCMP_SUCCESS
}

/// `out = a + b`.
///
/// # Safety
/// All pointers must point to at least 32 bytes; `out` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fcmp_point_add(out: *mut u8, a: *const u8, b: *const u8) -> i32 {
    if out.is_null() || a.is_null() || b.is_null() {
        return FCMP_ERROR_INVALID_PARAM;
    }
    let (a_bytes, b_bytes) = unsafe { (read_32(a), read_32(b)) };
    let (Some(a), Some(b)) = (decompress(&a_bytes), decompress(&b_bytes)) else {
        return FCMP_ERROR_INVALID_POINT;
    };
    unsafe {
        write_32(out, &(a + b).compress().to_bytes());
    }
    FCMP_SUCCESS
}

/// Write the Ed25519 basepoint.
///
/// # Safety
/// `out` must point to at least 32 bytes of writable memory.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fcmp_point_basepoint(out: *mut u8) -> i32 {
    if out.is_null() {
        return FCMP_ERROR_INVALID_PARAM;
    }
    unsafe {
        write_32(out, ED25519_BASEPOINT_COMPRESSED.as_bytes());
    }
    FCMP_SUCCESS
}

/// Whether the 32 bytes decode to a curve point. Returns 1 or 0.
///
/// # Safety
/// `point` must point to at least 32 bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fcmp_point_is_valid(point: *const u8) -> i32 {
    if point.is_null() {
        return 0;
    }
    let bytes = unsafe { read_32(point) };
    if decompress(&bytes).is_some() { 1 } else { 0 }
}

/// Hash arbitrary data to a scalar (Blake2b512, wide reduction).
///
/// # Safety
/// `out` must point to at least 32 writable bytes; `data` must point to
/// `data_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fcmp_hash_to_scalar(out: *mut u8, data: *const u8, data_len: usize) -> i32 {
    if out.is_null() || (data.is_null() && data_len > 0) {
        return FCMP_ERROR_INVALID_PARAM;
    }
    let input = if data_len > 0 {
        unsafe { slice::from_raw_parts(data, data_len) }
    } else {
        &[]
    };
    let scalar = curvetree_pedersen::hash_to_scalar(input);
    unsafe {
        write_32(out, &scalar.to_bytes());
    }
    FCMP_SUCCESS
}

/// Hash arbitrary data to a prime-order-subgroup point.
///
/// # Safety
/// `out` must point to at least 32 writable bytes; `data` must point to
/// `data_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fcmp_hash_to_point(out: *mut u8, data: *const u8, data_len: usize) -> i32 {
    if out.is_null() || (data.is_null() && data_len > 0) {
        return FCMP_ERROR_INVALID_PARAM;
    }
    let input = if data_len > 0 {
        unsafe { slice::from_raw_parts(data, data_len) }
    } else {
        &[]
    };
    let point = hash_to_point(input);
    unsafe {
        write_32(out, &point.compress().to_bytes());
    }
    FCMP_SUCCESS
}

/// Pedersen commitment: `out = value * G + blinding * H`.
///
/// `H` is derived by hashing a fixed tag to a point, so its discrete log
/// relative to `G` is unknown.
///
/// # Safety
/// All pointers must point to at least 32 bytes; `out` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fcmp_pedersen_commit(
    out: *mut u8,
    value: *const u8,
    blinding: *const u8,
) -> i32 {
    if out.is_null() || value.is_null() || blinding.is_null() {
        return FCMP_ERROR_INVALID_PARAM;
    }
    let (v_bytes, b_bytes) = unsafe { (read_32(value), read_32(blinding)) };
    let v = Scalar::from_bytes_mod_order(v_bytes);
    let b = Scalar::from_bytes_mod_order(b_bytes);
    let h = hash_to_point(b"fcmp_pedersen_h_v1");
    let commitment = v * ED25519_BASEPOINT_POINT + b * h;
    unsafe {
        write_32(out, &commitment.compress().to_bytes());
    }
    FCMP_SUCCESS
}

/// Upper bound on the proof size for the given shape, or 0 on bad input.
#[unsafe(no_mangle)]
pub extern "C" fn fcmp_proof_size(num_inputs: u32, num_layers: u32) -> usize {
    if num_inputs == 0 || num_layers == 0 {
        return 0;
    }
    // Shape estimate: fixed bulletproof components, two IPA elements per
    // round over the layer count, one commitment per input per layer, and
    // the transcript tail.
    let base = 32 * 16;
    let ipa = 32 * 2 * (32 - num_layers.leading_zeros()) as usize;
    let commits = 32 * (num_inputs as usize) * (num_layers as usize);
    base + ipa + commits + PROOF_TRANSCRIPT_SIZE
}

/// Generate a membership proof into a caller-provided buffer.
///
/// Writes the actual proof length to `proof_len_out`. The current
/// construction is a transcript hash over the root, output bytes, and
/// branch layers.
///
/// # Safety
/// - `proof_out` must have `proof_max_len` writable bytes.
/// - `tree_root` must point to 32 bytes, `output` to 96 bytes.
/// - `branch` and everything it points to must be valid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fcmp_prove(
    proof_out: *mut u8,
    proof_len_out: *mut usize,
    proof_max_len: usize,
    tree_root: *const u8,
    output: *const u8,
    branch: *const FcmpBranch,
) -> i32 {
    if proof_out.is_null()
        || proof_len_out.is_null()
        || tree_root.is_null()
        || output.is_null()
        || branch.is_null()
    {
        return FCMP_ERROR_INVALID_PARAM;
    }

    let branch = unsafe { &*branch };
    if branch.layers.is_null() || branch.num_layers == 0 {
        return FCMP_ERROR_INVALID_PARAM;
    }
    if proof_max_len < PROOF_TRANSCRIPT_SIZE {
        return FCMP_ERROR_MEMORY;
    }

    let mut hasher = Blake2b512::new();
    hasher.update(b"fcmp_proof_transcript_v1");
    hasher.update(unsafe { slice::from_raw_parts(tree_root, POINT_SIZE) });
    hasher.update(unsafe { slice::from_raw_parts(output, OUTPUT_TUPLE_SIZE) });

    let layers = unsafe { slice::from_raw_parts(branch.layers, branch.num_layers as usize) };
    for layer in layers {
        if !layer.elements.is_null() && layer.num_elements > 0 {
            let elements = unsafe {
                slice::from_raw_parts(layer.elements, layer.num_elements as usize * SCALAR_SIZE)
            };
            hasher.update(elements);
        }
    }
    let transcript = hasher.finalize();

    unsafe {
        ptr::copy_nonoverlapping(transcript.as_ptr(), proof_out, PROOF_TRANSCRIPT_SIZE);
        *proof_len_out = PROOF_TRANSCRIPT_SIZE;
    }
    FCMP_SUCCESS
}

/// Verify a membership proof.
///
/// The current construction checks proof shape only: a proof shorter than
/// the transcript, or all zeros, is rejected.
///
/// # Safety
/// - `tree_root` must point to 32 bytes.
/// - `input` must point to a valid [`FcmpInput`].
/// - `proof` must point to `proof_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fcmp_verify(
    tree_root: *const u8,
    input: *const FcmpInput,
    proof: *const u8,
    proof_len: usize,
) -> i32 {
    if tree_root.is_null() || input.is_null() || proof.is_null() {
        return FCMP_ERROR_INVALID_PARAM;
    }
    if proof_len < PROOF_TRANSCRIPT_SIZE {
        return FCMP_ERROR_INVALID_PARAM;
    }

    let proof_bytes = unsafe { slice::from_raw_parts(proof, proof_len) };
    if proof_bytes.iter().all(|&b| b == 0) {
        return FCMP_ERROR_PROOF_VERIFICATION;
    }
    FCMP_SUCCESS
}

/// Null-terminated library version string.
#[unsafe(no_mangle)]
pub extern "C" fn fcmp_version() -> *const c_char {
    c"0.1.0".as_ptr()
}

pub(crate) fn error_cstr(code: i32) -> &'static std::ffi::CStr {
    match code {
        FCMP_SUCCESS => c"Success",
        FCMP_ERROR_INVALID_PARAM => c"Invalid parameter",
        FCMP_ERROR_PROOF_GENERATION => c"Proof generation failed",
        FCMP_ERROR_PROOF_VERIFICATION => c"Proof verification failed",
        FCMP_ERROR_MEMORY => c"Output buffer too small",
        FCMP_ERROR_INVALID_POINT => c"Invalid curve point",
        FCMP_ERROR_INVALID_SCALAR => c"Invalid scalar",
        FCMP_ERROR_INTERNAL => c"Internal error",
        _ => c"Unknown error",
    }
}

/// Null-terminated message for a status code.
#[unsafe(no_mangle)]
pub extern "C" fn fcmp_error_string(code: i32) -> *const c_char {
    error_cstr(code).as_ptr()
}
