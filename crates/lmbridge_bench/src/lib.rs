//! Benchmark utilities.

use rand::Rng;

/// Generate `count` random keys of `size` bytes.
pub fn random_keys(count: usize, size: usize) -> Vec<Vec<u8>> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| (0..size).map(|_| rng.gen()).collect())
        .collect()
}

/// Generate a page of `count` random records of `stride` bytes.
pub fn random_page(count: usize, stride: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..count * stride).map(|_| rng.gen()).collect()
}
