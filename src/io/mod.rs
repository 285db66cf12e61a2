//! File formats for graph datasets and partition results.
//!
//! - `npy` - NumPy arrays for CSR offsets, indices, weights and partition maps

pub mod npy;

pub use npy::{NpyArray, NpyElement, load_array, save_array};
