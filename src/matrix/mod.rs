//! Matrix module: LDU input, triplet assembly, sort permutations and sparse storage.

pub mod device;
pub mod ldu;
pub mod permutation;
pub mod sparse;
pub mod sparsity;

pub use device::{DeviceMatrix, SparseStorage};
pub use ldu::{LduMatrixSource, LduSystem, Topology};
pub use permutation::Permutation;
pub use sparse::{CooMatrix, CsrMatrix, SparseMatrix};
pub use sparsity::{TripletPattern, assemble_values};
