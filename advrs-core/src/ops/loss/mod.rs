pub mod cross_entropy;

pub use cross_entropy::sparse_cross_entropy_op;
