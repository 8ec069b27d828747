pub mod activation;
pub mod flatten;
pub mod linear;

pub use activation::{Relu, Softmax};
pub use flatten::Flatten;
pub use linear::Linear;
