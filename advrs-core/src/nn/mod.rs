//! Eager neural-network building blocks: the `Module` trait, parameters, layers and
//! the `Sequential` container.

pub mod init;
pub mod layers;
pub mod module;
pub mod parameter;
pub mod sequential;

pub use layers::{Flatten, Linear, Relu, Softmax};
pub use module::Module;
pub use parameter::Parameter;
pub use sequential::Sequential;
