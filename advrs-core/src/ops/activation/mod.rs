pub mod log_softmax;
pub mod relu;
pub mod softmax;

pub use log_softmax::log_softmax_op;
pub use relu::relu_op;
pub use softmax::softmax_op;
