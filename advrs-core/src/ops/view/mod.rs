pub mod reshape;
pub mod select;

pub use reshape::reshape_op;
pub use select::select_op;
