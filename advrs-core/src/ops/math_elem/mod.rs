pub mod clamp;
pub mod exp;
pub mod ln;

pub use clamp::clamp_op;
pub use exp::exp_op;
pub use ln::ln_op;
