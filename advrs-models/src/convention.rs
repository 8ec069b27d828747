use advrs_core::ops::math_elem::{clamp_op, ln_op};
use advrs_core::{AdvrsError, Tensor};

/// Clipping margin used when logits are recovered from probabilities.
pub const EPSILON: f64 = 1e-7;

/// What a wrapped model natively outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputConvention {
    Logits,
    #[default]
    Probabilities,
}

/// How an adapter obtains logits, decided once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogitsStrategy {
    /// The output already is logits.
    Native,
    /// The input of the final softmax node; exact.
    PreActivation,
    /// `ln(clamp(p, EPSILON, 1 - EPSILON))`; numerically unstable near 0 and 1.
    LogClip,
}

/// Recovers logits from probabilities, up to the per-row constant softmax ignores.
pub fn log_clip(probabilities: &Tensor) -> Result<Tensor, AdvrsError> {
    ln_op(&clamp_op(probabilities, EPSILON, 1.0 - EPSILON)?)
}
