/// Defines the possible data types for Tensor elements.
///
/// Only floating-point types exist: every tensor the engine produces can be
/// differentiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit floating-point type.
    F32,
    /// 64-bit floating-point type.
    F64,
}

impl DType {
    /// Returns the type both operands are computed in when they differ.
    pub fn promote(a: DType, b: DType) -> DType {
        if a == DType::F64 || b == DType::F64 {
            DType::F64
        } else {
            DType::F32
        }
    }

    /// Size of one element in bytes.
    pub fn size_of(&self) -> usize {
        match self {
            DType::F32 => std::mem::size_of::<f32>(),
            DType::F64 => std::mem::size_of::<f64>(),
        }
    }
}
