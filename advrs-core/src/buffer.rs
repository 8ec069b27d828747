use std::fmt::Debug;
use std::sync::Arc;

use crate::error::AdvrsError;
use crate::types::DType;

/// Typed CPU storage behind a tensor.
///
/// The vectors are wrapped in `Arc` so reshapes, detaches and dtype no-op casts
/// share memory instead of copying it.
#[derive(Debug, Clone)]
pub enum Buffer {
    /// Buffer holding f32 data.
    F32(Arc<Vec<f32>>),
    /// Buffer holding f64 data.
    F64(Arc<Vec<f64>>),
}

impl Buffer {
    pub fn dtype(&self) -> DType {
        match self {
            Buffer::F32(_) => DType::F32,
            Buffer::F64(_) => DType::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Buffer::F32(data) => data.len(),
            Buffer::F64(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attempts to get a reference to the underlying `Arc<Vec<f32>>`.
    ///
    /// Returns an error if the buffer is not of type F32.
    pub fn try_get_cpu_f32(&self) -> Result<&Arc<Vec<f32>>, AdvrsError> {
        match self {
            Buffer::F32(data_arc) => Ok(data_arc),
            Buffer::F64(_) => Err(AdvrsError::DataTypeMismatch {
                expected: DType::F32,
                actual: DType::F64,
                operation: "try_get_cpu_f32".to_string(),
            }),
        }
    }

    /// Attempts to get a reference to the underlying `Arc<Vec<f64>>`.
    ///
    /// Returns an error if the buffer is not of type F64.
    pub fn try_get_cpu_f64(&self) -> Result<&Arc<Vec<f64>>, AdvrsError> {
        match self {
            Buffer::F64(data_arc) => Ok(data_arc),
            Buffer::F32(_) => Err(AdvrsError::DataTypeMismatch {
                expected: DType::F64,
                actual: DType::F32,
                operation: "try_get_cpu_f64".to_string(),
            }),
        }
    }

    /// Copies the elements out as f64, widening f32 data.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            Buffer::F32(data) => data.iter().map(|&x| x as f64).collect(),
            Buffer::F64(data) => data.as_ref().clone(),
        }
    }

    /// Returns the buffer in `dtype`. Same-type casts share the allocation.
    pub fn cast(&self, dtype: DType) -> Buffer {
        match (self, dtype) {
            (Buffer::F32(_), DType::F32) | (Buffer::F64(_), DType::F64) => self.clone(),
            (Buffer::F32(data), DType::F64) => {
                Buffer::F64(Arc::new(data.iter().map(|&x| x as f64).collect()))
            }
            (Buffer::F64(data), DType::F32) => {
                Buffer::F32(Arc::new(data.iter().map(|&x| x as f32).collect()))
            }
        }
    }

    /// Compares element values exactly; buffers of different dtypes are never equal.
    pub fn values_eq(&self, other: &Buffer) -> bool {
        match (self, other) {
            (Buffer::F32(a), Buffer::F32(b)) => Arc::ptr_eq(a, b) || a == b,
            (Buffer::F64(a), Buffer::F64(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_shares_when_same_dtype() {
        let buffer = Buffer::F32(Arc::new(vec![1.0, 2.0]));
        let same = buffer.cast(DType::F32);
        match (&buffer, &same) {
            (Buffer::F32(a), Buffer::F32(b)) => assert!(Arc::ptr_eq(a, b)),
            _ => panic!("cast changed dtype"),
        }
    }

    #[test]
    fn test_cast_widens_and_narrows() {
        let buffer = Buffer::F32(Arc::new(vec![0.5, -1.5]));
        let wide = buffer.cast(DType::F64);
        assert_eq!(wide.dtype(), DType::F64);
        assert_eq!(wide.try_get_cpu_f64().unwrap().as_slice(), &[0.5, -1.5]);
        let narrow = wide.cast(DType::F32);
        assert!(narrow.values_eq(&buffer));
    }

    #[test]
    fn test_wrong_dtype_access() {
        let buffer = Buffer::F64(Arc::new(vec![1.0]));
        assert!(matches!(
            buffer.try_get_cpu_f32(),
            Err(AdvrsError::DataTypeMismatch { expected: DType::F32, actual: DType::F64, .. })
        ));
    }
}
