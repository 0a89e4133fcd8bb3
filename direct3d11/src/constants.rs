//! HLSL constant buffer packing
//!
//! Constants are laid out in declaration order in 16-byte registers. A
//! scalar or vector never straddles a register boundary, matrices start on
//! a register boundary and take one register per column. Matrices are
//! column-major on both sides, so columns copy straight across.

use vesper_core::graphics::{DataType, ShaderConstant};
use vesper_core::{EngineError, Result};

const REGISTER: usize = 4;

/// Float offsets of each constant inside the buffer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConstantLayout {
    entries: Vec<(usize, DataType)>,
    /// Buffer length in floats, a whole number of registers
    len: usize,
}

/// Columns and rows for matrices, `None` for scalars and vectors.
fn matrix_shape(data_type: DataType) -> Option<(usize, usize)> {
    match data_type {
        DataType::FloatMatrix3 => Some((3, 3)),
        DataType::FloatMatrix4 => Some((4, 4)),
        _ => None,
    }
}

impl ConstantLayout {
    pub fn new(constants: &[ShaderConstant]) -> Self {
        let mut entries = Vec::with_capacity(constants.len());
        let mut offset = 0usize;
        for constant in constants {
            let floats = match matrix_shape(constant.data_type) {
                Some((columns, _)) => {
                    offset = offset.next_multiple_of(REGISTER);
                    columns * REGISTER
                }
                None => {
                    let floats = constant.data_type.components() as usize;
                    if offset % REGISTER + floats > REGISTER {
                        offset = offset.next_multiple_of(REGISTER);
                    }
                    floats
                }
            };
            entries.push((offset, constant.data_type));
            offset += floats;
        }
        Self {
            entries,
            len: offset.next_multiple_of(REGISTER),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the constant buffer in bytes.
    pub fn byte_size(&self) -> u32 {
        (self.len * 4) as u32
    }

    pub fn offsets(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|(offset, _)| *offset)
    }

    /// Packs one draw's values into `out`, resized to the buffer length.
    ///
    /// Each value must hold exactly one element of its declared type.
    /// Integers are stored by bit pattern.
    pub fn pack(&self, values: &[Vec<f32>], out: &mut Vec<f32>) -> Result<()> {
        if values.len() > self.entries.len() {
            return Err(EngineError::data(format!(
                "{} constants for a shader that declares {}",
                values.len(),
                self.entries.len()
            )));
        }
        out.clear();
        out.resize(self.len, 0.0);
        for (&(offset, data_type), value) in self.entries.iter().zip(values) {
            let expected = data_type.components() as usize;
            if value.len() != expected {
                return Err(EngineError::data(format!(
                    "{:?} constant needs {} floats, got {}",
                    data_type,
                    expected,
                    value.len()
                )));
            }
            match (matrix_shape(data_type), data_type) {
                (Some((_, rows)), _) => {
                    for (column, chunk) in value.chunks_exact(rows).enumerate() {
                        let start = offset + column * REGISTER;
                        out[start..start + rows].copy_from_slice(chunk);
                    }
                }
                (None, DataType::Integer | DataType::IntegerVector4) => {
                    for (slot, v) in out[offset..offset + expected].iter_mut().zip(value) {
                        *slot = f32::from_bits(*v as i32 as u32);
                    }
                }
                (None, _) => out[offset..offset + expected].copy_from_slice(value),
            }
        }
        Ok(())
    }
}
