//! Typed kernel parameters and their uniform-buffer packing.
//!
//! Kernels declare parameters as name/value pairs; the compositor packs
//! them, in declaration order, into a byte buffer laid out to match the
//! kernel's WGSL uniform struct. The layout follows WGSL's uniform address
//! space rules: scalars align to 4, `vec2` to 8, `vec3` to 16, and array
//! elements occupy full 16-byte slots.

/// A named kernel parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    /// Scalar `f32`.
    Float(f32),
    /// Scalar `i32`, used for discrete sizes such as kernel width.
    Int(i32),
    /// Two-component vector.
    Vec2([f32; 2]),
    /// Three-component vector.
    Vec3([f32; 3]),
    /// Arbitrary-length float array; each element takes a 16-byte slot
    /// (declared `array<vec4<f32>, N>` in WGSL, read through `.x`).
    FloatArray(Vec<f32>),
    /// Array of three-component vectors, one 16-byte slot each.
    Vec3Array(Vec<[f32; 3]>),
}

impl UniformValue {
    fn alignment(&self) -> usize {
        match self {
            UniformValue::Float(_) | UniformValue::Int(_) => 4,
            UniformValue::Vec2(_) => 8,
            UniformValue::Vec3(_)
            | UniformValue::FloatArray(_)
            | UniformValue::Vec3Array(_) => 16,
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        match self {
            UniformValue::Float(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Int(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Vec2(v) => out.extend_from_slice(bytemuck::cast_slice(v)),
            UniformValue::Vec3(v) => out.extend_from_slice(bytemuck::cast_slice(v)),
            UniformValue::FloatArray(vs) => {
                for v in vs {
                    out.extend_from_slice(bytemuck::bytes_of(v));
                    out.extend_from_slice(&[0u8; 12]);
                }
            }
            UniformValue::Vec3Array(vs) => {
                for v in vs {
                    out.extend_from_slice(bytemuck::cast_slice(v));
                    out.extend_from_slice(&[0u8; 4]);
                }
            }
        }
    }
}

fn pad_to(out: &mut Vec<u8>, alignment: usize) {
    while out.len() % alignment != 0 {
        out.push(0);
    }
}

/// Pack parameters in declaration order into uniform-buffer bytes.
///
/// Returns a minimal 16-byte zero buffer for an empty parameter list so
/// parameterless kernels can share the common bind group layout.
pub(crate) fn pack(params: &[(&'static str, UniformValue)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (_, value) in params {
        pad_to(&mut out, value.alignment());
        value.write(&mut out);
    }
    pad_to(&mut out, 16);
    if out.is_empty() {
        out.resize(16, 0);
    }
    out
}
