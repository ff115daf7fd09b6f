//! GPU kernels: stable identity, fragment source, and typed parameters.
//!
//! Constructors mirror the CPU filter set and validate the same numeric
//! domains, so a caller can build either backend's chain from the same
//! inputs and fail identically on bad values.

use tilefx_ops::{FilterError, FilterResult};

use crate::shaders;
use crate::uniform::UniformValue;

/// Stable identity of a kernel, keying the compositor's program cache.
///
/// Two kernels with the same id share one compiled pipeline regardless of
/// their parameter values; only the uniform contents differ per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelId(pub(crate) &'static str);

impl KernelId {
    /// The kernel's name, used in logs and compile diagnostics.
    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for KernelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// One GPU filter pass: identity, fragment stage, and named parameters.
#[derive(Debug, Clone)]
pub struct GpuKernel {
    pub(crate) id: KernelId,
    pub(crate) fragment: &'static str,
    pub(crate) params: Vec<(&'static str, UniformValue)>,
}

impl GpuKernel {
    /// The kernel's stable identity.
    pub fn id(&self) -> KernelId {
        self.id
    }

    /// The kernel's name.
    pub fn name(&self) -> &'static str {
        self.id.0
    }
}

/// Additive brightness; `adjustment` must lie in [-255, 255].
pub fn brightness_kernel(adjustment: i32) -> FilterResult<GpuKernel> {
    if !(-255..=255).contains(&adjustment) {
        return Err(FilterError::ParameterRange(format!(
            "brightness adjustment {adjustment} outside [-255, 255]"
        )));
    }
    Ok(GpuKernel {
        id: KernelId("brightness"),
        fragment: shaders::BRIGHTNESS,
        params: vec![("adjustment", UniformValue::Float(adjustment as f32))],
    })
}

/// Multiplicative contrast; `adjustment` must be finite and >= 0.
pub fn contrast_kernel(adjustment: f32) -> FilterResult<GpuKernel> {
    if !adjustment.is_finite() || adjustment < 0.0 {
        return Err(FilterError::ParameterRange(format!(
            "contrast adjustment {adjustment} must be a finite value >= 0"
        )));
    }
    Ok(GpuKernel {
        id: KernelId("contrast"),
        fragment: shaders::CONTRAST,
        params: vec![("adjustment", UniformValue::Float(adjustment))],
    })
}

/// Power-curve gamma; `adjustment` must be finite and >= 0.
pub fn gamma_kernel(adjustment: f32) -> FilterResult<GpuKernel> {
    if !adjustment.is_finite() || adjustment < 0.0 {
        return Err(FilterError::ParameterRange(format!(
            "gamma adjustment {adjustment} must be a finite value >= 0"
        )));
    }
    Ok(GpuKernel {
        id: KernelId("gamma"),
        fragment: shaders::GAMMA,
        params: vec![("adjustment", UniformValue::Float(adjustment))],
    })
}

/// Channel inversion.
pub fn invert_kernel() -> GpuKernel {
    GpuKernel {
        id: KernelId("invert"),
        fragment: shaders::INVERT,
        params: Vec::new(),
    }
}

/// Channel-average greyscale.
pub fn greyscale_kernel() -> GpuKernel {
    GpuKernel {
        id: KernelId("greyscale"),
        fragment: shaders::GREYSCALE,
        params: Vec::new(),
    }
}

/// Binarization on the channel average; `threshold` must lie in [0, 255].
pub fn threshold_kernel(threshold: i32) -> FilterResult<GpuKernel> {
    if !(0..=255).contains(&threshold) {
        return Err(FilterError::ParameterRange(format!(
            "threshold {threshold} outside [0, 255]"
        )));
    }
    Ok(GpuKernel {
        id: KernelId("threshold"),
        fragment: shaders::THRESHOLD,
        params: vec![("threshold", UniformValue::Float(threshold as f32))],
    })
}

/// 3x3 convolution; exactly nine row-major weights.
pub fn convolution3x3_kernel(kernel: &[f32]) -> FilterResult<GpuKernel> {
    if kernel.len() != 9 {
        return Err(FilterError::ParameterRange(format!(
            "convolution kernel must have exactly 9 weights, got {}",
            kernel.len()
        )));
    }
    Ok(GpuKernel {
        id: KernelId("convolution3x3"),
        fragment: shaders::CONVOLUTION3X3,
        params: vec![("kernel", UniformValue::FloatArray(kernel.to_vec()))],
    })
}

/// Maximum number of colormap stops the kernel's uniform array holds.
pub const MAX_COLORMAP_STOPS: usize = 16;

/// Piecewise-linear colormap over the channel average.
///
/// Stops are RGB triples with components in [0, 255], at most
/// [`MAX_COLORMAP_STOPS`]; they are normalized before upload.
/// `centerpoint` must lie in [1, 254].
pub fn colormap_kernel(stops: &[[f32; 3]], centerpoint: i32) -> FilterResult<GpuKernel> {
    if stops.is_empty() {
        return Err(FilterError::EmptyColorStops);
    }
    if stops.len() > MAX_COLORMAP_STOPS {
        return Err(FilterError::ParameterRange(format!(
            "colormap supports at most {MAX_COLORMAP_STOPS} stops, got {}",
            stops.len()
        )));
    }
    for stop in stops {
        for &c in stop {
            if !(0.0..=255.0).contains(&c) || !c.is_finite() {
                return Err(FilterError::ParameterRange(format!(
                    "colormap component {c} outside [0, 255]"
                )));
            }
        }
    }
    if !(1..=254).contains(&centerpoint) {
        return Err(FilterError::ParameterRange(format!(
            "colormap centerpoint {centerpoint} outside [1, 254]"
        )));
    }
    // Pad to the full uniform array; the shader only reads the first
    // `num_stops` entries.
    let mut normalized = vec![[0.0f32; 3]; MAX_COLORMAP_STOPS];
    for (dst, src) in normalized.iter_mut().zip(stops) {
        for (d, &s) in dst.iter_mut().zip(src) {
            *d = s / 255.0;
        }
    }
    Ok(GpuKernel {
        id: KernelId("colormap"),
        fragment: shaders::COLORMAP,
        params: vec![
            ("stops", UniformValue::Vec3Array(normalized)),
            ("num_stops", UniformValue::Int(stops.len() as i32)),
            ("centerpoint", UniformValue::Float(centerpoint as f32)),
        ],
    })
}

fn window_size(size: u32) -> FilterResult<i32> {
    if size % 2 == 0 {
        return Err(FilterError::EvenKernelSize(size));
    }
    if size < 3 {
        return Err(FilterError::ParameterRange(format!(
            "morphology kernel size {size} must be >= 3"
        )));
    }
    Ok(size as i32)
}

/// Per-channel maximum over an odd `size` x `size` window, `size` >= 3.
pub fn dilation_kernel(size: u32) -> FilterResult<GpuKernel> {
    Ok(GpuKernel {
        id: KernelId("dilation"),
        fragment: shaders::DILATION,
        params: vec![("size", UniformValue::Int(window_size(size)?))],
    })
}

/// Per-channel minimum over an odd `size` x `size` window, `size` >= 3.
pub fn erosion_kernel(size: u32) -> FilterResult<GpuKernel> {
    Ok(GpuKernel {
        id: KernelId("erosion"),
        fragment: shaders::EROSION,
        params: vec![("size", UniformValue::Int(window_size(size)?))],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_validate_domains() {
        assert!(brightness_kernel(256).is_err());
        assert!(brightness_kernel(-256).is_err());
        assert!(brightness_kernel(-255).is_ok());
        assert!(contrast_kernel(-0.1).is_err());
        assert!(contrast_kernel(f32::NAN).is_err());
        assert!(gamma_kernel(0.0).is_ok());
        assert!(threshold_kernel(-1).is_err());
        assert!(threshold_kernel(255).is_ok());
        assert!(convolution3x3_kernel(&[0.0; 8]).is_err());
        assert!(convolution3x3_kernel(&[0.0; 9]).is_ok());
    }

    #[test]
    fn test_morphology_requires_odd_size_at_least_three() {
        assert!(matches!(dilation_kernel(4), Err(FilterError::EvenKernelSize(4))));
        assert!(erosion_kernel(1).is_err());
        assert!(dilation_kernel(3).is_ok());
        assert!(erosion_kernel(5).is_ok());
    }

    #[test]
    fn test_colormap_validation_and_normalization() {
        assert!(matches!(colormap_kernel(&[], 128), Err(FilterError::EmptyColorStops)));
        assert!(colormap_kernel(&[[0.0, 0.0, 256.0]], 128).is_err());
        assert!(colormap_kernel(&[[0.0; 3]; 17], 128).is_err());
        assert!(colormap_kernel(&[[0.0; 3], [255.0; 3]], 0).is_err());

        let kernel = colormap_kernel(&[[0.0, 0.0, 0.0], [255.0, 255.0, 255.0]], 128).unwrap();
        match &kernel.params[0].1 {
            UniformValue::Vec3Array(stops) => {
                assert_eq!(stops.len(), MAX_COLORMAP_STOPS);
                assert_eq!(stops[1], [1.0, 1.0, 1.0]);
            }
            other => panic!("unexpected stops encoding: {other:?}"),
        }
        assert_eq!(kernel.params[1].1, UniformValue::Int(2));
    }

    #[test]
    fn test_kernel_identity_is_stable_across_parameters() {
        let a = brightness_kernel(10).unwrap();
        let b = brightness_kernel(200).unwrap();
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), invert_kernel().id());
    }
}
