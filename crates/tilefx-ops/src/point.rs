//! Point filters: per-pixel transforms with no neighborhood access.
//!
//! The table-based filters precompute their 256-entry LUT once at
//! construction; application is a per-channel table lookup. Alpha is never
//! touched.

use tilefx_core::buffer::CHANNELS;
use tilefx_core::PixelBuffer;

use crate::{CpuFilter, FilterError, FilterResult};

/// Brightness adjustment: adds `adjustment` to every channel.
///
/// `adjustment` must be in `[-255, 255]`.
pub fn brightness(adjustment: i32) -> FilterResult<CpuFilter> {
    if !(-255..=255).contains(&adjustment) {
        return Err(FilterError::ParameterRange(format!(
            "brightness adjustment must be between -255 and 255, got {adjustment}"
        )));
    }
    Ok(CpuFilter::PointLut {
        name: "brightness",
        lut: build_lut(|i| i as f32 + adjustment as f32),
    })
}

/// Contrast adjustment: multiplies every channel by `adjustment`.
///
/// `adjustment` must be finite and non-negative.
pub fn contrast(adjustment: f32) -> FilterResult<CpuFilter> {
    if !adjustment.is_finite() || adjustment < 0.0 {
        return Err(FilterError::ParameterRange(format!(
            "contrast adjustment must be positive, got {adjustment}"
        )));
    }
    Ok(CpuFilter::PointLut {
        name: "contrast",
        lut: build_lut(|i| i as f32 * adjustment),
    })
}

/// Gamma correction: `(v / 255) ^ adjustment * 255` per channel.
///
/// `adjustment` must be finite and non-negative.
pub fn gamma(adjustment: f32) -> FilterResult<CpuFilter> {
    if !adjustment.is_finite() || adjustment < 0.0 {
        return Err(FilterError::ParameterRange(format!(
            "gamma adjustment must be positive, got {adjustment}"
        )));
    }
    Ok(CpuFilter::PointLut {
        name: "gamma",
        lut: build_lut(|i| (i as f32 / 255.0).powf(adjustment) * 255.0),
    })
}

/// Channel inversion: `255 - v`. Applying it twice is the identity.
pub fn invert() -> CpuFilter {
    CpuFilter::PointLut {
        name: "invert",
        lut: build_lut(|i| 255.0 - i as f32),
    }
}

/// Binary threshold: channels below `threshold` become 0, the rest 255.
///
/// `threshold` must be in `[0, 255]`.
pub fn threshold(threshold: i32) -> FilterResult<CpuFilter> {
    if !(0..=255).contains(&threshold) {
        return Err(FilterError::ParameterRange(format!(
            "threshold must be between 0 and 255, got {threshold}"
        )));
    }
    Ok(CpuFilter::PointLut {
        name: "threshold",
        lut: build_lut(|i| if (i as i32) < threshold { 0.0 } else { 255.0 }),
    })
}

/// Greyscale conversion: the un-weighted average of R,G,B replaces all
/// three channels. Deliberately not a luminance-weighted average.
pub fn greyscale() -> CpuFilter {
    CpuFilter::Greyscale
}

/// Colormap: maps the grey average through a two-segment interpolated ramp.
///
/// The `[0, 255]` grey range is split at `centerpoint` into two segments,
/// each normalized to `[0, 1]` and linearly interpolated across `stops`
/// (RGB triples in `0..=255`). `centerpoint` must be in `[1, 254]` so both
/// segment widths stay non-zero; `stops` must be non-empty.
pub fn colormap(stops: &[[f32; 3]], centerpoint: i32) -> FilterResult<CpuFilter> {
    if stops.is_empty() {
        return Err(FilterError::EmptyColorStops);
    }
    if !(1..=254).contains(&centerpoint) {
        return Err(FilterError::ParameterRange(format!(
            "colormap centerpoint must be between 1 and 254, got {centerpoint}"
        )));
    }
    for (i, stop) in stops.iter().enumerate() {
        for &c in stop {
            if !c.is_finite() || !(0.0..=255.0).contains(&c) {
                return Err(FilterError::ParameterRange(format!(
                    "colormap stop {i} component must be between 0 and 255, got {c}"
                )));
            }
        }
    }

    let center = centerpoint as f32;
    let mut map = Box::new([[0u8; 3]; 256]);
    for (i, entry) in map.iter_mut().enumerate() {
        let i = i as f32;
        let normalized = if i < center {
            i / center
        } else {
            (i - center) / (255.0 - center)
        };
        let stop_index = normalized * (stops.len() - 1) as f32;
        let lower = stop_index.floor() as usize;
        let upper = stop_index.ceil() as usize;
        let t = stop_index - lower as f32;
        for c in 0..3 {
            let v = stops[lower][c] * (1.0 - t) + stops[upper][c] * t;
            entry[c] = clamp_u8(v);
        }
    }
    Ok(CpuFilter::Colormap { map })
}

fn build_lut(f: impl Fn(usize) -> f32) -> Box<[u8; 256]> {
    let mut lut = Box::new([0u8; 256]);
    for (i, v) in lut.iter_mut().enumerate() {
        *v = clamp_u8(f(i));
    }
    lut
}

#[inline]
pub(crate) fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

pub(crate) fn apply_lut(buf: &mut PixelBuffer, lut: &[u8; 256]) {
    for px in buf.as_bytes_mut().chunks_exact_mut(CHANNELS) {
        px[0] = lut[px[0] as usize];
        px[1] = lut[px[1] as usize];
        px[2] = lut[px[2] as usize];
    }
}

pub(crate) fn apply_greyscale(buf: &mut PixelBuffer) {
    for px in buf.as_bytes_mut().chunks_exact_mut(CHANNELS) {
        let avg = (px[0] as f32 + px[1] as f32 + px[2] as f32) / 3.0;
        let v = clamp_u8(avg);
        px[0] = v;
        px[1] = v;
        px[2] = v;
    }
}

pub(crate) fn apply_colormap(buf: &mut PixelBuffer, map: &[[u8; 3]; 256]) {
    for px in buf.as_bytes_mut().chunks_exact_mut(CHANNELS) {
        let grey = clamp_u8((px[0] as f32 + px[1] as f32 + px[2] as f32) / 3.0);
        let rgb = map[grey as usize];
        px[0] = rgb[0];
        px[1] = rgb[1];
        px[2] = rgb[2];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grey_buf(w: u32, h: u32, v: u8) -> PixelBuffer {
        PixelBuffer::filled(w, h, [v, v, v, 255]).unwrap()
    }

    #[test]
    fn test_brightness_lut_and_clamp() {
        let f = brightness(50).unwrap();
        let mut buf = grey_buf(2, 2, 230);
        f.apply(&mut buf);
        // 230 + 50 clamps to 255.
        assert_eq!(buf.pixel(0, 0), [255, 255, 255, 255]);

        let f = brightness(-100).unwrap();
        let mut buf = grey_buf(2, 2, 40);
        f.apply(&mut buf);
        assert_eq!(buf.pixel(1, 1), [0, 0, 0, 255]);
    }

    #[test]
    fn test_brightness_range() {
        assert!(brightness(255).is_ok());
        assert!(brightness(-255).is_ok());
        assert!(brightness(256).is_err());
        assert!(brightness(-256).is_err());
    }

    #[test]
    fn test_contrast_domain() {
        assert!(contrast(0.0).is_ok());
        assert!(contrast(2.5).is_ok());
        assert!(contrast(-0.1).is_err());
        assert!(contrast(f32::NAN).is_err());
    }

    #[test]
    fn test_gamma_identity_at_one() {
        let f = gamma(1.0).unwrap();
        let mut buf = grey_buf(3, 3, 77);
        f.apply(&mut buf);
        assert_eq!(buf.pixel(2, 2), [77, 77, 77, 255]);
        assert!(gamma(-1.0).is_err());
    }

    #[test]
    fn test_invert_roundtrip_exact() {
        let mut buf = PixelBuffer::from_raw(
            2,
            1,
            vec![0, 1, 127, 9, 128, 254, 255, 200],
        )
        .unwrap();
        let original = buf.clone();
        let f = invert();
        f.apply(&mut buf);
        assert_ne!(buf, original);
        f.apply(&mut buf);
        // 255 - (255 - v) = v, alpha untouched both times.
        assert_eq!(buf, original);
    }

    #[test]
    fn test_threshold_per_channel() {
        let f = threshold(128).unwrap();
        let mut buf = PixelBuffer::from_raw(1, 1, vec![10, 128, 200, 42]).unwrap();
        f.apply(&mut buf);
        assert_eq!(buf.pixel(0, 0), [0, 255, 255, 42]);
        assert!(threshold(-1).is_err());
        assert!(threshold(256).is_err());
    }

    #[test]
    fn test_greyscale_average_not_luminance() {
        let mut buf = PixelBuffer::from_raw(1, 1, vec![30, 60, 90, 7]).unwrap();
        greyscale().apply(&mut buf);
        // (30 + 60 + 90) / 3 = 60; BT.709 would give ~60.9 weighted differently.
        assert_eq!(buf.pixel(0, 0), [60, 60, 60, 7]);
    }

    #[test]
    fn test_colormap_endpoints() {
        // Black-to-red below the centerpoint, red-to-white above it.
        let stops = [[0.0, 0.0, 0.0], [255.0, 0.0, 0.0]];
        let f = colormap(&stops, 128).unwrap();
        let mut buf = PixelBuffer::from_raw(2, 1, vec![0, 0, 0, 255, 255, 255, 255, 255]).unwrap();
        f.apply(&mut buf);
        // Grey 0 -> first stop; grey 255 -> last stop. Alpha untouched.
        assert_eq!(buf.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(buf.pixel(1, 0), [255, 0, 0, 255]);
    }

    #[test]
    fn test_colormap_validation() {
        assert!(matches!(
            colormap(&[], 128),
            Err(FilterError::EmptyColorStops)
        ));
        assert!(colormap(&[[0.0, 0.0, 0.0]], 0).is_err());
        assert!(colormap(&[[0.0, 0.0, 0.0]], 255).is_err());
        assert!(colormap(&[[0.0, 0.0, 300.0]], 128).is_err());
    }

    #[test]
    fn test_colormap_midpoint_interpolates() {
        use approx::assert_abs_diff_eq;

        let stops = [[0.0, 0.0, 0.0], [200.0, 100.0, 50.0]];
        let f = colormap(&stops, 128).unwrap();
        // Grey 64 normalizes to 0.5 of the lower segment.
        let mut buf = grey_buf(1, 1, 64);
        f.apply(&mut buf);
        let px = buf.pixel(0, 0);
        assert_abs_diff_eq!(px[0] as f32, 100.0, epsilon = 1.0);
        assert_abs_diff_eq!(px[1] as f32, 50.0, epsilon = 1.0);
        assert_abs_diff_eq!(px[2] as f32, 25.0, epsilon = 1.0);
    }

    #[test]
    fn test_single_stop_colormap_is_constant() {
        let f = colormap(&[[10.0, 20.0, 30.0]], 100).unwrap();
        let mut buf = grey_buf(2, 2, 180);
        f.apply(&mut buf);
        assert_eq!(buf.pixel(0, 1), [10, 20, 30, 255]);
    }
}
