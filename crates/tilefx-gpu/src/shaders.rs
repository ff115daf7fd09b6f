//! WGSL kernel library.
//!
//! Every kernel shares the fullscreen-triangle vertex stage; each constant
//! below is the fragment stage for one filter. The compositor concatenates
//! the two into a single module at compile time. All fragments sample
//! `src_tex` through `src_samp` (clamp-to-edge) and bind their parameters
//! as a uniform struct at binding 2, laid out to match
//! [`uniform::pack`](crate::uniform::pack).

/// Shared vertex stage: a single fullscreen triangle from the vertex index,
/// no vertex buffers.
pub(crate) const FULLSCREEN_VERTEX: &str = r#"
struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) vi: u32) -> VsOut {
    let xy = vec2<f32>(f32((vi << 1u) & 2u), f32(vi & 2u));
    var out: VsOut;
    out.pos = vec4<f32>(xy * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(xy.x, 1.0 - xy.y);
    return out;
}

@group(0) @binding(0) var src_tex: texture_2d<f32>;
@group(0) @binding(1) var src_samp: sampler;
"#;

/// `adjustment` in [-255, 255], added to each channel.
pub(crate) const BRIGHTNESS: &str = r#"
struct Params { adjustment: f32 }
@group(0) @binding(2) var<uniform> params: Params;

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let color = textureSample(src_tex, src_samp, in.uv);
    return vec4<f32>(color.rgb + vec3<f32>(params.adjustment / 255.0), color.a);
}
"#;

/// `adjustment` >= 0, multiplies each channel.
pub(crate) const CONTRAST: &str = r#"
struct Params { adjustment: f32 }
@group(0) @binding(2) var<uniform> params: Params;

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let color = textureSample(src_tex, src_samp, in.uv);
    return vec4<f32>(color.rgb * params.adjustment, color.a);
}
"#;

/// `adjustment` >= 0, per-channel power curve.
pub(crate) const GAMMA: &str = r#"
struct Params { adjustment: f32 }
@group(0) @binding(2) var<uniform> params: Params;

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let color = textureSample(src_tex, src_samp, in.uv);
    return vec4<f32>(pow(color.rgb, vec3<f32>(params.adjustment)), color.a);
}
"#;

pub(crate) const INVERT: &str = r#"
@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let color = textureSample(src_tex, src_samp, in.uv);
    return vec4<f32>(vec3<f32>(1.0) - color.rgb, color.a);
}
"#;

pub(crate) const GREYSCALE: &str = r#"
@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let color = textureSample(src_tex, src_samp, in.uv);
    let grey = (color.r + color.g + color.b) / 3.0;
    return vec4<f32>(vec3<f32>(grey), color.a);
}
"#;

/// Binarizes on the channel average against `threshold` in [0, 255].
pub(crate) const THRESHOLD: &str = r#"
struct Params { threshold: f32 }
@group(0) @binding(2) var<uniform> params: Params;

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let color = textureSample(src_tex, src_samp, in.uv);
    let grey = (color.r + color.g + color.b) / 3.0;
    let value = select(1.0, 0.0, grey < params.threshold / 255.0);
    return vec4<f32>(vec3<f32>(value), color.a);
}
"#;

/// 3x3 convolution; nine weights in row-major order, one per 16-byte slot.
/// Clamp-to-edge sampling stands in for the CPU path's in-bounds policy.
pub(crate) const CONVOLUTION3X3: &str = r#"
struct Params { kernel: array<vec4<f32>, 9> }
@group(0) @binding(2) var<uniform> params: Params;

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let one_px = vec2<f32>(1.0) / vec2<f32>(textureDimensions(src_tex));
    var sum = vec3<f32>(0.0);
    for (var ky = 0; ky < 3; ky++) {
        for (var kx = 0; kx < 3; kx++) {
            let offset = vec2<f32>(f32(kx - 1), f32(ky - 1)) * one_px;
            let c = textureSampleLevel(src_tex, src_samp, in.uv + offset, 0.0);
            sum += c.rgb * params.kernel[ky * 3 + kx].x;
        }
    }
    let alpha = textureSample(src_tex, src_samp, in.uv).a;
    return vec4<f32>(sum, alpha);
}
"#;

/// Piecewise-linear colormap over the channel average. `stops` are
/// normalized colors, one per slot; `centerpoint` splits the grey range.
pub(crate) const COLORMAP: &str = r#"
struct Params {
    stops: array<vec4<f32>, 16>,
    num_stops: i32,
    centerpoint: f32,
}
@group(0) @binding(2) var<uniform> params: Params;

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let color = textureSample(src_tex, src_samp, in.uv);
    let grey = (color.r + color.g + color.b) / 3.0;
    let center = params.centerpoint / 255.0;
    var normalized: f32;
    if (grey < center) {
        normalized = grey / center;
    } else {
        normalized = (grey - center) / (1.0 - center);
    }
    let stop_index = normalized * f32(params.num_stops - 1);
    let lower = clamp(i32(floor(stop_index)), 0, params.num_stops - 1);
    let upper = clamp(i32(ceil(stop_index)), 0, params.num_stops - 1);
    let t = fract(stop_index);
    let mapped = mix(params.stops[lower].rgb, params.stops[upper].rgb, t);
    return vec4<f32>(mapped, color.a);
}
"#;

/// Per-channel maximum over an odd `size` x `size` window.
pub(crate) const DILATION: &str = r#"
struct Params { size: i32 }
@group(0) @binding(2) var<uniform> params: Params;

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let one_px = vec2<f32>(1.0) / vec2<f32>(textureDimensions(src_tex));
    let half = (params.size - 1) / 2;
    var best = vec3<f32>(0.0);
    for (var ky = -half; ky <= half; ky++) {
        for (var kx = -half; kx <= half; kx++) {
            let offset = vec2<f32>(f32(kx), f32(ky)) * one_px;
            let c = textureSampleLevel(src_tex, src_samp, in.uv + offset, 0.0);
            best = max(best, c.rgb);
        }
    }
    let alpha = textureSample(src_tex, src_samp, in.uv).a;
    return vec4<f32>(best, alpha);
}
"#;

/// Per-channel minimum over an odd `size` x `size` window.
pub(crate) const EROSION: &str = r#"
struct Params { size: i32 }
@group(0) @binding(2) var<uniform> params: Params;

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let one_px = vec2<f32>(1.0) / vec2<f32>(textureDimensions(src_tex));
    let half = (params.size - 1) / 2;
    var best = vec3<f32>(1.0);
    for (var ky = -half; ky <= half; ky++) {
        for (var kx = -half; kx <= half; kx++) {
            let offset = vec2<f32>(f32(kx), f32(ky)) * one_px;
            let c = textureSampleLevel(src_tex, src_samp, in.uv + offset, 0.0);
            best = min(best, c.rgb);
        }
    }
    let alpha = textureSample(src_tex, src_samp, in.uv).a;
    return vec4<f32>(best, alpha);
}
"#;
