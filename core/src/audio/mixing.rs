//! Per-sample mixing helpers: panning, distance attenuation, channel
//! conversion and soft clipping

use glam::Vec3;

/// cos(i * PI/32) for i = 0..16, scaled to 0-255.
const PAN_COS_LUT: [u8; 17] = [
    255, 254, 251, 245, 237, 226, 213, 198, 181, 162, 142, 121, 98, 75, 51, 26, 0,
];

/// Equal-power (left, right) gains for `pan` in [-1, 1].
#[inline]
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let pos = (pan.clamp(-1.0, 1.0) + 1.0) * 8.0;
    let idx = (pos as usize).min(15);
    let frac = pos - idx as f32;

    let left = PAN_COS_LUT[idx] as f32 * (1.0 - frac) + PAN_COS_LUT[idx + 1] as f32 * frac;
    let right = PAN_COS_LUT[16 - idx] as f32 * (1.0 - frac) + PAN_COS_LUT[15 - idx] as f32 * frac;

    (left / 255.0, right / 255.0)
}

/// Pans a mono sample into a stereo pair with `volume` applied.
///
/// `pan = 0` puts the source in the center at -3dB per side.
#[inline]
pub fn apply_pan(sample: f32, pan: f32, volume: f32) -> (f32, f32) {
    let (left, right) = pan_gains(pan);
    let scaled = sample * volume;
    (scaled * left, scaled * right)
}

/// Sources closer than this to the listener are centered.
const CENTER_RADIUS: f32 = 1e-4;

/// Pan derived from a listener-relative position: the normalized x
/// component, or center for a source at the listener.
#[inline]
pub fn pan_from_relative(relative: Vec3) -> f32 {
    let distance = relative.length();
    if distance <= CENTER_RADIUS {
        0.0
    } else {
        (relative.x / distance).clamp(-1.0, 1.0)
    }
}

/// Inverse-distance attenuation, clamped to `[min_distance, max_distance]`.
#[inline]
pub fn distance_gain(distance: f32, min_distance: f32, max_distance: f32, rolloff: f32) -> f32 {
    if min_distance <= 0.0 {
        return 1.0;
    }
    let d = distance.clamp(min_distance, max_distance.max(min_distance));
    let denom = min_distance + rolloff * (d - min_distance);
    if denom <= 0.0 { 1.0 } else { min_distance / denom }
}

/// Maps one interleaved frame between channel layouts.
///
/// Mono is duplicated into every output channel; downmixing averages the
/// source channels folded onto each output channel; other upmixes repeat
/// the source layout.
#[inline]
pub fn convert_frame(src: &[f32], dst: &mut [f32]) {
    let (from, to) = (src.len(), dst.len());
    if from == to {
        dst.copy_from_slice(src);
    } else if from == 1 {
        dst.fill(src[0]);
    } else if to == 1 {
        dst[0] = src.iter().sum::<f32>() / from as f32;
    } else if from > to {
        dst.fill(0.0);
        let mut counts = [0u8; 8];
        for (i, s) in src.iter().enumerate() {
            dst[i % to] += s;
            counts[(i % to).min(7)] += 1;
        }
        for (d, n) in dst.iter_mut().zip(counts) {
            if n > 1 {
                *d /= n as f32;
            }
        }
    } else {
        for (i, d) in dst.iter_mut().enumerate() {
            *d = src[i % from];
        }
    }
}

/// tanh(t) for t = 0.00, 0.25, ..., 7.00.
const TANH_LUT: [f32; 29] = [
    0.0, 0.244919, 0.462117, 0.635149, 0.761594, 0.848284, 0.905148, 0.941389, 0.964028,
    0.978034, 0.986614, 0.991815, 0.995055, 0.997109, 0.998396, 0.999198, 0.999665, 0.999892,
    0.999988, 0.999998, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0,
];

/// Soft clipper: identity in [-1, 1], `sign(x) * (1 + tanh(|x| - 1))`
/// outside, so the output stays below 2 in magnitude.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    if x.abs() <= 1.0 {
        return x;
    }
    if !x.is_finite() {
        return if x.is_nan() { 0.0 } else { x.signum() * 2.0 };
    }

    let pos = (x.abs() - 1.0).min(7.0) * 4.0;
    let idx = (pos as usize).min(27);
    let frac = pos - idx as f32;
    let tanh = TANH_LUT[idx] * (1.0 - frac) + TANH_LUT[idx + 1] * frac;

    x.signum() * (1.0 + tanh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pan_extremes_and_center() {
        assert_eq!(pan_gains(-1.0), (1.0, 0.0));
        assert_eq!(pan_gains(1.0), (0.0, 1.0));
        let (l, r) = pan_gains(0.0);
        assert!((l - r).abs() < 1e-6);
        assert!((l * l + r * r - 1.0).abs() < 0.02);
    }

    #[test]
    fn test_pan_from_relative() {
        assert_eq!(pan_from_relative(Vec3::ZERO), 0.0);
        assert_eq!(pan_from_relative(Vec3::new(3.0, 0.0, 0.0)), 1.0);
        assert_eq!(pan_from_relative(Vec3::new(-2.0, 0.0, 0.0)), -1.0);
        assert_eq!(pan_from_relative(Vec3::new(0.0, 0.0, -5.0)), 0.0);
    }

    #[test]
    fn test_distance_gain_clamped_inverse() {
        assert_eq!(distance_gain(0.0, 1.0, 100.0, 1.0), 1.0);
        assert_eq!(distance_gain(1.0, 1.0, 100.0, 1.0), 1.0);
        assert_eq!(distance_gain(3.0, 1.0, 100.0, 1.0), 1.0 / 3.0);
        assert_eq!(distance_gain(1000.0, 1.0, 9.0, 1.0), 1.0 / 9.0);
        assert_eq!(distance_gain(5.0, 1.0, 100.0, 0.0), 1.0);
    }

    #[test]
    fn test_convert_frame_layouts() {
        let mut stereo = [0.0; 2];
        convert_frame(&[0.5], &mut stereo);
        assert_eq!(stereo, [0.5, 0.5]);

        let mut mono = [0.0; 1];
        convert_frame(&[0.2, 0.6], &mut mono);
        assert!((mono[0] - 0.4).abs() < 1e-6);

        let mut quad = [0.0; 4];
        convert_frame(&[0.1, 0.2], &mut quad);
        assert_eq!(quad, [0.1, 0.2, 0.1, 0.2]);

        let mut down = [0.0; 2];
        convert_frame(&[1.0, 0.0, 0.0, 1.0], &mut down);
        assert_eq!(down, [0.5, 0.5]);
    }

    #[test]
    fn test_soft_clip() {
        assert_eq!(soft_clip(0.5), 0.5);
        assert_eq!(soft_clip(-1.0), -1.0);
        assert!(soft_clip(1.5) > 1.0 && soft_clip(1.5) < 2.0);
        assert!(soft_clip(-20.0) >= -2.0);
        assert_eq!(soft_clip(f32::NAN), 0.0);
    }
}
