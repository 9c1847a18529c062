//! Encoding promotion and dithered re-encoding.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::PlanError;
use crate::types::{Encoding, SampleType};
use crate::DEFAULT_DITHER_SEED;

// 刚好低于半个量化步长：噪声加舍入误差不会超过一步
const DITHER_FRACTION: f64 = 0.435;

const WIDENING_ORDER: [SampleType; 7] = [
    SampleType::Int8,
    SampleType::UInt8,
    SampleType::Int16,
    SampleType::UInt16,
    SampleType::Int32,
    SampleType::UInt32,
    SampleType::Int64,
];

/// Dither policy for the re-encode path.
///
/// Requantizing to a different encoding rounds every sample; adding a little
/// sub-resolution noise first keeps the rounding from turning periodic
/// signal content into correlated distortion. Verbatim copies (members that
/// already carry the promoted encoding) are never dithered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dither {
    /// Plain round-to-nearest.
    Off,
    /// Triangular noise from a generator seeded with
    /// [`DEFAULT_DITHER_SEED`](crate::DEFAULT_DITHER_SEED), so repeated
    /// runs produce identical output.
    Auto,
    /// Triangular noise from a caller-chosen seed.
    Seeded(u64),
}

impl Default for Dither {
    fn default() -> Self {
        Dither::Auto
    }
}

impl Dither {
    fn rng(self) -> Option<StdRng> {
        match self {
            Dither::Off => None,
            Dither::Auto => Some(StdRng::seed_from_u64(DEFAULT_DITHER_SEED)),
            Dither::Seeded(seed) => Some(StdRng::seed_from_u64(seed)),
        }
    }
}

/// Live dither state for one conversion target.
pub(crate) struct DitherState {
    rng: Option<StdRng>,
    step: f64,
}

impl DitherState {
    pub(crate) fn new(dither: Dither, resolution: f64) -> Self {
        DitherState {
            rng: dither.rng(),
            step: DITHER_FRACTION * resolution.abs(),
        }
    }

    pub(crate) fn next_noise(&mut self) -> f64 {
        match self.rng.as_mut() {
            Some(rng) => dither_noise(rng.gen::<f64>(), self.step),
            None => 0.0,
        }
    }
}

/// Maps a uniform draw from `[0, 1)` onto triangular noise in
/// `[-step, step]` by inverse transform sampling.
fn dither_noise(uniform: f64, step: f64) -> f64 {
    let value = uniform * 2.0 * step;
    if value < step {
        (value * step).sqrt() - step
    } else {
        step - (step * (2.0 * step - value)).sqrt()
    }
}

fn all_same_bits(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0].to_bits() == w[1].to_bits())
}

// 成员的整个数字范围映射到新编码后的落点
fn reencoded_bound(member: &Encoding, digital: i64, resolution: f64, offset: f64) -> f64 {
    ((member.decode(digital) - offset) / resolution).round()
}

/// Promotes the encodings of grouped channels into one storage encoding
/// with the default picks: the smallest member resolution and a zero
/// offset (each only applied when the members actually disagree).
///
/// # Examples
///
/// ```rust
/// use onda_edf::{promote_encodings, Encoding, SampleType};
///
/// let tight = Encoding {
///     sample_type: SampleType::Int16,
///     sample_resolution_in_unit: 0.005,
///     sample_offset_in_unit: 0.0,
///     sample_rate: 256.0,
/// };
/// let coarse = Encoding { sample_resolution_in_unit: 0.01, ..tight };
///
/// let promoted = promote_encodings(&[tight, coarse]).unwrap();
/// assert_eq!(promoted.sample_resolution_in_unit, 0.005);
/// assert_eq!(promoted.sample_offset_in_unit, 0.0);
/// // the coarse channel's full range no longer fits in 16 bits
/// assert_eq!(promoted.sample_type, SampleType::Int32);
///
/// // 相同编码提升后保持不变
/// let same = promote_encodings(&[tight, tight, tight]).unwrap();
/// assert_eq!(same, tight);
/// ```
///
/// Sample rates must agree to the last bit:
///
/// ```rust
/// # use onda_edf::{promote_encodings, Encoding, PlanError, SampleType};
/// # let base = Encoding {
/// #     sample_type: SampleType::Int16,
/// #     sample_resolution_in_unit: 0.1,
/// #     sample_offset_in_unit: 0.0,
/// #     sample_rate: 256.0,
/// # };
/// let slow = Encoding { sample_rate: 128.0, ..base };
/// assert!(matches!(
///     promote_encodings(&[base, slow]),
///     Err(PlanError::RateMismatch { .. })
/// ));
/// ```
pub fn promote_encodings(encodings: &[Encoding]) -> std::result::Result<Encoding, PlanError> {
    promote_encodings_with(
        encodings,
        |resolutions| resolutions.iter().copied().fold(f64::INFINITY, f64::min),
        |_offsets| 0.0,
    )
}

/// [`promote_encodings`] with caller-chosen resolution and offset picks,
/// each consulted only when the member values differ.
pub fn promote_encodings_with<R, O>(
    encodings: &[Encoding],
    pick_resolution: R,
    pick_offset: O,
) -> std::result::Result<Encoding, PlanError>
where
    R: Fn(&[f64]) -> f64,
    O: Fn(&[f64]) -> f64,
{
    if encodings.is_empty() {
        return Err(PlanError::EmptyGroup);
    }

    // 采样率必须逐位一致
    let rate = encodings[0].sample_rate;
    if encodings
        .iter()
        .any(|e| e.sample_rate.to_bits() != rate.to_bits())
    {
        return Err(PlanError::RateMismatch {
            rates: encodings.iter().map(|e| e.sample_rate).collect(),
        });
    }

    let resolutions: Vec<f64> = encodings
        .iter()
        .map(|e| e.sample_resolution_in_unit)
        .collect();
    let resolution = if all_same_bits(&resolutions) {
        resolutions[0]
    } else {
        pick_resolution(&resolutions)
    };

    let offsets: Vec<f64> = encodings
        .iter()
        .map(|e| e.sample_offset_in_unit)
        .collect();
    let offset = if all_same_bits(&offsets) {
        offsets[0]
    } else {
        pick_offset(&offsets)
    };

    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for encoding in encodings {
        let a = reencoded_bound(encoding, encoding.sample_type.min_value(), resolution, offset);
        let b = reencoded_bound(encoding, encoding.sample_type.max_value(), resolution, offset);
        lo = lo.min(a.min(b));
        hi = hi.max(a.max(b));
    }

    let sample_type = WIDENING_ORDER
        .iter()
        .copied()
        .find(|ty| ty.fits(lo, hi))
        .ok_or(PlanError::UnrepresentableEncoding { lo, hi })?;

    Ok(Encoding {
        sample_type,
        sample_resolution_in_unit: resolution,
        sample_offset_in_unit: offset,
        sample_rate: rate,
    })
}
