//! Export back to EDF-shaped channels.
//!
//! The inverse direction is deliberately encoding-preserving: each output
//! channel keeps the digital values and the encoding of its Onda signal,
//! so exporting and re-importing is lossless. Serializing header bytes is
//! a separate concern; this module reconstructs per-channel headers and
//! sample runs.

use log::debug;

use crate::error::{OndaEdfError, Result};
use crate::types::{Samples, SignalHeader};

// 记录时长超过2^53秒后f64除法不再能精确还原采样率
const MAX_RECORD_SECONDS: u128 = 1 << 53;

/// One EDF-shaped output channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedChannel {
    pub header: SignalHeader,
    /// Record duration in seconds, shared by every channel of one export.
    pub seconds_per_record: f64,
    /// Digital samples, copied from the source matrix row unmodified.
    pub samples: Vec<i64>,
}

/// Lays converted signals back out as EDF channels, one per matrix row,
/// in input order (signals first, then channels within each signal).
///
/// Each header re-derives its EDF calibration from the signal's encoding:
/// the digital bounds are the sample type's range clamped to the header's
/// `i32` fields, and the physical bounds are those digital bounds decoded
/// through the signal's own resolution and offset. The record duration is
/// the least common multiple of the rationalized sample rates'
/// denominators, so every signal gets a whole number of samples per record
/// and `samples_per_record / seconds_per_record` gives back each input
/// rate bit for bit. A rate with no such layout (non-finite, non-positive,
/// or needing more samples per record than the header field holds) is an
/// [`UnrepresentableRate`](OndaEdfError::UnrepresentableRate) error.
///
/// # Examples
///
/// ```rust
/// use onda_edf::{onda_to_edf, Samples, SamplesInfo, SampleType};
///
/// let samples = Samples {
///     info: SamplesInfo {
///         sensor_type: "eeg".to_string(),
///         sensor_label: "eeg".to_string(),
///         channels: vec!["c3".to_string(), "c4".to_string()],
///         sample_unit: "microvolt".to_string(),
///         sample_resolution_in_unit: 0.25,
///         sample_offset_in_unit: 0.0,
///         sample_type: SampleType::Int16,
///         sample_rate: 128.0,
///     },
///     edf_channels: vec!["EEG C3-M2".to_string(), "EEG C4-M1".to_string()],
///     data: vec![0, 4, -4, 8, 400, -400],
/// };
///
/// let channels = onda_to_edf(&[samples]).unwrap();
/// assert_eq!(channels.len(), 2);
/// assert_eq!(channels[0].header.label, "c3");
/// assert_eq!(channels[0].header.physical_dimension, "microvolt");
/// assert_eq!(channels[0].header.samples_per_record, 128);
/// assert_eq!(channels[0].seconds_per_record, 1.0);
/// assert_eq!(channels[0].samples, vec![0, 4, -4]);
/// assert_eq!(channels[1].samples, vec![8, 400, -400]);
/// ```
pub fn onda_to_edf(signals: &[Samples]) -> Result<Vec<ExportedChannel>> {
    // 记录时长取各路采样率化成最简分数后分母的最小公倍数，
    // 每路信号每条记录都是整数个样本
    let mut record_seconds: u128 = 1;
    let mut rates: Vec<(u128, u128)> = Vec::with_capacity(signals.len());
    for samples in signals {
        let rate = samples.info.sample_rate;
        let (numerator, denominator) = rationalize_rate(rate)
            .ok_or(OndaEdfError::UnrepresentableRate { sample_rate: rate })?;
        record_seconds = (record_seconds / gcd(record_seconds, denominator))
            .checked_mul(denominator)
            .filter(|&seconds| seconds <= MAX_RECORD_SECONDS)
            .ok_or(OndaEdfError::UnrepresentableRate { sample_rate: rate })?;
        rates.push((numerator, denominator));
    }

    let mut channels = Vec::new();
    for (samples, (numerator, denominator)) in signals.iter().zip(rates) {
        let info = &samples.info;
        let encoding = info.encoding();
        // 头部的数字界限字段只有i32宽，更宽的存储类型取其可表达部分
        let digital_minimum = clamp_to_header_field(info.sample_type.min_value());
        let digital_maximum = clamp_to_header_field(info.sample_type.max_value());
        let samples_per_record = numerator
            .checked_mul(record_seconds / denominator)
            .filter(|&count| count <= i32::MAX as u128)
            .ok_or(OndaEdfError::UnrepresentableRate {
                sample_rate: info.sample_rate,
            })? as i32;

        for (index, channel) in info.channels.iter().enumerate() {
            channels.push(ExportedChannel {
                header: SignalHeader {
                    label: channel.clone(),
                    transducer_type: String::new(),
                    physical_dimension: info.sample_unit.clone(),
                    physical_minimum: encoding.decode(digital_minimum as i64),
                    physical_maximum: encoding.decode(digital_maximum as i64),
                    digital_minimum,
                    digital_maximum,
                    prefilter: String::new(),
                    samples_per_record,
                },
                seconds_per_record: record_seconds as f64,
                samples: samples.channel_samples(index).to_vec(),
            });
        }
    }
    debug!(
        "laid out {} EDF channels from {} signals",
        channels.len(),
        signals.len()
    );
    Ok(channels)
}

fn clamp_to_header_field(bound: i64) -> i32 {
    bound.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Turns a sample rate into the simplest fraction that divides back to it.
///
/// Walks the continued-fraction expansion of the rate's exact binary value
/// and stops at the first convergent whose `f64` quotient reproduces the
/// rate, so `0.4` comes out as `2/5` rather than its 54-bit binary
/// fraction. `None` for rates that are not finite and positive or whose
/// expansion overflows.
fn rationalize_rate(rate: f64) -> Option<(u128, u128)> {
    if !rate.is_finite() || rate <= 0.0 {
        return None;
    }
    // f64的精确值是 mantissa × 2^exponent
    let bits = rate.to_bits();
    let raw_exponent = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mantissa, exponent) = if raw_exponent == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1 << 52), raw_exponent - 1075)
    };
    let (mut remainder, mut divisor): (u128, u128) = if exponent >= 0 {
        if exponent > 74 {
            return None;
        }
        ((mantissa as u128) << exponent, 1)
    } else if exponent >= -127 {
        (mantissa as u128, 1 << -exponent)
    } else {
        return None;
    };

    // 收敛子递推 h_n = a_n·h_{n-1} + h_{n-2}，辗转相除出连分数系数
    let (mut h_prev, mut k_prev): (u128, u128) = (0, 1);
    let (mut h_last, mut k_last): (u128, u128) = (1, 0);
    while divisor != 0 {
        let term = remainder / divisor;
        let h = term.checked_mul(h_last)?.checked_add(h_prev)?;
        let k = term.checked_mul(k_last)?.checked_add(k_prev)?;
        if k != 0 && h as f64 / k as f64 == rate {
            return Some((h, k));
        }
        (remainder, divisor) = (divisor, remainder % divisor);
        (h_prev, k_prev) = (h_last, k_last);
        (h_last, k_last) = (h, k);
    }
    None
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}
