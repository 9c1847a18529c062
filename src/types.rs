use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// Per-channel EDF signal header.
///
/// Field names follow the EDF+ specification; `seconds_per_record` is a
/// file-level value (see [`EdfFile`]) and is passed alongside headers where
/// needed.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalHeader {
    pub label: String,
    pub transducer_type: String,
    pub physical_dimension: String,
    pub physical_minimum: f64,
    pub physical_maximum: f64,
    pub digital_minimum: i32,
    pub digital_maximum: i32,
    pub prefilter: String,
    pub samples_per_record: i32,
}

/// One EDF channel: its header plus the concatenated digital samples of
/// every data record.
#[derive(Debug, Clone)]
pub struct EdfSignal {
    pub header: SignalHeader,
    pub samples: Vec<i32>, // EDF每个样本2字节，i32承载
}

/// In-memory model of an EDF recording, as produced by a raw-file reader.
///
/// Byte-level parsing is deliberately not part of this crate; any reader
/// that can fill this struct (headers plus per-channel digital samples)
/// can feed [`plan_file`](crate::plan::plan_file) and
/// [`edf_to_onda_samples`](crate::convert::edf_to_onda_samples).
#[derive(Debug, Clone)]
pub struct EdfFile {
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    /// Duration of one data record in seconds.
    pub seconds_per_record: f64,
    pub signals: Vec<EdfSignal>,
}

impl EdfFile {
    /// Creates an empty recording with the given record duration.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use onda_edf::EdfFile;
    ///
    /// let file = EdfFile::new(1.0);
    /// assert_eq!(file.seconds_per_record, 1.0);
    /// assert!(file.signals.is_empty());
    /// ```
    pub fn new(seconds_per_record: f64) -> Self {
        // 使用默认日期时间（EDF纪元下限）
        let default_date = NaiveDate::from_ymd_opt(1985, 1, 1).unwrap();
        let default_time = NaiveTime::from_hms_opt(0, 0, 0).unwrap();

        EdfFile {
            start_date: default_date,
            start_time: default_time,
            seconds_per_record,
            signals: Vec::new(),
        }
    }
}

/// Integer storage type of encoded sample data.
///
/// EDF sources are always `Int16`; wider types appear when promotion has to
/// cover several channels whose encodings differ. Serialized as the Onda
/// spelling (`"int16"`, `"uint8"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
}

impl SampleType {
    /// Smallest representable digital value.
    pub fn min_value(self) -> i64 {
        match self {
            SampleType::Int8 => i8::MIN as i64,
            SampleType::Int16 => i16::MIN as i64,
            SampleType::Int32 => i32::MIN as i64,
            SampleType::Int64 => i64::MIN,
            SampleType::UInt8 | SampleType::UInt16 | SampleType::UInt32 => 0,
        }
    }

    /// Largest representable digital value.
    pub fn max_value(self) -> i64 {
        match self {
            SampleType::Int8 => i8::MAX as i64,
            SampleType::Int16 => i16::MAX as i64,
            SampleType::Int32 => i32::MAX as i64,
            SampleType::Int64 => i64::MAX,
            SampleType::UInt8 => u8::MAX as i64,
            SampleType::UInt16 => u16::MAX as i64,
            SampleType::UInt32 => u32::MAX as i64,
        }
    }

    /// Whether the whole digital range `[lo, hi]` is representable.
    pub fn fits(self, lo: f64, hi: f64) -> bool {
        self.min_value() as f64 <= lo && hi <= self.max_value() as f64
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SampleType::Int8 => "int8",
            SampleType::Int16 => "int16",
            SampleType::Int32 => "int32",
            SampleType::Int64 => "int64",
            SampleType::UInt8 => "uint8",
            SampleType::UInt16 => "uint16",
            SampleType::UInt32 => "uint32",
        }
    }

    /// Parses the serialized spelling back into a sample type.
    pub fn from_name(name: &str) -> Option<SampleType> {
        match name {
            "int8" => Some(SampleType::Int8),
            "int16" => Some(SampleType::Int16),
            "int32" => Some(SampleType::Int32),
            "int64" => Some(SampleType::Int64),
            "uint8" => Some(SampleType::UInt8),
            "uint16" => Some(SampleType::UInt16),
            "uint32" => Some(SampleType::UInt32),
            _ => None,
        }
    }
}

impl std::fmt::Display for SampleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Linear sample encoding: `physical = resolution * digital + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Encoding {
    pub sample_type: SampleType,
    pub sample_resolution_in_unit: f64,
    pub sample_offset_in_unit: f64,
    pub sample_rate: f64,
}

impl Encoding {
    /// Derives the encoding an EDF header describes.
    ///
    /// EDF maps the digital span `[digital_minimum, digital_maximum]`
    /// linearly onto `[physical_minimum, physical_maximum]`, so
    ///
    /// ```text
    /// resolution = (physical_maximum - physical_minimum) / (digital_maximum - digital_minimum)
    /// offset     = physical_minimum - resolution * digital_minimum
    /// ```
    ///
    /// Degenerate ranges and non-positive sampling geometry are rejected
    /// with the row-scoped errors the planner records.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use onda_edf::{Encoding, SampleType, SignalHeader};
    ///
    /// let header = SignalHeader {
    ///     label: "EEG F3".to_string(),
    ///     transducer_type: "AgAgCl electrode".to_string(),
    ///     physical_dimension: "uV".to_string(),
    ///     physical_minimum: -200.0,
    ///     physical_maximum: 200.0,
    ///     digital_minimum: -32768,
    ///     digital_maximum: 32767,
    ///     prefilter: "HP:0.1Hz".to_string(),
    ///     samples_per_record: 128,
    /// };
    ///
    /// let encoding = Encoding::from_header(&header, 1.0).unwrap();
    /// assert_eq!(encoding.sample_type, SampleType::Int16);
    /// assert_eq!(encoding.sample_rate, 128.0);
    /// assert!((encoding.sample_resolution_in_unit - 400.0 / 65535.0).abs() < 1e-12);
    ///
    /// // 编码解码互逆
    /// let digital = 16384;
    /// let physical = encoding.decode(digital);
    /// assert_eq!(encoding.encode(physical, 0.0), digital);
    /// ```
    pub fn from_header(
        header: &SignalHeader,
        seconds_per_record: f64,
    ) -> std::result::Result<Encoding, PlanError> {
        if header.physical_maximum == header.physical_minimum {
            return Err(PlanError::PhysicalMinEqualsMax {
                value: header.physical_maximum,
            });
        }
        if header.digital_maximum == header.digital_minimum {
            return Err(PlanError::DigitalMinEqualsMax {
                value: header.digital_maximum,
            });
        }
        if header.samples_per_record <= 0 || seconds_per_record <= 0.0 {
            return Err(PlanError::InvalidSampleRate {
                samples_per_record: header.samples_per_record,
                seconds_per_record,
            });
        }

        let resolution = (header.physical_maximum - header.physical_minimum)
            / (header.digital_maximum - header.digital_minimum) as f64;
        let offset = header.physical_minimum - resolution * header.digital_minimum as f64;

        Ok(Encoding {
            sample_type: SampleType::Int16,
            sample_resolution_in_unit: resolution,
            sample_offset_in_unit: offset,
            sample_rate: header.samples_per_record as f64 / seconds_per_record,
        })
    }

    /// Digital value to physical units.
    pub fn decode(&self, digital: i64) -> f64 {
        self.sample_resolution_in_unit * digital as f64 + self.sample_offset_in_unit
    }

    /// Physical value (plus dither noise, if any) to a digital value.
    ///
    /// The value is clamped into the storage type's range before rounding;
    /// NaN encodes to the type minimum.
    pub fn encode(&self, physical: f64, noise: f64) -> i64 {
        let value = physical + noise;
        if value.is_nan() {
            return self.sample_type.min_value();
        }
        let digital = (value - self.sample_offset_in_unit) / self.sample_resolution_in_unit;
        let clamped = digital.clamp(
            self.sample_type.min_value() as f64,
            self.sample_type.max_value() as f64,
        );
        clamped.round() as i64
    }

    /// Bit-for-bit equality, the condition for the lossless copy fast path.
    ///
    /// Ordinary float comparison would treat `0.0` and `-0.0` as equal and
    /// miss NaN; lossless copying requires the stored bits to agree.
    pub fn identical(&self, other: &Encoding) -> bool {
        self.sample_type == other.sample_type
            && self.sample_resolution_in_unit.to_bits() == other.sample_resolution_in_unit.to_bits()
            && self.sample_offset_in_unit.to_bits() == other.sample_offset_in_unit.to_bits()
            && self.sample_rate.to_bits() == other.sample_rate.to_bits()
    }
}

/// Descriptor of one Onda-style signal: what was measured, on which
/// channels, and how the sample data is encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplesInfo {
    pub sensor_type: String,
    pub sensor_label: String,
    pub channels: Vec<String>,
    pub sample_unit: String,
    pub sample_resolution_in_unit: f64,
    pub sample_offset_in_unit: f64,
    pub sample_type: SampleType,
    pub sample_rate: f64,
}

impl SamplesInfo {
    pub fn encoding(&self) -> Encoding {
        Encoding {
            sample_type: self.sample_type,
            sample_resolution_in_unit: self.sample_resolution_in_unit,
            sample_offset_in_unit: self.sample_offset_in_unit,
            sample_rate: self.sample_rate,
        }
    }
}

/// A converted multi-channel signal: uniformly encoded digital samples in a
/// channels × time matrix.
#[derive(Debug, Clone)]
pub struct Samples {
    pub info: SamplesInfo,
    /// Raw EDF labels of the source channels, kept as provenance in the
    /// same order as `info.channels`.
    pub edf_channels: Vec<String>,
    /// Row-major sample data: `info.channels.len()` rows of
    /// [`sample_count`](Samples::sample_count) values each.
    pub data: Vec<i64>,
}

impl Samples {
    pub fn channel_count(&self) -> usize {
        self.info.channels.len()
    }

    /// Samples per channel.
    pub fn sample_count(&self) -> usize {
        let channels = self.info.channels.len();
        if channels == 0 {
            0
        } else {
            self.data.len() / channels
        }
    }

    /// Digital samples of one channel row.
    ///
    /// Panics if `index` is out of range.
    pub fn channel_samples(&self, index: usize) -> &[i64] {
        let n = self.sample_count();
        &self.data[index * n..(index + 1) * n]
    }

    /// Decodes one channel row back to physical units.
    pub fn decode_channel(&self, index: usize) -> Vec<f64> {
        let encoding = self.info.encoding();
        self.channel_samples(index)
            .iter()
            .map(|&d| encoding.decode(d))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_header() -> SignalHeader {
        SignalHeader {
            label: "EEG C3".to_string(),
            transducer_type: String::new(),
            physical_dimension: "uV".to_string(),
            physical_minimum: -100.0,
            physical_maximum: 100.0,
            digital_minimum: -32768,
            digital_maximum: 32767,
            prefilter: String::new(),
            samples_per_record: 256,
        }
    }

    #[test]
    fn test_encoding_from_header() {
        let encoding = Encoding::from_header(&test_header(), 1.0).unwrap();
        assert_eq!(encoding.sample_type, SampleType::Int16);
        assert_eq!(encoding.sample_rate, 256.0);
        // 数字最小值应映射回物理最小值
        assert!((encoding.decode(-32768) - (-100.0)).abs() < 1e-9);
        assert!((encoding.decode(32767) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_headers_are_rejected() {
        let mut header = test_header();
        header.physical_minimum = 5.0;
        header.physical_maximum = 5.0;
        assert!(matches!(
            Encoding::from_header(&header, 1.0),
            Err(PlanError::PhysicalMinEqualsMax { .. })
        ));

        let mut header = test_header();
        header.digital_minimum = 0;
        header.digital_maximum = 0;
        assert!(matches!(
            Encoding::from_header(&header, 1.0),
            Err(PlanError::DigitalMinEqualsMax { .. })
        ));

        let header = test_header();
        assert!(matches!(
            Encoding::from_header(&header, 0.0),
            Err(PlanError::InvalidSampleRate { .. })
        ));
    }

    #[test]
    fn test_encode_clamps_and_rejects_nan() {
        let encoding = Encoding {
            sample_type: SampleType::Int16,
            sample_resolution_in_unit: 1.0,
            sample_offset_in_unit: 0.0,
            sample_rate: 1.0,
        };
        assert_eq!(encoding.encode(1e9, 0.0), 32767);
        assert_eq!(encoding.encode(-1e9, 0.0), -32768);
        assert_eq!(encoding.encode(f64::NAN, 0.0), -32768);
        assert_eq!(encoding.encode(12.4, 0.0), 12);
        assert_eq!(encoding.encode(12.4, 0.2), 13);
    }

    #[test]
    fn test_sample_type_bounds() {
        assert_eq!(SampleType::Int16.min_value(), -32768);
        assert_eq!(SampleType::Int16.max_value(), 32767);
        assert_eq!(SampleType::UInt8.min_value(), 0);
        assert_eq!(SampleType::UInt8.max_value(), 255);
        assert!(SampleType::UInt16.fits(0.0, 65535.0));
        assert!(!SampleType::UInt16.fits(-1.0, 65535.0));
        assert!(!SampleType::Int16.fits(0.0, 32768.0));
    }

    #[test]
    fn test_sample_type_names_round_trip() {
        for ty in [
            SampleType::Int8,
            SampleType::Int16,
            SampleType::Int32,
            SampleType::Int64,
            SampleType::UInt8,
            SampleType::UInt16,
            SampleType::UInt32,
        ] {
            assert_eq!(SampleType::from_name(ty.as_str()), Some(ty));
        }
        assert_eq!(SampleType::from_name("float32"), None);
        assert_eq!(SampleType::from_name("Int16"), None);
    }

    #[test]
    fn test_identical_distinguishes_bit_patterns() {
        let a = Encoding {
            sample_type: SampleType::Int16,
            sample_resolution_in_unit: 0.1,
            sample_offset_in_unit: 0.0,
            sample_rate: 256.0,
        };
        let mut b = a;
        assert!(a.identical(&b));
        b.sample_offset_in_unit = -0.0;
        assert!(!a.identical(&b));
        assert_eq!(
            b.sample_offset_in_unit, a.sample_offset_in_unit,
            "PartialEq would have treated these as equal"
        );
    }

    #[test]
    fn test_samples_channel_access() {
        let info = SamplesInfo {
            sensor_type: "eeg".to_string(),
            sensor_label: "eeg".to_string(),
            channels: vec!["c3".to_string(), "c4".to_string()],
            sample_unit: "microvolt".to_string(),
            sample_resolution_in_unit: 1.0,
            sample_offset_in_unit: 0.0,
            sample_type: SampleType::Int16,
            sample_rate: 2.0,
        };
        let samples = Samples {
            info,
            edf_channels: vec!["EEG C3".to_string(), "EEG C4".to_string()],
            data: vec![1, 2, 3, 4, 5, 6],
        };
        assert_eq!(samples.channel_count(), 2);
        assert_eq!(samples.sample_count(), 3);
        assert_eq!(samples.channel_samples(0), &[1, 2, 3]);
        assert_eq!(samples.channel_samples(1), &[4, 5, 6]);
        assert_eq!(samples.decode_channel(1), vec![4.0, 5.0, 6.0]);
    }
}
