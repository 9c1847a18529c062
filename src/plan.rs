//! Plan construction: match every EDF signal against the configured label
//! rules, derive its target encoding, and group compatible signals into
//! output signals.
//!
//! Planning never throws for bad signal data. Each outcome lands in the
//! returned row: unmatched labels leave the Onda-side fields unset, and
//! per-signal failures (unknown unit, degenerate calibration) set the
//! row's `error` column instead.

use std::collections::HashMap;

use log::{debug, warn};

use crate::error::PlanError;
use crate::labels::{edf_to_onda_unit, ChannelMatch, ChannelMatcher, LabelEntry, UnitTable};
use crate::schema::{FilePlanV2, PlanV2};
use crate::standards::{STANDARD_LABELS, STANDARD_UNITS};
use crate::types::{EdfFile, Encoding, SignalHeader};

/// Everything planning consults: ordered label rules, unit spellings, and
/// optional custom matchers tried after the built-in rules.
pub struct PlanConfig {
    /// Built-in label rules, walked in order; the first match wins.
    pub labels: Vec<LabelEntry>,
    pub units: UnitTable,
    /// Fallback matchers for labels the rule tables cannot express.
    pub custom_matchers: Vec<Box<dyn ChannelMatcher + Send + Sync>>,
    /// Keep scanning after the first match and warn when rules disagree.
    pub detect_ambiguity: bool,
}

impl Default for PlanConfig {
    fn default() -> Self {
        PlanConfig {
            labels: STANDARD_LABELS.clone(),
            units: STANDARD_UNITS.clone(),
            custom_matchers: Vec::new(),
            detect_ambiguity: false,
        }
    }
}

impl PlanConfig {
    fn match_header(&self, header: &SignalHeader) -> Option<ChannelMatch> {
        let built_in = self.labels.iter().map(|entry| entry as &dyn ChannelMatcher);
        let custom = self
            .custom_matchers
            .iter()
            .map(|matcher| matcher.as_ref() as &dyn ChannelMatcher);

        let mut matches: Vec<ChannelMatch> = Vec::new();
        for matcher in built_in.chain(custom) {
            if let Some(found) = matcher.try_match(header) {
                if !self.detect_ambiguity {
                    return Some(found);
                }
                if !matches.contains(&found) {
                    matches.push(found);
                }
            }
        }
        if matches.len() > 1 {
            warn!(
                "label {:?} matched {} distinct channels {:?}, keeping the first",
                header.label,
                matches.len(),
                matches
            );
        }
        matches.into_iter().next()
    }
}

fn plan_encoding(
    header: &SignalHeader,
    seconds_per_record: f64,
    units: &UnitTable,
) -> std::result::Result<(String, Encoding), PlanError> {
    let unit = edf_to_onda_unit(&header.physical_dimension, units).ok_or_else(|| {
        PlanError::UnknownUnit {
            dimension: header.physical_dimension.clone(),
        }
    })?;
    let encoding = Encoding::from_header(header, seconds_per_record)?;
    Ok((unit, encoding))
}

/// Plans one signal: the header snapshot plus the matched Onda-side fields.
///
/// Three outcomes, all carried in the returned row: no match (Onda fields
/// unset, no error), a planning failure such as an unknown physical unit
/// (`error` set, Onda fields unset), or success (everything set).
///
/// # Examples
///
/// ```rust
/// use onda_edf::{plan_signal, PlanConfig, SignalHeader};
///
/// let header = SignalHeader {
///     label: "EEG C3-M2".to_string(),
///     transducer_type: String::new(),
///     physical_dimension: "uV".to_string(),
///     physical_minimum: -100.0,
///     physical_maximum: 100.0,
///     digital_minimum: -32768,
///     digital_maximum: 32767,
///     prefilter: String::new(),
///     samples_per_record: 128,
/// };
/// let row = plan_signal(&header, 1.0, &PlanConfig::default());
/// assert_eq!(row.sensor_type.as_deref(), Some("eeg"));
/// assert_eq!(row.channel.as_deref(), Some("c3-a2"));
/// assert_eq!(row.sample_unit.as_deref(), Some("microvolt"));
/// assert_eq!(row.sample_rate, Some(128.0));
/// assert_eq!(row.error, None);
/// ```
pub fn plan_signal(header: &SignalHeader, seconds_per_record: f64, config: &PlanConfig) -> PlanV2 {
    let mut row = PlanV2::from_header(header, seconds_per_record);
    let Some(found) = config.match_header(header) else {
        return row;
    };

    match plan_encoding(header, seconds_per_record, &config.units) {
        Ok((unit, encoding)) => {
            row.sensor_type = Some(found.sensor_type.clone());
            row.sensor_label = Some(found.sensor_type);
            row.channel = Some(found.channel);
            row.sample_unit = Some(unit);
            row.sample_resolution_in_unit = Some(encoding.sample_resolution_in_unit);
            row.sample_offset_in_unit = Some(encoding.sample_offset_in_unit);
            row.sample_type = Some(encoding.sample_type);
            row.sample_rate = Some(encoding.sample_rate);
        }
        Err(error) => {
            debug!(
                "signal {:?} matched {:?} but failed planning: {}",
                header.label, found.channel, error
            );
            row.error = Some(error);
        }
    }
    row
}

/// The row fields grouping compares. Rows agreeing on every key share one
/// output signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    SensorType,
    SampleUnit,
    SampleRate,
}

/// Default grouping: one output signal per (sensor type, unit, rate).
pub const DEFAULT_GROUP_KEYS: [GroupKey; 3] = [
    GroupKey::SensorType,
    GroupKey::SampleUnit,
    GroupKey::SampleRate,
];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyValue {
    Text(String),
    // 采样率按位比较，不做浮点近似
    Bits(u64),
}

impl GroupKey {
    fn value_of(self, row: &PlanV2) -> Option<KeyValue> {
        match self {
            GroupKey::SensorType => row.sensor_type.clone().map(KeyValue::Text),
            GroupKey::SampleUnit => row.sample_unit.clone().map(KeyValue::Text),
            GroupKey::SampleRate => row.sample_rate.map(|rate| KeyValue::Bits(rate.to_bits())),
        }
    }
}

/// Assigns dense output-signal indices in first-occurrence order of the key
/// tuples.
///
/// A row joins a group only when it carries *every* key field; unmatched
/// signals and rows with planning errors keep `onda_signal_index = None`,
/// staying in the plan for audit but out of conversion. Returned rows are
/// sorted by `(onda_signal_index, edf_signal_index)` with ungrouped rows
/// last; `edf_signal_index` is the position in `rows`.
pub fn group_plan_rows(rows: Vec<PlanV2>, keys: &[GroupKey]) -> Vec<FilePlanV2> {
    let mut index_of: HashMap<Vec<KeyValue>, usize> = HashMap::new();
    let mut out: Vec<FilePlanV2> = Vec::with_capacity(rows.len());

    for (edf_signal_index, row) in rows.into_iter().enumerate() {
        let key: Option<Vec<KeyValue>> = keys.iter().map(|key| key.value_of(&row)).collect();
        let onda_signal_index = key.map(|key| {
            let next = index_of.len();
            *index_of.entry(key).or_insert(next)
        });
        out.push(FilePlanV2::new(row, edf_signal_index, onda_signal_index));
    }

    // 未分组的行排最后，其余按(输出信号, 文件内顺序)
    out.sort_by_key(|row| {
        (
            row.onda_signal_index.is_none(),
            row.onda_signal_index,
            row.edf_signal_index,
        )
    });
    out
}

/// Plans every signal in a file and groups the rows with
/// [`DEFAULT_GROUP_KEYS`].
///
/// # Examples
///
/// ```rust
/// use onda_edf::{plan_file, EdfFile, EdfSignal, PlanConfig, SignalHeader};
///
/// let mut edf = EdfFile::new(1.0);
/// for label in ["EEG F3-M2", "EEG C3-M2", "Unknown 7"] {
///     edf.signals.push(EdfSignal {
///         header: SignalHeader {
///             label: label.to_string(),
///             transducer_type: String::new(),
///             physical_dimension: "uV".to_string(),
///             physical_minimum: -100.0,
///             physical_maximum: 100.0,
///             digital_minimum: -32768,
///             digital_maximum: 32767,
///             prefilter: String::new(),
///             samples_per_record: 128,
///         },
///         samples: Vec::new(),
///     });
/// }
///
/// let plan = plan_file(&edf, &PlanConfig::default());
/// // 两路EEG共享输出信号0，未识别的行排最后且不参与转换
/// assert_eq!(plan[0].onda_signal_index, Some(0));
/// assert_eq!(plan[1].onda_signal_index, Some(0));
/// assert_eq!(plan[2].onda_signal_index, None);
/// assert_eq!(plan[2].label, "Unknown 7");
/// ```
pub fn plan_file(edf: &EdfFile, config: &PlanConfig) -> Vec<FilePlanV2> {
    let rows: Vec<PlanV2> = edf
        .signals
        .iter()
        .map(|signal| plan_signal(&signal.header, edf.seconds_per_record, config))
        .collect();
    group_plan_rows(rows, &DEFAULT_GROUP_KEYS)
}
