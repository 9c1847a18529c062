//! Serialized plan-row schemas.
//!
//! Two generations exist. The first stored the matched signal kind in a
//! `kind` column; the current one renames it to `sensor_type` and adds
//! `sensor_label` and `recording`. Readers accept either generation (see
//! [`PlanRecord`] / [`FilePlanRecord`]), writers always emit the current
//! one; the old generation deliberately does not implement `Serialize`.
//!
//! Every struct rejects unknown columns. That is what lets the untagged
//! readers tell the generations apart, and it catches hand-edited plans
//! with misspelled column names early.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PlanError;
use crate::types::{Encoding, SampleType, SignalHeader};

mod error_message {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::error::PlanError;

    pub fn serialize<S: Serializer>(
        error: &Option<PlanError>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        error.as_ref().map(|e| e.to_string()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<PlanError>, D::Error> {
        Ok(Option::<String>::deserialize(deserializer)?.map(PlanError::Recorded))
    }
}

/// First-generation per-signal plan row. Read-only.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanV1 {
    pub label: String,
    pub transducer_type: String,
    pub physical_dimension: String,
    pub physical_minimum: f64,
    pub physical_maximum: f64,
    pub digital_minimum: i32,
    pub digital_maximum: i32,
    pub prefilter: String,
    pub samples_per_record: i32,
    pub seconds_per_record: f64,
    pub kind: Option<String>,
    pub channel: Option<String>,
    pub sample_unit: Option<String>,
    pub sample_resolution_in_unit: Option<f64>,
    pub sample_offset_in_unit: Option<f64>,
    pub sample_type: Option<SampleType>,
    pub sample_rate: Option<f64>,
    #[serde(with = "error_message", default)]
    pub error: Option<PlanError>,
}

impl PlanV1 {
    /// Upgrades to the current generation: `kind` becomes `sensor_type` and
    /// seeds `sensor_label`; `recording` starts empty.
    pub fn upgrade(self) -> PlanV2 {
        PlanV2 {
            label: self.label,
            transducer_type: self.transducer_type,
            physical_dimension: self.physical_dimension,
            physical_minimum: self.physical_minimum,
            physical_maximum: self.physical_maximum,
            digital_minimum: self.digital_minimum,
            digital_maximum: self.digital_maximum,
            prefilter: self.prefilter,
            samples_per_record: self.samples_per_record,
            seconds_per_record: self.seconds_per_record,
            sensor_label: self.kind.clone(),
            sensor_type: self.kind,
            channel: self.channel,
            sample_unit: self.sample_unit,
            sample_resolution_in_unit: self.sample_resolution_in_unit,
            sample_offset_in_unit: self.sample_offset_in_unit,
            sample_type: self.sample_type,
            sample_rate: self.sample_rate,
            recording: None,
            error: self.error,
        }
    }
}

impl From<PlanV1> for PlanV2 {
    fn from(row: PlanV1) -> Self {
        row.upgrade()
    }
}

/// Current per-signal plan row: the EDF header snapshot plus the Onda-side
/// decisions. Unset Onda fields mean the label found no match; a populated
/// `error` means the signal matched but could not be planned, and leaves
/// the Onda fields unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanV2 {
    pub label: String,
    pub transducer_type: String,
    pub physical_dimension: String,
    pub physical_minimum: f64,
    pub physical_maximum: f64,
    pub digital_minimum: i32,
    pub digital_maximum: i32,
    pub prefilter: String,
    pub samples_per_record: i32,
    pub seconds_per_record: f64,
    pub sensor_type: Option<String>,
    pub sensor_label: Option<String>,
    pub channel: Option<String>,
    pub sample_unit: Option<String>,
    pub sample_resolution_in_unit: Option<f64>,
    pub sample_offset_in_unit: Option<f64>,
    pub sample_type: Option<SampleType>,
    pub sample_rate: Option<f64>,
    pub recording: Option<Uuid>,
    #[serde(with = "error_message", default)]
    pub error: Option<PlanError>,
}

impl PlanV2 {
    /// A fresh row carrying only the header snapshot: no match, no error.
    pub fn from_header(header: &SignalHeader, seconds_per_record: f64) -> Self {
        PlanV2 {
            label: header.label.clone(),
            transducer_type: header.transducer_type.clone(),
            physical_dimension: header.physical_dimension.clone(),
            physical_minimum: header.physical_minimum,
            physical_maximum: header.physical_maximum,
            digital_minimum: header.digital_minimum,
            digital_maximum: header.digital_maximum,
            prefilter: header.prefilter.clone(),
            samples_per_record: header.samples_per_record,
            seconds_per_record,
            sensor_type: None,
            sensor_label: None,
            channel: None,
            sample_unit: None,
            sample_resolution_in_unit: None,
            sample_offset_in_unit: None,
            sample_type: None,
            sample_rate: None,
            recording: None,
            error: None,
        }
    }
}

/// First-generation file-level row. Read-only.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilePlanV1 {
    pub label: String,
    pub transducer_type: String,
    pub physical_dimension: String,
    pub physical_minimum: f64,
    pub physical_maximum: f64,
    pub digital_minimum: i32,
    pub digital_maximum: i32,
    pub prefilter: String,
    pub samples_per_record: i32,
    pub seconds_per_record: f64,
    pub kind: Option<String>,
    pub channel: Option<String>,
    pub sample_unit: Option<String>,
    pub sample_resolution_in_unit: Option<f64>,
    pub sample_offset_in_unit: Option<f64>,
    pub sample_type: Option<SampleType>,
    pub sample_rate: Option<f64>,
    #[serde(with = "error_message", default)]
    pub error: Option<PlanError>,
    pub edf_signal_index: usize,
    #[serde(default)]
    pub onda_signal_index: Option<usize>,
}

impl FilePlanV1 {
    pub fn upgrade(self) -> FilePlanV2 {
        let FilePlanV1 {
            label,
            transducer_type,
            physical_dimension,
            physical_minimum,
            physical_maximum,
            digital_minimum,
            digital_maximum,
            prefilter,
            samples_per_record,
            seconds_per_record,
            kind,
            channel,
            sample_unit,
            sample_resolution_in_unit,
            sample_offset_in_unit,
            sample_type,
            sample_rate,
            error,
            edf_signal_index,
            onda_signal_index,
        } = self;
        FilePlanV2 {
            label,
            transducer_type,
            physical_dimension,
            physical_minimum,
            physical_maximum,
            digital_minimum,
            digital_maximum,
            prefilter,
            samples_per_record,
            seconds_per_record,
            sensor_label: kind.clone(),
            sensor_type: kind,
            channel,
            sample_unit,
            sample_resolution_in_unit,
            sample_offset_in_unit,
            sample_type,
            sample_rate,
            recording: None,
            error,
            edf_signal_index,
            onda_signal_index,
        }
    }
}

impl From<FilePlanV1> for FilePlanV2 {
    fn from(row: FilePlanV1) -> Self {
        row.upgrade()
    }
}

/// Current file-level plan row: a [`PlanV2`] extended with where the signal
/// sits in the source file and which output group it joined.
///
/// `onda_signal_index` is the dense 0-based group index; `None` marks a row
/// that is kept for auditability but excluded from conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilePlanV2 {
    pub label: String,
    pub transducer_type: String,
    pub physical_dimension: String,
    pub physical_minimum: f64,
    pub physical_maximum: f64,
    pub digital_minimum: i32,
    pub digital_maximum: i32,
    pub prefilter: String,
    pub samples_per_record: i32,
    pub seconds_per_record: f64,
    pub sensor_type: Option<String>,
    pub sensor_label: Option<String>,
    pub channel: Option<String>,
    pub sample_unit: Option<String>,
    pub sample_resolution_in_unit: Option<f64>,
    pub sample_offset_in_unit: Option<f64>,
    pub sample_type: Option<SampleType>,
    pub sample_rate: Option<f64>,
    pub recording: Option<Uuid>,
    #[serde(with = "error_message", default)]
    pub error: Option<PlanError>,
    pub edf_signal_index: usize,
    #[serde(default)]
    pub onda_signal_index: Option<usize>,
}

impl FilePlanV2 {
    pub fn new(plan: PlanV2, edf_signal_index: usize, onda_signal_index: Option<usize>) -> Self {
        let PlanV2 {
            label,
            transducer_type,
            physical_dimension,
            physical_minimum,
            physical_maximum,
            digital_minimum,
            digital_maximum,
            prefilter,
            samples_per_record,
            seconds_per_record,
            sensor_type,
            sensor_label,
            channel,
            sample_unit,
            sample_resolution_in_unit,
            sample_offset_in_unit,
            sample_type,
            sample_rate,
            recording,
            error,
        } = plan;
        FilePlanV2 {
            label,
            transducer_type,
            physical_dimension,
            physical_minimum,
            physical_maximum,
            digital_minimum,
            digital_maximum,
            prefilter,
            samples_per_record,
            seconds_per_record,
            sensor_type,
            sensor_label,
            channel,
            sample_unit,
            sample_resolution_in_unit,
            sample_offset_in_unit,
            sample_type,
            sample_rate,
            recording,
            error,
            edf_signal_index,
            onda_signal_index,
        }
    }

    /// The member encoding planning recorded on this row, if any.
    pub fn encoding(&self) -> Option<Encoding> {
        Some(Encoding {
            sample_type: self.sample_type?,
            sample_resolution_in_unit: self.sample_resolution_in_unit?,
            sample_offset_in_unit: self.sample_offset_in_unit?,
            sample_rate: self.sample_rate?,
        })
    }
}

/// A persisted per-signal row of either generation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PlanRecord {
    V2(PlanV2),
    V1(PlanV1),
}

impl PlanRecord {
    pub fn into_current(self) -> PlanV2 {
        match self {
            PlanRecord::V2(row) => row,
            PlanRecord::V1(row) => row.upgrade(),
        }
    }
}

/// A persisted file-level row of either generation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FilePlanRecord {
    V2(FilePlanV2),
    V1(FilePlanV1),
}

impl FilePlanRecord {
    pub fn into_current(self) -> FilePlanV2 {
        match self {
            FilePlanRecord::V2(row) => row,
            FilePlanRecord::V1(row) => row.upgrade(),
        }
    }
}

/// An annotation tied to a recording, as an external annotation extractor
/// would emit alongside converted samples. Onset and duration count
/// nanoseconds from recording start. TAL parsing itself is out of scope
/// for this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdfAnnotation {
    pub recording: Uuid,
    pub onset_ns: i64,
    pub duration_ns: i64,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v1_json() -> String {
        r#"{
            "label": "EEG C3-M2",
            "transducer_type": "AgAgCl",
            "physical_dimension": "uV",
            "physical_minimum": -100.0,
            "physical_maximum": 100.0,
            "digital_minimum": -32768,
            "digital_maximum": 32767,
            "prefilter": "",
            "samples_per_record": 128,
            "seconds_per_record": 1.0,
            "kind": "eeg",
            "channel": "c3-a2",
            "sample_unit": "microvolt",
            "sample_resolution_in_unit": 0.0030518,
            "sample_offset_in_unit": 0.0,
            "sample_type": "int16",
            "sample_rate": 128.0,
            "error": null
        }"#
        .to_string()
    }

    #[test]
    fn test_v1_rows_upgrade_to_current() {
        let record: PlanRecord = serde_json::from_str(&v1_json()).unwrap();
        assert!(matches!(record, PlanRecord::V1(_)));

        let row = record.into_current();
        assert_eq!(row.sensor_type.as_deref(), Some("eeg"));
        assert_eq!(row.sensor_label.as_deref(), Some("eeg"));
        assert_eq!(row.channel.as_deref(), Some("c3-a2"));
        assert_eq!(row.recording, None);
        assert_eq!(row.sample_type, Some(SampleType::Int16));
    }

    #[test]
    fn test_current_rows_read_as_current() {
        let mut row = PlanV2::from_header(
            &SignalHeader {
                label: "ECG II".to_string(),
                transducer_type: String::new(),
                physical_dimension: "mV".to_string(),
                physical_minimum: -5.0,
                physical_maximum: 5.0,
                digital_minimum: -32768,
                digital_maximum: 32767,
                prefilter: String::new(),
                samples_per_record: 256,
            },
            1.0,
        );
        row.sensor_type = Some("ecg".to_string());
        row.sensor_label = Some("ecg".to_string());
        row.channel = Some("ii".to_string());

        let json = serde_json::to_string(&row).unwrap();
        let record: PlanRecord = serde_json::from_str(&json).unwrap();
        assert!(matches!(record, PlanRecord::V2(_)));
        assert_eq!(record.into_current(), row);
    }

    #[test]
    fn test_emitted_rows_use_current_column_names() {
        let plan = PlanV2::from_header(
            &SignalHeader {
                label: "Pulse".to_string(),
                transducer_type: String::new(),
                physical_dimension: "bpm".to_string(),
                physical_minimum: 0.0,
                physical_maximum: 250.0,
                digital_minimum: 0,
                digital_maximum: 25000,
                prefilter: String::new(),
                samples_per_record: 1,
            },
            1.0,
        );
        let row = FilePlanV2::new(plan, 3, None);
        let value = serde_json::to_value(&row).unwrap();
        assert!(value.get("sensor_type").is_some());
        assert!(value.get("kind").is_none());
        assert_eq!(value["edf_signal_index"], 3);
        assert_eq!(value["onda_signal_index"], serde_json::Value::Null);
    }

    #[test]
    fn test_error_column_round_trips_as_text() {
        let mut row = PlanV2::from_header(
            &SignalHeader {
                label: "Body Temp".to_string(),
                transducer_type: String::new(),
                physical_dimension: "furlong".to_string(),
                physical_minimum: 30.0,
                physical_maximum: 45.0,
                digital_minimum: -32768,
                digital_maximum: 32767,
                prefilter: String::new(),
                samples_per_record: 1,
            },
            1.0,
        );
        row.error = Some(PlanError::UnknownUnit {
            dimension: "furlong".to_string(),
        });

        let json = serde_json::to_value(&row).unwrap();
        let message = json["error"].as_str().unwrap().to_string();
        assert!(message.contains("furlong"));

        let reloaded: PlanV2 = serde_json::from_value(json).unwrap();
        assert_eq!(reloaded.error, Some(PlanError::Recorded(message.clone())));

        // 再序列化仍是同一段文字
        let again = serde_json::to_value(&reloaded).unwrap();
        assert_eq!(again["error"].as_str().unwrap(), message);
    }

    #[test]
    fn test_file_plan_reads_either_generation() {
        let v1 = r#"{
            "label": "EEG C3-M2", "transducer_type": "", "physical_dimension": "uV",
            "physical_minimum": -100.0, "physical_maximum": 100.0,
            "digital_minimum": -32768, "digital_maximum": 32767,
            "prefilter": "", "samples_per_record": 128, "seconds_per_record": 1.0,
            "kind": "eeg", "channel": "c3-a2", "sample_unit": "microvolt",
            "sample_resolution_in_unit": 0.003, "sample_offset_in_unit": 0.0,
            "sample_type": "int16", "sample_rate": 128.0, "error": null,
            "edf_signal_index": 0, "onda_signal_index": 0
        }"#;
        let record: FilePlanRecord = serde_json::from_str(v1).unwrap();
        assert!(matches!(record, FilePlanRecord::V1(_)));
        let row = record.into_current();
        assert_eq!(row.sensor_type.as_deref(), Some("eeg"));
        assert_eq!(row.edf_signal_index, 0);
        assert_eq!(row.onda_signal_index, Some(0));
        assert_eq!(
            row.encoding().unwrap().sample_type,
            SampleType::Int16
        );
    }
}
