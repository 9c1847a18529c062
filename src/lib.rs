//! # EDF to Onda-style signals for Rust
//!
//! A pure Rust engine for converting EDF+ (European Data Format Plus)
//! biosignals into uniformly encoded, column-oriented sample matrices and
//! back. Free-text channel labels are canonicalized against an ordered
//! rule table, compatible channels are grouped into multichannel output
//! signals, and every decision lands in a serializable plan before any
//! sample moves.
//!
//! Conversion runs in two inspectable stages:
//!
//! 1. **Plan**: [`plan_file`] matches each signal header and derives its
//!    target encoding; the result is a table of [`FilePlanV2`] rows that
//!    can be reviewed, amended, and persisted.
//! 2. **Execute**: [`edf_to_onda_samples`] validates the plan against the
//!    file and converts each group, recording per-group failures in the
//!    returned plan instead of aborting the run.
//!
//! ## Quick Start
//!
//! ```rust
//! use onda_edf::{convert_edf_file, Dither, EdfFile, EdfSignal, PlanConfig, SignalHeader};
//!
//! fn main() -> onda_edf::Result<()> {
//!     // One second of two referenced EEG leads
//!     let mut edf = EdfFile::new(1.0);
//!     for label in ["EEG F3-M2", "EEG C3-M2"] {
//!         edf.signals.push(EdfSignal {
//!             header: SignalHeader {
//!                 label: label.to_string(),
//!                 transducer_type: "AgAgCl cup electrodes".to_string(),
//!                 physical_dimension: "uV".to_string(),
//!                 physical_minimum: -100.0,
//!                 physical_maximum: 100.0,
//!                 digital_minimum: -32768,
//!                 digital_maximum: 32767,
//!                 prefilter: "HP:0.1Hz LP:70Hz".to_string(),
//!                 samples_per_record: 256,
//!             },
//!             samples: (0..256).collect(),
//!         });
//!     }
//!
//!     let (converted, plan) = convert_edf_file(&edf, &PlanConfig::default(), Dither::Off)?;
//!
//!     // Both leads share one eeg output signal, re-referenced names and all
//!     let eeg = &converted[0];
//!     assert_eq!(eeg.info.sensor_type, "eeg");
//!     assert_eq!(eeg.info.channels, vec!["f3-a2", "c3-a2"]);
//!     assert_eq!(eeg.sample_count(), 256);
//!
//!     // The executed plan doubles as the audit trail
//!     for row in &plan {
//!         println!("{:?} -> {:?}", row.label, row.channel);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Physical vs Digital Values
//!
//! EDF stores 16-bit integers plus a per-channel affine calibration; the
//! converted signals store integers plus one [`Encoding`] per signal.
//! Decoding and encoding are exact inverses on in-range values:
//!
//! ```rust
//! use onda_edf::{Encoding, SampleType};
//!
//! let encoding = Encoding {
//!     sample_type: SampleType::Int16,
//!     sample_resolution_in_unit: 0.25,   // physical units per digital step
//!     sample_offset_in_unit: -10.0,
//!     sample_rate: 256.0,
//! };
//!
//! assert_eq!(encoding.decode(200), 40.0);
//! assert_eq!(encoding.encode(40.0, 0.0), 200);
//! // Out-of-range values clamp to the storage type
//! assert_eq!(encoding.encode(1.0e9, 0.0), 32767);
//! ```
//!
//! ## Reading Old Plans
//!
//! Serialized plans from the first schema generation (the ones with a
//! `kind` column) still read back; [`PlanRecord`] and [`FilePlanRecord`]
//! accept either generation and upgrade on demand. Writers always emit
//! the current generation.
//!
//! ```rust
//! use onda_edf::PlanRecord;
//!
//! let stored = r#"{
//!     "label": "ECG 2", "transducer_type": "", "physical_dimension": "mV",
//!     "physical_minimum": -5.0, "physical_maximum": 5.0,
//!     "digital_minimum": -32768, "digital_maximum": 32767,
//!     "prefilter": "", "samples_per_record": 500, "seconds_per_record": 1.0,
//!     "kind": "ecg", "channel": "ii", "sample_unit": "millivolt",
//!     "sample_resolution_in_unit": 0.000152590218966964,
//!     "sample_offset_in_unit": 0.0, "sample_type": "int16",
//!     "sample_rate": 500.0, "error": null
//! }"#;
//!
//! let row = serde_json::from_str::<PlanRecord>(stored)
//!     .unwrap()
//!     .into_current();
//! assert_eq!(row.sensor_type.as_deref(), Some("ecg"));
//! assert_eq!(row.recording, None);
//! ```

pub mod convert;
pub mod encode;
pub mod error;
pub mod export;
pub mod labels;
pub mod plan;
pub mod schema;
pub mod standards;
pub mod types;

// Re-export the whole working surface for convenience
pub use convert::{
    convert_edf_file, edf_to_onda_samples, merge_samples_info, onda_samples_from_edf_signals,
};
pub use encode::{promote_encodings, promote_encodings_with, Dither};
pub use error::{OndaEdfError, PlanError, Result};
pub use export::{onda_to_edf, ExportedChannel};
pub use labels::{
    edf_to_onda_unit, match_edf_label, ChannelMatch, ChannelMatcher, ChannelSpec, LabelEntry,
    UnitSpec, UnitTable,
};
pub use plan::{
    group_plan_rows, plan_file, plan_signal, GroupKey, PlanConfig, DEFAULT_GROUP_KEYS,
};
pub use schema::{
    EdfAnnotation, FilePlanRecord, FilePlanV1, FilePlanV2, PlanRecord, PlanV1, PlanV2,
};
pub use standards::{STANDARD_LABELS, STANDARD_UNITS};
pub use types::{
    EdfFile, EdfSignal, Encoding, Samples, SamplesInfo, SampleType, SignalHeader,
};

/// Seed for [`Dither::Auto`], so unseeded conversions stay reproducible
/// run to run. The value spells `onda` in ASCII.
pub const DEFAULT_DITHER_SEED: u64 = 0x6F6E_6461;

/// Library version
///
/// Returns the current version of the onda-edf library.
///
/// # Examples
///
/// ```rust
/// use onda_edf;
///
/// let version = onda_edf::version();
/// assert!(!version.is_empty());
/// assert!(version.contains('.'));
/// println!("onda-edf library version: {}", version);
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
