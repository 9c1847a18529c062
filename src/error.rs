use thiserror::Error;

/// Hard failures: the conversion run itself cannot continue.
///
/// Everything recoverable (an unparseable unit, a group whose encodings
/// cannot be promoted, ...) is captured per row as a [`PlanError`] instead
/// and never surfaces through this type.
#[derive(Debug, Error)]
pub enum OndaEdfError {
    #[error("Plan row {index} refers to EDF signal {signal} but the file has {count} signals")]
    SignalIndexOutOfRange {
        index: usize,
        signal: usize,
        count: usize,
    },

    #[error("Plan row {index} was made for label {planned:?} but EDF signal {signal} is labeled {actual:?}")]
    PlanSignalMismatch {
        index: usize,
        signal: usize,
        planned: String,
        actual: String,
    },

    /// Grouped rows reached conversion with different sample rates.
    ///
    /// Groups produced by [`group_plan_rows`](crate::plan::group_plan_rows)
    /// with the default keys are rate-uniform, and promotion rejects mixed
    /// rates before conversion starts, so hitting this means the plan was
    /// built or edited incorrectly.
    #[error("Sample rate {actual} does not match the promoted rate {expected}")]
    MismatchedSampleRate { expected: f64, actual: f64 },

    #[error("Grouped signals carry different sample counts: {lengths:?}")]
    MismatchedSampleCount { lengths: Vec<usize> },

    /// The exporter cannot lay this sample rate out as a whole number of
    /// samples per data record within the EDF header's field range.
    #[error("Sample rate {sample_rate} cannot be laid out as whole samples per data record")]
    UnrepresentableRate { sample_rate: f64 },

    /// A planning failure escalated by an API that requires a usable
    /// encoding, such as converting signals against an explicit
    /// [`SamplesInfo`](crate::types::SamplesInfo).
    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Row- and group-scoped failures recorded inside a plan.
///
/// These are data, not control flow: planning and conversion write them into
/// the `error` column of the affected rows and keep going. Serialized plans
/// store the formatted message; reloading one yields the [`Recorded`]
/// variant.
///
/// [`Recorded`]: PlanError::Recorded
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("No physical units found matching {dimension:?}")]
    UnknownUnit { dimension: String },

    #[error("Physical min equals physical max ({value})")]
    PhysicalMinEqualsMax { value: f64 },

    #[error("Digital min equals digital max ({value})")]
    DigitalMinEqualsMax { value: i32 },

    #[error("Invalid sampling geometry: {samples_per_record} samples per {seconds_per_record} second record")]
    InvalidSampleRate {
        samples_per_record: i32,
        seconds_per_record: f64,
    },

    #[error("Mismatched sample rates across grouped channels: {rates:?}")]
    RateMismatch { rates: Vec<f64> },

    #[error("Grouped rows disagree on {field}: {values:?}")]
    MixedGroupKeys {
        field: &'static str,
        values: Vec<String>,
    },

    #[error("Grouped signals carry different sample counts: {lengths:?}")]
    MismatchedSampleCount { lengths: Vec<usize> },

    #[error("No integer sample type can represent the digital range [{lo}, {hi}]")]
    UnrepresentableEncoding { lo: f64, hi: f64 },

    #[error("Cannot promote an empty set of encodings")]
    EmptyGroup,

    /// An error message read back from a serialized plan.
    #[error("{0}")]
    Recorded(String),
}

pub type Result<T> = std::result::Result<T, OndaEdfError>;
