//! Default label and unit tables.
//!
//! Both tables are plain immutable data passed to the planner by reference;
//! callers with site-specific conventions build their own (or extend copies
//! of these) instead of mutating anything global.

use once_cell::sync::Lazy;

use crate::labels::{ChannelSpec, LabelEntry, UnitSpec};

fn chan(name: &str) -> ChannelSpec {
    ChannelSpec::literal(name)
}

fn chan_alt(name: &str, alternates: &[&str]) -> ChannelSpec {
    ChannelSpec::with_alternates(name, alternates)
}

/// Matching rules for the channel names that show up in routine EDF
/// recordings (PSG montages, ambulatory ECG, oximetry).
///
/// Entry order is priority order: the planner takes the first rule that
/// matches a label. EEG electrodes are listed front-to-back in 10-20
/// montage order; the modern temporal names (`t7`, `p8`, ...) canonicalize
/// to their classic equivalents.
pub static STANDARD_LABELS: Lazy<Vec<LabelEntry>> = Lazy::new(|| {
    vec![
        LabelEntry::new(
            &["eeg"],
            vec![
                chan("fp1"),
                chan("fpz"),
                chan("fp2"),
                chan("f7"),
                chan("f3"),
                chan("fz"),
                chan("f4"),
                chan("f8"),
                chan_alt("t3", &["t7"]),
                chan("c3"),
                chan("cz"),
                chan("c4"),
                chan_alt("t4", &["t8"]),
                chan_alt("t5", &["p7"]),
                chan("p3"),
                chan("pz"),
                chan("p4"),
                chan_alt("t6", &["p8"]),
                chan("o1"),
                chan("oz"),
                chan("o2"),
                chan_alt("a1", &["m1"]),
                chan_alt("a2", &["m2"]),
            ],
        ),
        LabelEntry::new(
            &["eog"],
            vec![
                chan_alt("left", &["loc", "e1", "leog", "eogl", "lefteye"]),
                chan_alt("right", &["roc", "e2", "reog", "eogr", "righteye"]),
            ],
        ),
        LabelEntry::new(
            &["ecg", "ekg"],
            vec![
                chan_alt("i", &["1"]),
                chan_alt("ii", &["2"]),
                chan_alt("iii", &["3"]),
                chan_alt("avl", &["ecgl", "ekgl", "ecg", "ekg", "l"]),
                chan_alt("avr", &["ekgr", "ecgr", "r"]),
                chan_alt("avf", &["ekgf", "ecgf", "f"]),
                chan("v1"),
                chan("v2"),
                chan("v3"),
                chan("v4"),
                chan("v5"),
                chan("v6"),
                chan_alt("x", &["ecgx"]),
                chan_alt("y", &["ecgy"]),
                chan_alt("z", &["ecgz"]),
            ],
        ),
        LabelEntry::new(
            &["emg"],
            vec![
                chan_alt("chin", &["chin1", "chin2", "chinz", "submental", "subm"]),
                chan_alt("left_anterior_tibialis", &["lat", "lat1", "ltib", "lleg"]),
                chan_alt("right_anterior_tibialis", &["rat", "rat1", "rtib", "rleg"]),
                chan_alt("intercostal", &["ic"]),
            ],
        ),
        LabelEntry::new(
            &["heart_rate", "hr"],
            vec![chan_alt("heart_rate", &["hr", "pulse", "pulso", "pr"])],
        ),
        LabelEntry::new(
            &["respiratory_effort", "resp"],
            vec![
                chan_alt("chest", &["thorax", "tho", "thor", "rib_cage", "chest_belt"]),
                chan_alt("abdomen", &["abd", "abdo", "belly", "abdominal"]),
            ],
        ),
        LabelEntry::new(
            &["airflow", "flow"],
            vec![
                chan_alt("airflow", &["flow", "air"]),
                chan_alt("nasal", &["nasal_pressure", "cannula", "ptaf", "pflow", "nas"]),
                chan_alt("oral", &["thermistor", "therm", "mouth"]),
            ],
        ),
        LabelEntry::new(
            &["snore"],
            vec![chan_alt("snore", &["snoring", "ronq"])],
        ),
        LabelEntry::new(
            &["spo2"],
            vec![chan_alt("spo2", &["sao2", "osat", "o2sat", "sat"])],
        ),
    ]
});

/// Canonical physical units and the `physical_dimension` spellings that map
/// to them. Lookup strips whitespace and folds case, so `"cm H2O"` and
/// `"CMH2O"` both land on `centimeter_of_water`.
pub static STANDARD_UNITS: Lazy<Vec<UnitSpec>> = Lazy::new(|| {
    vec![
        UnitSpec::new("microvolt", &["uv", "µv", "mcv", "microvolts"]),
        UnitSpec::new("millivolt", &["mv", "millivolts"]),
        UnitSpec::new("volt", &["v", "volts"]),
        UnitSpec::new("percent", &["%", "pct"]),
        UnitSpec::new("degree_celsius", &["c", "°c", "degc", "celsius"]),
        UnitSpec::new("beat_per_minute", &["bpm", "beats_per_minute"]),
        UnitSpec::new("millimeter_of_mercury", &["mmhg"]),
        UnitSpec::new("centimeter_of_water", &["cmh2o", "cmwater"]),
        UnitSpec::new("liter_per_minute", &["lpm", "l/min", "l/m"]),
        UnitSpec::new("second", &["s", "sec", "seconds"]),
        UnitSpec::new("hertz", &["hz"]),
    ]
});
