//! Canonical label matching: from free-text EDF channel labels to
//! `(sensor_type, channel)` pairs.
//!
//! EDF labels are whatever the recording software wrote: `"EEG F3-A1"`,
//! `"[ekG]  avl-REF"`, `"Pulse"`. Matching works off an ordered table of
//! [`LabelEntry`] rules; anything the table cannot claim is simply left
//! unmatched (that is an expected outcome, not an error).

use crate::types::SignalHeader;

/// One channel a label rule can produce: the canonical channel name plus
/// alternate spellings that canonicalize to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSpec {
    pub name: String,
    pub alternates: Vec<String>,
}

impl ChannelSpec {
    /// A channel with no alternate spellings.
    pub fn literal(name: &str) -> Self {
        ChannelSpec {
            name: name.to_string(),
            alternates: Vec::new(),
        }
    }

    pub fn with_alternates(name: &str, alternates: &[&str]) -> Self {
        ChannelSpec {
            name: name.to_string(),
            alternates: alternates.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// An ordered matching rule: the signal-name prefixes it recognizes and the
/// channels it can produce.
///
/// The first signal name doubles as the sensor type recorded on matched
/// rows, e.g. `["ecg", "ekg"]` matches labels written either way but always
/// reports `"ecg"`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEntry {
    pub signal_names: Vec<String>,
    pub channels: Vec<ChannelSpec>,
}

impl LabelEntry {
    pub fn new(signal_names: &[&str], channels: Vec<ChannelSpec>) -> Self {
        LabelEntry {
            signal_names: signal_names.iter().map(|s| s.to_string()).collect(),
            channels,
        }
    }

    pub fn sensor_type(&self) -> Option<&str> {
        self.signal_names.first().map(String::as_str)
    }
}

/// A successful label match.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMatch {
    pub sensor_type: String,
    pub channel: String,
}

/// The single interface both built-in rules and user-supplied fallbacks
/// implement.
///
/// Returning `None` means "not mine" and matching moves on to the next
/// rule; it is never an error.
///
/// # Examples
///
/// A custom matcher that claims every pulse-oximetry label a site's
/// hardware writes:
///
/// ```rust
/// use onda_edf::{ChannelMatch, ChannelMatcher, SignalHeader};
///
/// struct SiteOximeter;
///
/// impl ChannelMatcher for SiteOximeter {
///     fn try_match(&self, header: &SignalHeader) -> Option<ChannelMatch> {
///         header.label.starts_with("OXI-").then(|| ChannelMatch {
///             sensor_type: "spo2".to_string(),
///             channel: "spo2".to_string(),
///         })
///     }
/// }
/// ```
pub trait ChannelMatcher {
    fn try_match(&self, header: &SignalHeader) -> Option<ChannelMatch>;
}

impl ChannelMatcher for LabelEntry {
    fn try_match(&self, header: &SignalHeader) -> Option<ChannelMatch> {
        let sensor_type = self.sensor_type()?;
        for spec in &self.channels {
            if let Some(channel) =
                match_edf_label(&header.label, &self.signal_names, &spec.name, &self.channels)
            {
                return Some(ChannelMatch {
                    sensor_type: sensor_type.to_string(),
                    channel,
                });
            }
        }
        None
    }
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '-' | '_' | ':' | ',')
}

/// Step 1: drop parentheses, lowercase, trim surrounding whitespace.
fn normalize_label(label: &str) -> String {
    let stripped: String = label.chars().filter(|&c| c != '(' && c != ')').collect();
    stripped.to_lowercase().trim().to_string()
}

/// Step 2: remove a leading signal-name prefix.
///
/// The prefix counts only when wrapped in square brackets (`[ecg]avl`) or
/// followed by at least one separator (`ecg avl`, `ecg-avl`). A fused
/// spelling like `ecg2` is left alone so alternate lookup can see it whole.
fn strip_signal_prefix<S: AsRef<str>>(text: &str, signal_names: &[S]) -> String {
    for name in signal_names {
        let name = name.as_ref().to_lowercase();

        let bracketed = format!("[{}]", name);
        if let Some(rest) = text.strip_prefix(bracketed.as_str()) {
            let rest = rest.trim_start_matches(is_separator);
            if !rest.is_empty() {
                return rest.to_string();
            }
        }

        if let Some(rest) = text.strip_prefix(name.as_str()) {
            if rest.starts_with(is_separator) {
                let rest = rest.trim_start_matches(is_separator);
                if !rest.is_empty() {
                    return rest.to_string();
                }
            }
        }
    }
    text.to_string()
}

/// Step 3: drop one trailing generic reference token (`ref`, `REF2`, ...).
fn strip_trailing_reference(text: &str) -> String {
    let without_digits = text.trim_end_matches(|c: char| c.is_ascii_digit());
    if let Some(rest) = without_digits.strip_suffix("ref") {
        let rest = rest.trim_end_matches(is_separator);
        if !rest.is_empty() {
            return rest.to_string();
        }
    }
    text.to_string()
}

/// Step 4: encode characters that cannot appear in channel names.
fn replace_special(text: &str) -> String {
    text.replace('+', "_plus_").replace('/', "_over_")
}

/// Steps 1-4. Idempotent on its own output for realistic labels, which is
/// what lets already-canonical text pass through planning unchanged.
fn transform_label<S: AsRef<str>>(label: &str, signal_names: &[S]) -> String {
    let text = normalize_label(label);
    let text = strip_signal_prefix(&text, signal_names);
    let text = strip_trailing_reference(&text);
    replace_special(&text)
}

fn canonical_for<'a>(candidate: &str, canonical_names: &'a [ChannelSpec]) -> Option<&'a str> {
    canonical_names
        .iter()
        .find(|spec| spec.alternates.iter().any(|alt| alt == candidate))
        .map(|spec| spec.name.as_str())
}

/// Step 5: substitute alternate spellings with their canonical names.
///
/// Tried against the whole text first, then against each `-`-separated
/// component, so a reference label like `fp1-m1` becomes `fp1-a1`.
fn substitute_canonical(text: &str, canonical_names: &[ChannelSpec]) -> String {
    if let Some(name) = canonical_for(text, canonical_names) {
        return name.to_string();
    }
    if text.contains('-') {
        let parts: Vec<String> = text
            .split('-')
            .map(|part| {
                canonical_for(part, canonical_names)
                    .unwrap_or(part)
                    .to_string()
            })
            .collect();
        return parts.join("-");
    }
    text.to_string()
}

/// Leading token of the transformed text, minus one optional sign.
fn leading_token(text: &str) -> &str {
    let rest = text
        .strip_prefix('+')
        .or_else(|| text.strip_prefix('-'))
        .unwrap_or(text);
    let end = rest
        .find(|c: char| c == '-' || c.is_whitespace())
        .unwrap_or(rest.len());
    &rest[..end]
}

/// Canonicalizes a free-text EDF label against one candidate channel.
///
/// Returns the full transformed label when its leading token equals
/// `channel_name`, otherwise `None`. The transformation:
///
/// 1. trim, drop `(`/`)`, lowercase;
/// 2. strip a leading signal-name prefix (`"EEG F3"`, `"[ecg] avl"`);
/// 3. strip a trailing generic reference (`"-REF"`, `"ref2"`);
/// 4. encode `+` as `_plus_` and `/` as `_over_`;
/// 5. replace alternate spellings with canonical channel names;
/// 6. compare the leading token against `channel_name`.
///
/// # Examples
///
/// ```rust
/// use onda_edf::{match_edf_label, ChannelSpec};
///
/// // referenced lead, noisy capitalization and spacing
/// let matched = match_edf_label("[ekG]  avl-REF", &["ecg", "ekg"], "avl", &[]);
/// assert_eq!(matched, Some("avl".to_string()));
///
/// // alternate spelling: lead II written as "ECG 2"
/// let specs = [ChannelSpec::with_alternates("ii", &["2", "two", "ecg2"])];
/// let matched = match_edf_label("ECG 2", &["ecg", "ekg"], "ii", &specs);
/// assert_eq!(matched, Some("ii".to_string()));
///
/// // an unrelated label is simply no match
/// assert_eq!(match_edf_label("Pulse", &["ecg", "ekg"], "ii", &specs), None);
/// ```
pub fn match_edf_label<S: AsRef<str>>(
    label: &str,
    signal_names: &[S],
    channel_name: &str,
    canonical_names: &[ChannelSpec],
) -> Option<String> {
    let text = transform_label(label, signal_names);
    let text = substitute_canonical(&text, canonical_names);
    if leading_token(&text) == channel_name {
        Some(text)
    } else {
        None
    }
}

/// One canonical physical unit and the EDF spellings that map to it.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSpec {
    pub name: String,
    pub alternates: Vec<String>,
}

/// An ordered unit lookup table.
pub type UnitTable = Vec<UnitSpec>;

impl UnitSpec {
    pub fn new(name: &str, alternates: &[&str]) -> Self {
        UnitSpec {
            name: name.to_string(),
            alternates: alternates.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Looks up the canonical unit for an EDF `physical_dimension` value.
///
/// Whitespace is stripped and case folded before comparison; both the
/// canonical spelling and its alternates count.
///
/// # Examples
///
/// ```rust
/// use onda_edf::{edf_to_onda_unit, STANDARD_UNITS};
///
/// assert_eq!(
///     edf_to_onda_unit("uV", &STANDARD_UNITS),
///     Some("microvolt".to_string())
/// );
/// assert_eq!(
///     edf_to_onda_unit("cm H2O", &STANDARD_UNITS),
///     Some("centimeter_of_water".to_string())
/// );
/// assert_eq!(edf_to_onda_unit("furlong", &STANDARD_UNITS), None);
/// ```
pub fn edf_to_onda_unit(physical_dimension: &str, units: &[UnitSpec]) -> Option<String> {
    let dimension: String = physical_dimension
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    units
        .iter()
        .find(|spec| spec.name == dimension || spec.alternates.iter().any(|alt| *alt == dimension))
        .map(|spec| spec.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ECG_NAMES: &[&str] = &["ecg", "ekg"];

    fn lead_ii() -> Vec<ChannelSpec> {
        vec![ChannelSpec::with_alternates("ii", &["2", "two", "ecg2"])]
    }

    #[test]
    fn test_referenced_lead_with_noise() {
        let matched = match_edf_label("[ekG]  avl-REF", ECG_NAMES, "avl", &[]);
        assert_eq!(matched, Some("avl".to_string()));
    }

    #[test]
    fn test_alternate_spelling_substitution() {
        let matched = match_edf_label("ECG 2", ECG_NAMES, "ii", &lead_ii());
        assert_eq!(matched, Some("ii".to_string()));
    }

    #[test]
    fn test_fused_prefix_is_left_for_alternates() {
        // "ecg2"不拆前缀，整体作为替代拼写匹配
        let matched = match_edf_label("ECG2", ECG_NAMES, "ii", &lead_ii());
        assert_eq!(matched, Some("ii".to_string()));
    }

    #[test]
    fn test_bare_signal_name_can_be_an_alternate() {
        let specs = [ChannelSpec::with_alternates(
            "avl",
            &["ecgl", "ekgl", "ecg", "ekg", "l"],
        )];
        let matched = match_edf_label("ECG", ECG_NAMES, "avl", &specs);
        assert_eq!(matched, Some("avl".to_string()));
    }

    #[test]
    fn test_component_references_are_canonicalized() {
        let specs = [
            ChannelSpec::literal("fp1"),
            ChannelSpec::with_alternates("a1", &["m1"]),
        ];
        let matched = match_edf_label("EEG Fp1-M1", &["eeg"], "fp1", &specs);
        assert_eq!(matched, Some("fp1-a1".to_string()));
    }

    #[test]
    fn test_trailing_reference_with_digits() {
        let matched = match_edf_label("C4-REF2", &["eeg"], "c4", &[]);
        assert_eq!(matched, Some("c4".to_string()));
    }

    #[test]
    fn test_sign_prefix_is_ignored_for_comparison() {
        let matched = match_edf_label("-AVL", ECG_NAMES, "avl", &[]);
        assert_eq!(matched, Some("-avl".to_string()));
    }

    #[test]
    fn test_special_characters_are_encoded() {
        assert_eq!(transform_label::<&str>("A+B/C", &[]), "a_plus_b_over_c");
    }

    #[test]
    fn test_transform_is_idempotent() {
        let labels = [
            "[ekG]  avl-REF",
            "EEG FP1-REF",
            "ECG 2",
            "EEG Fp1-M1",
            "Pulse",
            "SpO2/Pleth",
            "C4-REF2",
            "(EOG) left:1",
        ];
        for label in labels {
            let once = transform_label(label, ECG_NAMES);
            let twice = transform_label(&once, ECG_NAMES);
            assert_eq!(once, twice, "transform not idempotent for {:?}", label);
        }
    }

    #[test]
    fn test_no_match_is_none() {
        assert_eq!(match_edf_label("Pulse", ECG_NAMES, "avl", &[]), None);
        assert_eq!(match_edf_label("", ECG_NAMES, "avl", &[]), None);
    }

    #[test]
    fn test_entry_try_match_walks_channels_in_order() {
        let entry = LabelEntry::new(
            &["ecg", "ekg"],
            vec![
                ChannelSpec::with_alternates("i", &["1"]),
                ChannelSpec::with_alternates("ii", &["2"]),
            ],
        );
        let header = SignalHeader {
            label: "EKG 2".to_string(),
            transducer_type: String::new(),
            physical_dimension: "mV".to_string(),
            physical_minimum: -5.0,
            physical_maximum: 5.0,
            digital_minimum: -32768,
            digital_maximum: 32767,
            prefilter: String::new(),
            samples_per_record: 128,
        };
        assert_eq!(entry.sensor_type(), Some("ecg"));
        let matched = entry.try_match(&header).unwrap();
        assert_eq!(matched.sensor_type, "ecg");
        assert_eq!(matched.channel, "ii");
    }

    #[test]
    fn test_unit_lookup_with_local_table() {
        let units = [
            UnitSpec::new("microvolt", &["uv", "mcv"]),
            UnitSpec::new("percent", &["%"]),
        ];
        assert_eq!(
            edf_to_onda_unit(" uV ", &units),
            Some("microvolt".to_string())
        );
        assert_eq!(
            edf_to_onda_unit("microvolt", &units),
            Some("microvolt".to_string())
        );
        assert_eq!(edf_to_onda_unit("%", &units), Some("percent".to_string()));
        assert_eq!(edf_to_onda_unit("mmHg", &units), None);
    }
}
