//! Plan execution: turn an EDF file plus its file plan into uniformly
//! encoded Onda-style signals.
//!
//! The split between soft and hard failures matters here. Anything caused
//! by the signal data itself (unpromotable encodings, mixed units under
//! custom group keys, uneven sample counts) is recorded on the affected
//! rows of the returned plan and that group is skipped. Anything caused by
//! the plan not fitting the file (stale indices, relabeled signals) aborts
//! the run.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::encode::{promote_encodings, Dither, DitherState};
use crate::error::{OndaEdfError, PlanError, Result};
use crate::plan::{plan_file, PlanConfig};
use crate::schema::FilePlanV2;
use crate::types::{EdfFile, EdfSignal, Encoding, Samples, SamplesInfo};

/// Merges one group's rows into the descriptor of its output signal.
///
/// `Ok(None)` means the group cannot convert because some row is missing a
/// required field (an unmatched signal, or a row that failed planning);
/// that is a silent skip, not an error. `Err` means the rows contradict
/// each other or their encodings cannot be promoted; callers record it on
/// every row of the group.
pub fn merge_samples_info(
    rows: &[FilePlanV2],
) -> std::result::Result<Option<SamplesInfo>, PlanError> {
    if rows.is_empty() {
        return Err(PlanError::EmptyGroup);
    }

    let mut channels = Vec::with_capacity(rows.len());
    let mut encodings = Vec::with_capacity(rows.len());
    for row in rows {
        let (Some(channel), Some(encoding)) = (row.channel.as_ref(), row.encoding()) else {
            return Ok(None);
        };
        if row.sensor_type.is_none() || row.sample_unit.is_none() {
            return Ok(None);
        }
        channels.push(channel.clone());
        encodings.push(encoding);
    }

    let sensor_type = require_agreement(rows, "sensor_type", |row| row.sensor_type.clone())?;
    let sample_unit = require_agreement(rows, "sample_unit", |row| row.sample_unit.clone())?;
    let sensor_label = rows[0]
        .sensor_label
        .clone()
        .unwrap_or_else(|| sensor_type.clone());

    let promoted = promote_encodings(&encodings)?;
    Ok(Some(SamplesInfo {
        sensor_type,
        sensor_label,
        channels,
        sample_unit,
        sample_resolution_in_unit: promoted.sample_resolution_in_unit,
        sample_offset_in_unit: promoted.sample_offset_in_unit,
        sample_type: promoted.sample_type,
        sample_rate: promoted.sample_rate,
    }))
}

fn require_agreement<F>(
    rows: &[FilePlanV2],
    field: &'static str,
    get: F,
) -> std::result::Result<String, PlanError>
where
    F: Fn(&FilePlanV2) -> Option<String>,
{
    let mut values: Vec<String> = Vec::new();
    for row in rows {
        if let Some(value) = get(row) {
            if !values.contains(&value) {
                values.push(value);
            }
        }
    }
    if values.len() == 1 {
        Ok(values.remove(0))
    } else {
        Err(PlanError::MixedGroupKeys { field, values })
    }
}

/// Converts one group of EDF signals into the samples matrix described by
/// `info`.
///
/// Members whose own encoding equals the target bit-for-bit are copied
/// verbatim, preserving every digital value. Everything else is decoded to
/// physical units and re-encoded, with `dither` noise added before
/// rounding.
///
/// Member sample counts must agree and every member must already run at
/// the target rate; both are hard errors here. The plan executor pre-checks
/// sample counts and records violations as group errors instead of getting
/// this far.
pub fn onda_samples_from_edf_signals(
    info: &SamplesInfo,
    members: &[&EdfSignal],
    seconds_per_record: f64,
    dither: Dither,
) -> Result<Samples> {
    let target = info.encoding();

    let mut encodings = Vec::with_capacity(members.len());
    for member in members {
        let encoding = Encoding::from_header(&member.header, seconds_per_record)?;
        if encoding.sample_rate.to_bits() != target.sample_rate.to_bits() {
            return Err(OndaEdfError::MismatchedSampleRate {
                expected: target.sample_rate,
                actual: encoding.sample_rate,
            });
        }
        encodings.push(encoding);
    }

    let lengths: Vec<usize> = members.iter().map(|member| member.samples.len()).collect();
    if lengths.windows(2).any(|pair| pair[0] != pair[1]) {
        return Err(OndaEdfError::MismatchedSampleCount { lengths });
    }
    let sample_count = lengths.first().copied().unwrap_or(0);

    // 噪声序列贯穿整个矩阵，各通道互不相关
    let mut noise = DitherState::new(dither, target.sample_resolution_in_unit);
    let mut data: Vec<i64> = Vec::with_capacity(members.len() * sample_count);
    for (member, encoding) in members.iter().zip(&encodings) {
        if encoding.identical(&target) {
            data.extend(member.samples.iter().map(|&sample| sample as i64));
        } else {
            for &sample in &member.samples {
                let physical = encoding.decode(sample as i64);
                data.push(target.encode(physical, noise.next_noise()));
            }
        }
    }

    Ok(Samples {
        info: info.clone(),
        edf_channels: members
            .iter()
            .map(|member| member.header.label.clone())
            .collect(),
        data,
    })
}

enum GroupOutcome {
    Converted(Samples),
    Skipped,
    Failed(PlanError),
}

fn convert_group(edf: &EdfFile, rows: &[FilePlanV2], dither: Dither) -> Result<GroupOutcome> {
    let info = match merge_samples_info(rows) {
        Ok(Some(info)) => info,
        Ok(None) => return Ok(GroupOutcome::Skipped),
        Err(error) => return Ok(GroupOutcome::Failed(error)),
    };

    // 样本数在这里预检：问题记在计划行上，不中断整个文件
    let lengths: Vec<usize> = rows
        .iter()
        .map(|row| edf.signals[row.edf_signal_index].samples.len())
        .collect();
    if lengths.windows(2).any(|pair| pair[0] != pair[1]) {
        return Ok(GroupOutcome::Failed(PlanError::MismatchedSampleCount {
            lengths,
        }));
    }

    let members: Vec<&EdfSignal> = rows
        .iter()
        .map(|row| &edf.signals[row.edf_signal_index])
        .collect();
    let samples = onda_samples_from_edf_signals(&info, &members, edf.seconds_per_record, dither)?;
    Ok(GroupOutcome::Converted(samples))
}

/// Executes a file plan: validates it against the file, converts every
/// complete group, and returns the converted signals together with the
/// executed plan.
///
/// Group-scoped failures are written into the `error` column of the
/// group's rows in the returned plan and the group is skipped; the rows
/// keep their `onda_signal_index` so the intended grouping stays
/// auditable. Structural mismatches between plan and file (a signal index
/// out of range, a label that no longer agrees) are hard errors.
///
/// Converted signals come back in `onda_signal_index` order.
pub fn edf_to_onda_samples(
    edf: &EdfFile,
    plan: &[FilePlanV2],
    dither: Dither,
) -> Result<(Vec<Samples>, Vec<FilePlanV2>)> {
    let mut executed: Vec<FilePlanV2> = plan.to_vec();

    // 先整体校验计划与文件的对应关系
    for (position, row) in executed.iter().enumerate() {
        let signal = edf.signals.get(row.edf_signal_index).ok_or_else(|| {
            OndaEdfError::SignalIndexOutOfRange {
                index: position,
                signal: row.edf_signal_index,
                count: edf.signals.len(),
            }
        })?;
        if signal.header.label != row.label {
            return Err(OndaEdfError::PlanSignalMismatch {
                index: position,
                signal: row.edf_signal_index,
                planned: row.label.clone(),
                actual: signal.header.label.clone(),
            });
        }
    }

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (position, row) in executed.iter().enumerate() {
        if let Some(group) = row.onda_signal_index {
            groups.entry(group).or_default().push(position);
        }
    }

    let mut converted: Vec<Samples> = Vec::with_capacity(groups.len());
    for (group, positions) in &groups {
        let rows: Vec<FilePlanV2> = positions.iter().map(|&p| executed[p].clone()).collect();
        match convert_group(edf, &rows, dither)? {
            GroupOutcome::Converted(samples) => converted.push(samples),
            GroupOutcome::Skipped => {
                debug!("output signal {} skipped: rows missing required fields", group);
            }
            GroupOutcome::Failed(error) => {
                warn!("output signal {} not converted: {}", group, error);
                for &position in positions {
                    executed[position].error = Some(error.clone());
                }
            }
        }
    }

    debug!(
        "converted {} of {} planned output signals",
        converted.len(),
        groups.len()
    );
    Ok((converted, executed))
}

/// Plans and executes in one call, with the default grouping.
///
/// # Examples
///
/// ```rust
/// use onda_edf::{convert_edf_file, Dither, EdfFile, EdfSignal, PlanConfig, SignalHeader};
///
/// let mut edf = EdfFile::new(1.0);
/// edf.signals.push(EdfSignal {
///     header: SignalHeader {
///         label: "EEG Cz".to_string(),
///         transducer_type: String::new(),
///         physical_dimension: "uV".to_string(),
///         physical_minimum: -100.0,
///         physical_maximum: 100.0,
///         digital_minimum: -32768,
///         digital_maximum: 32767,
///         prefilter: String::new(),
///         samples_per_record: 4,
///     },
///     samples: vec![0, 1000, -1000, 32767],
/// });
///
/// let (converted, plan) = convert_edf_file(&edf, &PlanConfig::default(), Dither::Off)?;
/// assert_eq!(converted.len(), 1);
/// assert_eq!(converted[0].info.channels, vec!["cz".to_string()]);
/// // 单成员组沿用原编码，数字值逐个保留
/// assert_eq!(converted[0].data, vec![0, 1000, -1000, 32767]);
/// assert_eq!(plan[0].onda_signal_index, Some(0));
/// # Ok::<(), onda_edf::OndaEdfError>(())
/// ```
pub fn convert_edf_file(
    edf: &EdfFile,
    config: &PlanConfig,
    dither: Dither,
) -> Result<(Vec<Samples>, Vec<FilePlanV2>)> {
    let plan = plan_file(edf, config);
    edf_to_onda_samples(edf, &plan, dither)
}
