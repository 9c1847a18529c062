use onda_edf::{
    convert_edf_file, edf_to_onda_samples, plan_file, ChannelMatch, ChannelMatcher, ChannelSpec,
    Dither, EdfFile, EdfSignal, LabelEntry, PlanConfig, SampleType, SignalHeader,
};
use uuid::Uuid;

// 构造测试信号的辅助函数
fn make_signal(
    label: &str,
    dimension: &str,
    physical_range: f64,
    samples_per_record: i32,
    samples: Vec<i32>,
) -> EdfSignal {
    EdfSignal {
        header: SignalHeader {
            label: label.to_string(),
            transducer_type: String::new(),
            physical_dimension: dimension.to_string(),
            physical_minimum: -physical_range,
            physical_maximum: physical_range,
            digital_minimum: -32768,
            digital_maximum: 32767,
            prefilter: String::new(),
            samples_per_record,
        },
        samples,
    }
}

// 数字域的正弦测试波
fn sine_samples(count: usize, cycles: f64, amplitude: f64) -> Vec<i32> {
    (0..count)
        .map(|i| {
            let t = i as f64 / count as f64;
            (amplitude * (2.0 * std::f64::consts::PI * cycles * t).sin()).round() as i32
        })
        .collect()
}

// 一份小型多导睡眠图：6路EEG + 2路EOG + ECG + 血氧 + 一条无法识别的杂项
fn psg_file() -> EdfFile {
    let mut edf = EdfFile::new(1.0);
    let eeg_labels = [
        "EEG F3-M2",
        "EEG F4-M1",
        "EEG C3-M2",
        "EEG C4-M1",
        "EEG O1-M2",
        "EEG O2-M1",
    ];
    for (i, label) in eeg_labels.iter().enumerate() {
        edf.signals.push(make_signal(
            label,
            "uV",
            100.0,
            128,
            sine_samples(128, (i + 1) as f64, 8000.0),
        ));
    }
    edf.signals.push(make_signal(
        "EOG LOC",
        "uV",
        100.0,
        128,
        sine_samples(128, 0.5, 3000.0),
    ));
    edf.signals.push(make_signal(
        "EOG ROC",
        "uV",
        100.0,
        128,
        sine_samples(128, 0.5, 2500.0),
    ));
    edf.signals.push(make_signal(
        "ECG II",
        "mV",
        5.0,
        256,
        sine_samples(256, 1.2, 20000.0),
    ));
    edf.signals
        .push(make_signal("SaO2", "%", 100.0, 1, vec![31000]));
    edf.signals
        .push(make_signal("Technician Note", "", 100.0, 1, vec![0]));
    edf
}

#[test]
fn test_full_psg_conversion() {
    let edf = psg_file();
    let (converted, plan) = convert_edf_file(&edf, &PlanConfig::default(), Dither::Off).unwrap();

    // 四路输出信号，按首次出现的顺序
    let sensor_types: Vec<&str> = converted
        .iter()
        .map(|signal| signal.info.sensor_type.as_str())
        .collect();
    assert_eq!(sensor_types, vec!["eeg", "eog", "ecg", "spo2"]);

    let eeg = &converted[0];
    assert_eq!(eeg.channel_count(), 6);
    assert_eq!(eeg.sample_count(), 128);
    assert_eq!(
        eeg.info.channels,
        vec!["f3-a2", "f4-a1", "c3-a2", "c4-a1", "o1-a2", "o2-a1"]
    );
    assert_eq!(eeg.info.sample_unit, "microvolt");
    assert_eq!(eeg.info.sample_type, SampleType::Int16);
    assert_eq!(eeg.info.sample_rate, 128.0);
    assert_eq!(eeg.edf_channels[0], "EEG F3-M2");

    // 口径一致的成员逐位进入矩阵
    let expected: Vec<i64> = edf.signals[2].samples.iter().map(|&s| s as i64).collect();
    assert_eq!(eeg.channel_samples(2), expected.as_slice());

    let eog = &converted[1];
    assert_eq!(eog.info.channels, vec!["left", "right"]);

    // 计划行覆盖全部输入，未识别的排最后且不算错误
    assert_eq!(plan.len(), edf.signals.len());
    let last = plan.last().unwrap();
    assert_eq!(last.label, "Technician Note");
    assert_eq!(last.onda_signal_index, None);
    assert!(last.error.is_none());

    println!(
        "converted {} output signals from {} EDF channels",
        converted.len(),
        edf.signals.len()
    );
}

#[test]
fn test_amended_plan_reexecutes() {
    let edf = psg_file();
    let mut plan = plan_file(&edf, &PlanConfig::default());

    // 审核阶段：补上录制ID，并手工改掉一个通道名
    let recording = Uuid::parse_str("018e1fd3-64a2-7ad0-b6d5-2c9f4f0a9be2").unwrap();
    for row in &mut plan {
        row.recording = Some(recording);
        if row.label == "ECG II" {
            row.channel = Some("lead_ii".to_string());
        }
    }

    let (converted, executed) = edf_to_onda_samples(&edf, &plan, Dither::Off).unwrap();
    let ecg = converted
        .iter()
        .find(|signal| signal.info.sensor_type == "ecg")
        .unwrap();
    assert_eq!(ecg.info.channels, vec!["lead_ii"]);
    assert!(executed.iter().all(|row| row.recording == Some(recording)));
}

#[test]
fn test_failed_group_does_not_block_others() {
    let mut edf = EdfFile::new(1.0);
    edf.signals
        .push(make_signal("EEG F3-M2", "uV", 100.0, 128, vec![0; 128]));
    // 样本数不齐，整组EEG失败
    edf.signals
        .push(make_signal("EEG C3-M2", "uV", 100.0, 128, vec![0; 100]));
    edf.signals.push(make_signal(
        "ECG II",
        "mV",
        5.0,
        256,
        sine_samples(256, 1.0, 1000.0),
    ));

    let (converted, executed) = convert_edf_file(&edf, &PlanConfig::default(), Dither::Off).unwrap();
    assert_eq!(converted.len(), 1);
    assert_eq!(converted[0].info.sensor_type, "ecg");

    let eeg_rows: Vec<_> = executed
        .iter()
        .filter(|row| row.sensor_type.as_deref() == Some("eeg"))
        .collect();
    assert_eq!(eeg_rows.len(), 2);
    for row in &eeg_rows {
        assert!(row.error.is_some(), "EEG row {} should carry the group error", row.label);
    }
}

struct SiteOximeter;

impl ChannelMatcher for SiteOximeter {
    fn try_match(&self, header: &SignalHeader) -> Option<ChannelMatch> {
        header.label.starts_with("OXI-").then(|| ChannelMatch {
            sensor_type: "spo2".to_string(),
            channel: "spo2".to_string(),
        })
    }
}

#[test]
fn test_extended_config_covers_site_specific_labels() {
    let mut config = PlanConfig::default();
    // 本站点特有的标签：规则表加一条，剩下的交给兜底匹配器
    config.labels.push(LabelEntry::new(
        &["pleth", "pulse_ox"],
        vec![ChannelSpec::literal("pleth")],
    ));
    config.custom_matchers.push(Box::new(SiteOximeter));

    let mut edf = EdfFile::new(1.0);
    edf.signals
        .push(make_signal("Pleth", "%", 100.0, 64, vec![0; 64]));
    edf.signals
        .push(make_signal("OXI-77", "%", 100.0, 1, vec![30000]));

    let (converted, plan) = convert_edf_file(&edf, &config, Dither::Off).unwrap();
    assert_eq!(converted.len(), 2);
    assert_eq!(converted[0].info.sensor_type, "pleth");
    assert_eq!(converted[1].info.sensor_type, "spo2");
    assert!(plan.iter().all(|row| row.onda_signal_index.is_some()));
}
