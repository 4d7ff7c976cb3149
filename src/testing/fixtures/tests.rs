use super::*;

fn temp_wav(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("impulse_fixture_{}_{}.wav", name, std::process::id()))
}

#[test]
fn synthetic_fixture_has_requested_length() {
    let spec = FixtureSpec::synthetic("sine", SyntheticPattern::Sine, 250);
    let waveform = spec.load().unwrap();

    assert_eq!(waveform.sample_rate(), DEFAULT_SAMPLE_RATE);
    assert_eq!(waveform.channel_count(), 1);
    assert_eq!(waveform.frames(), 11_025);
}

#[test]
fn echo_taps_place_pulses_at_onsets() {
    let samples = SyntheticSpec::new(SyntheticPattern::EchoTaps).render(44_100, 2_000);

    assert_eq!(samples.len(), 88_200);
    assert!((samples[0] - 0.8).abs() < 1e-6);
    assert!((samples[22_050] - 0.48).abs() < 1e-6);
    assert!((samples[44_100] - 0.24).abs() < 1e-6);
    // Silence between taps
    assert_eq!(samples[441], 0.0);
    assert_eq!(samples[30_000], 0.0);
}

#[test]
fn noise_is_deterministic_per_seed() {
    let spec = SyntheticSpec::new(SyntheticPattern::WhiteNoise);
    assert_eq!(spec.render(8_000, 50), spec.render(8_000, 50));

    let reseeded = SyntheticSpec {
        seed: 7,
        ..spec.clone()
    };
    assert_ne!(spec.render(8_000, 50), reseeded.render(8_000, 50));
}

#[test]
fn decaying_noise_falls_sixty_db_over_rt60() {
    let spec = SyntheticSpec {
        rt60_secs: 0.5,
        ..SyntheticSpec::new(SyntheticPattern::DecayingNoise)
    };
    let samples = spec.render(10_000, 1_000);

    let head = samples[..500].iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
    let tail = samples[6_000..].iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
    assert!(head > 0.5, "head peak {}", head);
    assert!(tail < head / 1000.0, "tail peak {} vs head {}", tail, head);
}

#[test]
fn stereo_fixture_duplicates_channels() {
    let spec = FixtureSpec {
        channels: 2,
        ..FixtureSpec::synthetic("stereo", SyntheticPattern::Sine, 10)
    };
    let waveform = spec.load().unwrap();
    assert_eq!(waveform.channel_count(), 2);
    assert_eq!(waveform.channel(0), waveform.channel(1));
}

#[test]
fn invalid_layouts_rejected() {
    let spec = FixtureSpec {
        channels: 3,
        ..FixtureSpec::synthetic("wide", SyntheticPattern::Silence, 10)
    };
    assert!(matches!(
        spec.validate(),
        Err(AnalysisError::UnsupportedChannelLayout { channels: 3, .. })
    ));

    let spec = FixtureSpec {
        sample_rate: 0,
        ..FixtureSpec::synthetic("rate", SyntheticPattern::Silence, 10)
    };
    assert!(spec.load().is_err());
}

#[test]
fn spec_parses_from_json_with_defaults() {
    let json = r#"{
        "id": "taps",
        "source": { "kind": "synthetic", "pattern": "echo-taps" }
    }"#;
    let spec: FixtureSpec = serde_json::from_str(json).unwrap();

    assert_eq!(spec.sample_rate, DEFAULT_SAMPLE_RATE);
    assert_eq!(spec.duration_ms, 2_000);
    match spec.source {
        FixtureSource::Synthetic(synthetic) => {
            assert_eq!(synthetic.pattern, SyntheticPattern::EchoTaps);
            assert_eq!(synthetic.amplitude, 0.8);
        }
        other => panic!("expected synthetic source, got {:?}", other),
    }
}

#[test]
fn wav_round_trip_keeps_layout() {
    let path = temp_wav("round_trip");
    let original =
        Waveform::from_channels(vec![vec![0.5, -0.25, 0.0], vec![0.1, 0.2, -1.0]], 22_050).unwrap();

    write_wav(&path, &original).unwrap();
    let decoded = read_wav(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(decoded, original);
}

#[test]
fn wav_fixture_source_reads_file() {
    let path = temp_wav("source");
    let waveform = Waveform::mono(vec![0.0, 0.5, -0.5, 0.25], 8_000).unwrap();
    write_wav(&path, &waveform).unwrap();

    let spec = FixtureSpec {
        source: FixtureSource::WavFile { path: path.clone() },
        ..FixtureSpec::synthetic("wav", SyntheticPattern::Silence, 0)
    };
    let loaded = spec.load().unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded.sample_rate(), 8_000);
    assert_eq!(loaded.frames(), 4);
}

#[test]
fn int_wav_scaled_by_bit_depth() {
    let path = temp_wav("int16");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for value in [16_384i16, -32_768, 0] {
        writer.write_sample(value).unwrap();
    }
    writer.finalize().unwrap();

    let decoded = read_wav(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(decoded.channel(0), Some(&[0.5, -1.0, 0.0][..]));
}

#[test]
fn missing_wav_is_io_error() {
    let result = read_wav(Path::new("/nonexistent/impulse.wav"));
    assert!(matches!(result, Err(AnalysisError::Io { .. })));
}
