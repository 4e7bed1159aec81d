/// Integration tests for the modal renderer CLI.
///
/// These render short clips through the binary and check:
/// 1. WAV format and length
/// 2. Batch naming
/// 3. Velocity scales amplitude
/// 4. Renders are deterministic
/// 5. Config files and mode tables
use std::process::Command;

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-p", "modal-renderer", "--"]);
    cmd
}

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(name)
}

#[test]
fn test_cli_renders_wav() {
    let output_path = temp_path("modal_integration_cli.wav");
    let _ = std::fs::remove_file(&output_path);

    let status = cargo_bin()
        .args(["note", "-n", "60", "-v", "100", "-d", "0.5", "-o"])
        .arg(&output_path)
        .status()
        .expect("failed to run modal-renderer");

    assert!(status.success(), "modal-renderer exited with error");
    assert!(output_path.exists(), "WAV file not created");

    let reader = hound::WavReader::open(&output_path).expect("invalid WAV file");
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.spec().sample_rate, 48000);
    assert_eq!(reader.spec().bits_per_sample, 24);
    assert_eq!(reader.len(), 24000);
    drop(reader);
    assert!(wav_peak(&output_path) > 0.0, "impulse note should ring");

    std::fs::remove_file(&output_path).ok();
}

#[test]
fn test_cli_stereo() {
    let output_path = temp_path("modal_integration_stereo.wav");
    let status = cargo_bin()
        .args(["note", "-n", "57", "-d", "0.2", "--stereo", "-o"])
        .arg(&output_path)
        .status()
        .unwrap();
    assert!(status.success());

    let samples = read_wav_samples(&output_path);
    assert_eq!(samples.len(), 2 * 9600);
    for frame in samples.chunks(2) {
        assert_eq!(frame[0], frame[1]);
    }
    std::fs::remove_file(&output_path).ok();
}

#[test]
fn test_cli_multi_note() {
    let output_dir = std::env::temp_dir();
    let status = cargo_bin()
        .args(["note", "-n", "60,72", "-v", "100", "-d", "0.3", "--output-dir"])
        .arg(&output_dir)
        .status()
        .expect("failed to run modal-renderer");

    assert!(status.success());
    let c4 = output_dir.join("modal_C4_v100.wav");
    let c5 = output_dir.join("modal_C5_v100.wav");
    assert!(c4.exists());
    assert!(c5.exists());

    std::fs::remove_file(&c4).ok();
    std::fs::remove_file(&c5).ok();
}

#[test]
fn test_cli_velocity_sweep() {
    let output_dir = temp_path("modal_velocity_sweep");
    std::fs::create_dir_all(&output_dir).unwrap();
    let status = cargo_bin()
        .args(["note", "-n", "69", "-v", "30,100,127", "-d", "0.2", "--output-dir"])
        .arg(&output_dir)
        .status()
        .expect("failed to run modal-renderer");

    assert!(status.success());
    let peak_30 = wav_peak(&output_dir.join("modal_A4_v30.wav"));
    let peak_100 = wav_peak(&output_dir.join("modal_A4_v100.wav"));
    let peak_127 = wav_peak(&output_dir.join("modal_A4_v127.wav"));

    assert!(
        peak_127 > peak_100,
        "vel 127 peak ({peak_127}) should exceed vel 100 ({peak_100})"
    );
    assert!(
        peak_100 > peak_30,
        "vel 100 peak ({peak_100}) should exceed vel 30 ({peak_30})"
    );

    std::fs::remove_dir_all(&output_dir).ok();
}

#[test]
fn test_deterministic_noise_render() {
    let path1 = temp_path("modal_det_1.wav");
    let path2 = temp_path("modal_det_2.wav");

    for path in [&path1, &path2] {
        let _ = std::fs::remove_file(path);
        let status = cargo_bin()
            .args(["note", "-n", "60", "-v", "80", "-d", "0.3", "--mode", "noise", "-o"])
            .arg(path)
            .status()
            .unwrap();
        assert!(status.success());
    }

    let samples1 = read_wav_samples(&path1);
    let samples2 = read_wav_samples(&path2);
    assert!(samples1.iter().any(|&s| s != 0));
    assert_eq!(samples1, samples2, "two renders of the same note should be identical");

    std::fs::remove_file(&path1).ok();
    std::fs::remove_file(&path2).ok();
}

#[test]
fn test_inharmonic_preset_render() {
    let path = temp_path("modal_marimba.wav");
    let status = cargo_bin()
        .args([
            "note",
            "-n",
            "57",
            "-d",
            "0.5",
            "--mode",
            "inharmonic-impulse",
            "--preset",
            "marimba",
            "-o",
        ])
        .arg(&path)
        .status()
        .unwrap();
    assert!(status.success());
    assert!(wav_peak(&path) > 0.0);
    std::fs::remove_file(&path).ok();
}

#[test]
fn test_unknown_preset_fails() {
    let status = cargo_bin()
        .args(["note", "--preset", "kazoo", "-o"])
        .arg(temp_path("modal_kazoo.wav"))
        .status()
        .unwrap();
    assert!(!status.success());
}

#[test]
fn test_config_file_sets_sample_rate() {
    let config = temp_path("modal_config.json");
    let path = temp_path("modal_config_render.wav");
    std::fs::write(&config, r#"{ "sample_rate": 44100.0, "voices": 2 }"#).unwrap();

    let status = cargo_bin()
        .args(["note", "-d", "0.5", "--config"])
        .arg(&config)
        .arg("-o")
        .arg(&path)
        .status()
        .unwrap();
    assert!(status.success());

    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().sample_rate, 44100);
    assert_eq!(reader.len(), 22050);

    std::fs::remove_file(&config).ok();
    std::fs::remove_file(&path).ok();
}

#[test]
fn test_modes_json() {
    let output = cargo_bin()
        .args(["modes", "-n", "57", "--json"])
        .output()
        .expect("failed to run modal-renderer");
    assert!(output.status.success());

    let text = String::from_utf8(output.stdout).unwrap();
    // Harmonic layout at 220 Hz, beta 2: first sounding partial is index 1
    assert!(text.contains("\"index\": 1"), "{text}");
    assert!(text.contains("\"fundamental\": 220.0"), "{text}");
}

#[test]
fn test_modes_preset_table() {
    let output = cargo_bin()
        .args(["modes", "-n", "57", "--preset", "marimba"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).unwrap();
    assert!(text.contains("Marimba"));
    assert!(text.contains("2443.000"));
}

fn wav_peak(path: &std::path::Path) -> f64 {
    let mut reader = hound::WavReader::open(path).expect("failed to open WAV");
    let max_val = (1i32 << (reader.spec().bits_per_sample - 1)) as f64;
    reader
        .samples::<i32>()
        .map(|s| (s.unwrap() as f64 / max_val).abs())
        .fold(0.0f64, f64::max)
}

fn read_wav_samples(path: &std::path::Path) -> Vec<i32> {
    let mut reader = hound::WavReader::open(path).expect("failed to open WAV");
    reader.samples::<i32>().map(|s| s.unwrap()).collect()
}
