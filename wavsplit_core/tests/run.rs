use std::error::Error;
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::Path;

use tempfile::tempdir;
use wavsplit_core::{
    plan_chunks, run, run_with_progress, split_source, AudioSplitError, Config, MemorySink,
    ProgressEvent,
};

/// Generate lightweight audio fixtures for the tests at runtime.
///
/// The WAV data is synthesised procedurally so that no binary test assets need
/// to be stored in the repository. `declared_frames` lets a test claim more
/// frames in the header than are actually written.
fn tone_bytes(sample_rate: u32, channels: u16, frames: u32, declared_frames: u32) -> Vec<u8> {
    let mut samples = Vec::with_capacity(frames as usize * channels as usize * 2);
    for n in 0..frames {
        let theta = (n as f32 / sample_rate as f32) * 2.0 * std::f32::consts::PI * 440.0;
        let sample = (theta.sin() * i16::MAX as f32) as i16;
        for _ in 0..channels {
            samples.extend_from_slice(&sample.to_le_bytes());
        }
    }

    let block_align = channels * 2;
    let data_len = declared_frames * u32::from(block_align);
    let mut out = Vec::new();
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * u32::from(block_align)).to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(&samples);
    out
}

fn write_test_tone<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    channels: u16,
    frames: u32,
) -> Result<(), Box<dyn Error>> {
    File::create(path)?.write_all(&tone_bytes(sample_rate, channels, frames, frames))?;
    Ok(())
}

fn data_chunk(wav: &[u8]) -> &[u8] {
    let len = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]) as usize;
    &wav[44..44 + len]
}

#[test]
fn run_splits_reference_scenario() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    write_test_tone(work_dir.path().join("input.wav"), 8_000, 1, 8_000)?;

    let config = Config::builder("input.wav", "input", 6_000)
        .root(work_dir.path())
        .build()?;
    let outcome = run(config)?;

    assert!(!outcome.truncated);
    let summary: Vec<_> = outcome
        .chunks
        .iter()
        .map(|c| (c.output_id.as_str(), c.byte_size, c.duration_ms))
        .collect();
    assert_eq!(
        summary,
        [
            ("input-001.wav", 6_000, 375),
            ("input-002.wav", 6_000, 375),
            ("input-003.wav", 4_000, 250),
        ]
    );

    let source = fs::read(work_dir.path().join("input.wav"))?;
    let mut joined = Vec::new();
    for chunk in &outcome.chunks {
        let bytes = fs::read(work_dir.path().join(&chunk.output_id))?;
        assert_eq!(bytes.len() as u64, 44 + chunk.byte_size);
        assert_eq!(&bytes[20..36], &source[20..36], "fmt chunk must match source");
        joined.extend_from_slice(data_chunk(&bytes));
    }
    assert_eq!(joined, data_chunk(&source));

    work_dir.close()?;
    Ok(())
}

#[test]
fn run_keeps_frame_alignment_for_stereo() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    write_test_tone(work_dir.path().join("stereo.wav"), 44_100, 2, 10_000)?;

    let config = Config::builder("stereo.wav", "parts/stereo", 10_001)
        .root(work_dir.path())
        .create_dirs(true)
        .build()?;
    let outcome = run(config)?;

    // 10_001 bytes round down to 2_500 four-byte frames.
    assert_eq!(outcome.chunks.len(), 4);
    for chunk in &outcome.chunks {
        assert_eq!(chunk.byte_size, 10_000);
        assert_eq!(chunk.duration_ms, 56);
        assert!(work_dir.path().join(&chunk.output_id).is_file());
    }
    assert_eq!(outcome.total_bytes(), 40_000);

    work_dir.close()?;
    Ok(())
}

#[test]
fn run_is_repeatable() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    write_test_tone(work_dir.path().join("input.wav"), 16_000, 1, 12_345)?;

    let first = run(Config::builder("input.wav", "a", 4_096)
        .root(work_dir.path())
        .build()?)?;
    let second = run(Config::builder("input.wav", "b", 4_096)
        .root(work_dir.path())
        .build()?)?;

    assert_eq!(first.chunks.len(), second.chunks.len());
    for (a, b) in first.chunks.iter().zip(&second.chunks) {
        assert_eq!((a.byte_size, a.duration_ms), (b.byte_size, b.duration_ms));
        assert_eq!(
            fs::read(work_dir.path().join(&a.output_id))?,
            fs::read(work_dir.path().join(&b.output_id))?
        );
    }

    work_dir.close()?;
    Ok(())
}

#[test]
fn run_reports_unsupported_format_for_unknown_input() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let input_path = work_dir.path().join("input.bin");
    File::create(&input_path)?.write_all(b"not an audio file")?;

    let config = Config::new(&input_path, work_dir.path().join("part").to_string_lossy(), 1_000)?;

    let err = run(config).expect_err("unsupported input should fail");
    assert!(matches!(err, AudioSplitError::UnsupportedFormat(_)));

    work_dir.close()?;
    Ok(())
}

#[test]
fn run_rejects_budget_smaller_than_a_frame() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    write_test_tone(work_dir.path().join("stereo.wav"), 8_000, 2, 100)?;

    let config = Config::builder("stereo.wav", "part", 3)
        .root(work_dir.path())
        .build()?;
    let err = run(config).expect_err("budget below one frame should fail");
    assert!(matches!(
        err,
        AudioSplitError::InvalidBudget {
            budget: 3,
            frame_size: 4
        }
    ));

    let produced = fs::read_dir(work_dir.path())?.count();
    assert_eq!(produced, 1, "no chunk may be written");

    work_dir.close()?;
    Ok(())
}

#[test]
fn run_produces_nothing_for_empty_source() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    write_test_tone(work_dir.path().join("empty.wav"), 8_000, 1, 0)?;

    let config = Config::builder("empty.wav", "empty", 1_000)
        .root(work_dir.path())
        .build()?;
    let outcome = run(config)?;

    assert!(outcome.chunks.is_empty());
    assert!(!outcome.truncated);

    work_dir.close()?;
    Ok(())
}

#[test]
fn run_detects_missing_output_directory() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let input_path = work_dir.path().join("tone.wav");
    write_test_tone(&input_path, 8_000, 1, 4_000)?;

    let output_dir = tempdir()?;
    let output_path = fs::canonicalize(output_dir.path())?;
    let config = Config::new(
        &input_path,
        output_path.join("part").to_string_lossy(),
        1_000,
    )?;

    // Remove the directory after configuration has been created to simulate external deletion.
    drop(output_dir);
    assert!(!output_path.exists());

    let err = run(config).expect_err("missing output directory should be reported");
    match err {
        AudioSplitError::MissingOutputDirectory(path) => {
            assert_eq!(path, output_path);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    work_dir.close()?;
    Ok(())
}

#[test]
fn config_rejects_invalid_settings() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    write_test_tone(work_dir.path().join("tone.wav"), 8_000, 1, 10)?;

    let zero = Config::builder("tone.wav", "part", 0)
        .root(work_dir.path())
        .build();
    assert!(matches!(zero, Err(AudioSplitError::InvalidChunkSize)));

    let no_name = Config::builder("tone.wav", "parts/", 100)
        .root(work_dir.path())
        .build();
    assert!(matches!(no_name, Err(AudioSplitError::InvalidOutputPrefix(_))));

    let missing_dir = Config::builder("tone.wav", "nowhere/part", 100)
        .root(work_dir.path())
        .build();
    assert!(matches!(
        missing_dir,
        Err(AudioSplitError::MissingOutputDirectory(_))
    ));

    work_dir.close()?;
    Ok(())
}

#[test]
fn run_refuses_to_overwrite_unless_asked() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    write_test_tone(work_dir.path().join("tone.wav"), 8_000, 1, 1_000)?;
    fs::write(work_dir.path().join("tone-001.wav"), b"keep me")?;

    let config = Config::builder("tone.wav", "tone", 10_000)
        .root(work_dir.path())
        .build()?;
    let err = run(config).expect_err("existing chunk should not be replaced");
    assert!(matches!(err, AudioSplitError::OutputExists(_)));
    assert_eq!(fs::read(work_dir.path().join("tone-001.wav"))?, b"keep me");

    let config = Config::builder("tone.wav", "tone", 10_000)
        .root(work_dir.path())
        .overwrite(true)
        .build()?;
    let outcome = run(config)?;
    assert_eq!(outcome.chunks.len(), 1);
    assert_eq!(fs::read(work_dir.path().join("tone-001.wav"))?.len(), 44 + 2_000);

    work_dir.close()?;
    Ok(())
}

#[test]
fn plan_chunks_lists_outputs_without_writing() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    write_test_tone(work_dir.path().join("input.wav"), 8_000, 1, 8_000)?;

    let config = Config::builder("input.wav", "input", 6_000)
        .root(work_dir.path())
        .build()?;
    let planned = plan_chunks(&config)?;

    let root = fs::canonicalize(work_dir.path())?;
    assert_eq!(
        planned,
        [
            root.join("input-001.wav"),
            root.join("input-002.wav"),
            root.join("input-003.wav"),
        ]
    );
    assert_eq!(fs::read_dir(work_dir.path())?.count(), 1);

    work_dir.close()?;
    Ok(())
}

#[test]
fn run_with_progress_reports_each_chunk() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    write_test_tone(work_dir.path().join("input.wav"), 8_000, 1, 8_000)?;

    let config = Config::builder("input.wav", "input", 6_000)
        .root(work_dir.path())
        .build()?;
    let mut advanced = Vec::new();
    let mut finished = false;
    run_with_progress(config, |event| match event {
        ProgressEvent::Start { total_chunks, .. } => assert_eq!(total_chunks, 3),
        ProgressEvent::Advance { chunk, .. } => advanced.push(chunk.output_id),
        ProgressEvent::Finish => finished = true,
    })?;

    assert_eq!(advanced, ["input-001.wav", "input-002.wav", "input-003.wav"]);
    assert!(finished);

    work_dir.close()?;
    Ok(())
}

#[test]
fn split_source_works_on_in_memory_handles() -> Result<(), Box<dyn Error>> {
    let mut sink = MemorySink::new();
    let outcome = split_source(
        Cursor::new(tone_bytes(8_000, 1, 8_000, 8_000)),
        "mem",
        6_000,
        &mut sink,
    )?;

    assert_eq!(outcome.chunks.len(), 3);
    assert_eq!(sink.chunks().len(), 3);
    let last = sink.get("mem-003.wav").expect("third chunk");
    assert_eq!(data_chunk(last).len(), 4_000);
    Ok(())
}

#[test]
fn truncated_source_keeps_frames_that_arrived() -> Result<(), Box<dyn Error>> {
    // The header claims 8000 frames but only 5000 are present.
    let source = tone_bytes(8_000, 1, 5_000, 8_000);
    let mut sink = MemorySink::new();
    let outcome = split_source(Cursor::new(source.clone()), "cut", 6_000, &mut sink)?;

    assert!(outcome.truncated);
    let sizes: Vec<_> = outcome.chunks.iter().map(|c| c.byte_size).collect();
    assert_eq!(sizes, [6_000, 4_000]);
    assert_eq!(outcome.chunks[1].frames, 2_000);
    assert_eq!(outcome.chunks[1].duration_ms, 250);

    let last = sink.get("cut-002.wav").expect("second chunk");
    let declared = u32::from_le_bytes([last[40], last[41], last[42], last[43]]);
    assert_eq!(declared / 2, 2_000);
    assert_eq!(data_chunk(last), &source[44 + 6_000..44 + 10_000]);
    Ok(())
}

#[test]
fn oversized_budget_on_small_source_yields_one_chunk() -> Result<(), Box<dyn Error>> {
    let source = tone_bytes(8_000, 1, 100, 100);
    let mut sink = MemorySink::new();
    let outcome = split_source(
        Cursor::new(source.clone()),
        "big",
        3 * 1024 * 1024 * 1024,
        &mut sink,
    )?;

    assert_eq!(outcome.chunks.len(), 1);
    assert_eq!(outcome.chunks[0].byte_size, 200);
    assert_eq!(outcome.chunks[0].duration_ms, 12);
    let only = sink.get("big-001.wav").expect("single chunk");
    assert_eq!(data_chunk(only), data_chunk(&source));
    Ok(())
}
