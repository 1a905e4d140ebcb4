mod cli;

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context};
use indicatif::{HumanDuration, ProgressBar, ProgressDrawTarget, ProgressStyle};
use wavsplit_core::report::{self, SplitRequest};
use wavsplit_core::{plan_chunks, run, run_with_progress, ChunkResult, Config, ProgressEvent};

use crate::cli::build_cli;

struct Options<'a> {
    root: &'a Path,
    overwrite: bool,
    create_dirs: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = build_cli().get_matches();

    let options = Options {
        root: matches
            .get_one::<PathBuf>("root")
            .expect("defaulted argument"),
        overwrite: matches.get_flag("overwrite"),
        create_dirs: matches.get_flag("create-dirs"),
    };

    if matches.get_flag("request") {
        return answer_request(&options);
    }

    let input_path = matches
        .get_one::<PathBuf>("file_path")
        .expect("required argument");
    if !options.root.join(input_path).is_file() {
        return Err(anyhow!(
            "input file does not exist: {}",
            input_path.display()
        ));
    }

    let chunk_size = *matches.get_one::<u64>("size").expect("required argument");
    let prefix = matches
        .get_one::<String>("prefix")
        .cloned()
        .unwrap_or_else(|| input_path.with_extension("").to_string_lossy().into_owned());
    let json = matches
        .get_one::<String>("format")
        .is_some_and(|format| format == "json");

    let config = Config::builder(input_path, prefix, chunk_size)
        .root(options.root)
        .overwrite(options.overwrite)
        .create_dirs(options.create_dirs)
        .build()
        .with_context(|| {
            format!(
                "failed to create configuration for '{}'",
                input_path.display()
            )
        })?;

    if matches.get_flag("dry-run") {
        let plan = plan_chunks(&config)
            .with_context(|| format!("failed to plan chunks for '{}'", input_path.display()))?;

        if plan.is_empty() {
            println!("Dry run: no chunks would be generated.");
        } else {
            println!("Dry run: would generate {} chunk(s):", plan.len());
            for path in plan {
                println!("  {}", path.display());
            }
        }

        return Ok(());
    }

    let progress = ProgressBar::new(0);
    progress.set_draw_target(ProgressDrawTarget::stderr());
    let bar_style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());

    let progress_handle = progress.clone();
    let mut total_label = String::new();
    let result = run_with_progress(config, move |event| match event {
        ProgressEvent::Start {
            total_chunks,
            total_duration,
        } => {
            total_label = format!("{}", HumanDuration(total_duration));
            progress_handle.set_style(bar_style.clone());
            progress_handle.set_length(total_chunks);
            progress_handle.enable_steady_tick(Duration::from_millis(100));
            progress_handle.set_message(format!("0s / {total_label}"));
        }
        ProgressEvent::Advance { chunk, processed } => {
            progress_handle.inc(1);
            progress_handle.set_message(format!(
                "{} / {total_label} ({})",
                HumanDuration(processed),
                chunk.output_id
            ));
        }
        ProgressEvent::Finish => {
            progress_handle.set_message(String::from("Completed"));
        }
    })
    .with_context(|| format!("failed to split '{}'", input_path.display()));

    progress.finish_and_clear();

    let outcome = result?;
    if outcome.truncated {
        eprintln!(
            "warning: '{}' ended before the frame count its header declares; the last chunk is short",
            input_path.display()
        );
    }

    if json {
        print_json(&outcome.chunks)
    } else {
        print!("{}", report::render_text(&outcome.chunks));
        Ok(())
    }
}

/// Handle a JSON request on stdin, the way the split function is invoked remotely.
fn answer_request(options: &Options<'_>) -> anyhow::Result<()> {
    let body = io::read_to_string(io::stdin()).context("failed to read request from stdin")?;
    let request = SplitRequest::from_json(&body).context("invalid split request")?;

    let config = Config::builder(
        &request.input_path,
        request.output_prefix.as_str(),
        request.split_size_bytes,
    )
    .root(options.root)
    .overwrite(options.overwrite)
    .create_dirs(options.create_dirs)
    .build()
    .with_context(|| {
        format!(
            "failed to create configuration for '{}'",
            request.input_path
        )
    })?;

    let outcome =
        run(config).with_context(|| format!("failed to split '{}'", request.input_path))?;

    print_json(&outcome.chunks)
}

fn print_json(chunks: &[ChunkResult]) -> anyhow::Result<()> {
    let json = report::to_json(chunks).context("failed to serialise report")?;
    println!("{json}");
    Ok(())
}
