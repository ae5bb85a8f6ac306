mod batch;


use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::{Cli, Selection};
use crate::config::Config;
use crate::media::{FfmpegMerger, MediaMerger, YtDlpFetcher, resolve_tool_bin};
use crate::paths::SessionPaths;
use crate::recording::{Policy, Recorder, repair_all, scan_output_dir};
use crate::session::{BrowserSession, LaunchOptions};

const BANNER_WIDTH: usize = 60;

pub(crate) fn run(cli: &Cli, selection: Selection) -> Result<()> {
    println!("{}", "=".repeat(BANNER_WIDTH));
    println!("Bootcamp Recording Downloader");
    println!("{}", "=".repeat(BANNER_WIDTH));

    let config = Config::load();
    println!("\n[0/4] Checking dependencies...");
    let merger = FfmpegMerger::new(resolve_tool_bin(config.ffmpeg_bin.clone(), "ffmpeg"));
    let merger_ready = match merger.probe() {
        Ok(version) => {
            println!("  Found: {}", truncate(&version, BANNER_WIDTH));
            true
        }
        Err(err) => {
            println!("  WARNING: ffmpeg not available ({err})");
            false
        }
    };

    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    match selection {
        Selection::Repair => {
            if !merger_ready {
                bail!("ffmpeg is required for --merge; install it and try again");
            }
            run_repair(&config.output_dir, &merger)
        }
        Selection::Range { .. } => {
            if !merger_ready && !cli.allow_split {
                bail!(
                    "ffmpeg is required to merge split recordings; install it or pass --allow-split"
                );
            }
            let merger = merger_ready.then_some(&merger as &dyn MediaMerger);
            run_download(cli, &selection, &config, merger)
        }
    }
}

fn run_repair(output_dir: &Path, merger: &dyn MediaMerger) -> Result<()> {
    println!("\nMerging split files in {}...", output_dir.display());
    let report = repair_all(output_dir, merger)
        .with_context(|| format!("failed to scan {}", output_dir.display()))?;

    let mut merged = 0;
    for (index, outcome) in &report {
        println!("  Recording {}: {}", index.get(), outcome.describe(*index));
        if outcome.is_success() {
            merged += 1;
        }
    }
    if merged > 0 {
        println!("\nSuccessfully merged {merged} recording(s)");
    } else {
        println!("\nNo files needed merging");
    }
    Ok(())
}

fn run_download(
    cli: &Cli,
    selection: &Selection,
    config: &Config,
    merger: Option<&dyn MediaMerger>,
) -> Result<()> {
    let Selection::Range { start, end } = *selection else {
        return Ok(());
    };
    let credentials = config.credentials()?;
    let paths = SessionPaths::resolve(config.state_dir.as_deref())?;
    info!(state_dir = %paths.browser_profile.display(), "using session state");

    println!("\nLaunching browser...");
    let mut session = BrowserSession::launch(&LaunchOptions {
        headless: cli.headless,
        profile_dir: paths.browser_profile.clone(),
        base_url: config.base_url.clone(),
    })?;
    let cookies = match session.sign_in(&credentials, &paths) {
        Ok(cookies) => cookies,
        Err(err) => {
            session.shutdown();
            return Err(err);
        }
    };

    let fetcher = YtDlpFetcher::new(resolve_tool_bin(config.ytdlp_bin.clone(), "yt-dlp"));
    println!(
        "\n[3/4] Downloading recordings {} to {}...",
        start.get(),
        end.get()
    );

    let policy = Policy {
        force: cli.force,
        allow_split: cli.allow_split,
    };
    let summary = {
        let mut recorder = Recorder::new(
            &config.output_dir,
            &mut session,
            &fetcher,
            merger,
            &cookies,
            policy,
        );
        batch::drive(&mut recorder, selection.indices(), selection.recording_count())
    };
    session.shutdown();

    println!("\n{}", "=".repeat(BANNER_WIDTH));
    println!("[4/4] Download Summary");
    println!("{}", "=".repeat(BANNER_WIDTH));
    print!("{}", summary.render());
    println!("\nVideos saved to: {}", display_dir(&config.output_dir));

    let leftovers = split_leftovers(&config.output_dir);
    if !leftovers.is_empty() {
        println!(
            "\nSplit audio/video files remain for recordings {leftovers:?}; run with --merge to combine them"
        );
    }
    Ok(())
}

/// Indices that still have raw split streams on disk.
pub(crate) fn split_leftovers(output_dir: &Path) -> Vec<u32> {
    match scan_output_dir(output_dir) {
        Ok(found) => found
            .into_iter()
            .filter(|(_, artifacts)| artifacts.has_split_files())
            .map(|(index, _)| index.get())
            .collect(),
        Err(err) => {
            warn!(error = %err, "failed to rescan output directory");
            Vec::new()
        }
    }
}

fn display_dir(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    let mut out = s.to_string();
    if out.chars().count() > max {
        out = out.chars().take(max.saturating_sub(3)).collect::<String>() + "...";
    }
    out
}
