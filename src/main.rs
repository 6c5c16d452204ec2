// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use duration_string::DurationString;
use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sektor::params::parse_assignment;
use sektor::samples::{decode_file, LoadStatus};
use sektor::{sample_exchange, EngineConfig, GranularEngine, NoteEvent, ParamKey, SampleLoader};

/// How long to wait for the loader before giving up.
const LOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A polyphonic granular sampler."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plays notes through the engine offline and writes the result to a WAV file.
    Render {
        /// The sample to play grains from.
        sample: PathBuf,
        /// The stereo WAV file to write.
        output: PathBuf,
        /// Engine configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Comma separated MIDI notes to hold, started together.
        #[arg(short, long, value_delimiter = ',', default_value = "60")]
        notes: Vec<u8>,
        /// How long to hold the notes.
        #[arg(long, default_value = "1s")]
        hold: String,
        /// How long to keep rendering after the notes are released.
        #[arg(long, default_value = "250ms")]
        tail: String,
        /// Frames per processed block.
        #[arg(long, default_value_t = 512)]
        block_size: usize,
        /// Parameter overrides, e.g. --set DENSITY=20.
        #[arg(long = "set")]
        set: Vec<String>,
    },
    /// Decodes a sample and prints its properties.
    Info {
        /// The sample to inspect.
        sample: PathBuf,
    },
    /// Lists the engine parameters.
    Params {},
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            sample,
            output,
            config,
            notes,
            hold,
            tail,
            block_size,
            set,
        } => {
            let config = match config {
                Some(path) => EngineConfig::load(&path)?,
                None => EngineConfig::default(),
            };
            let hold: Duration = DurationString::from_string(hold)?.into();
            let tail: Duration = DurationString::from_string(tail)?.into();
            render(
                &config,
                &sample,
                &output,
                &notes,
                (hold, tail),
                block_size.max(1),
                &set,
            )?;
        }
        Commands::Info { sample } => {
            let buffer = decode_file(&sample)?;
            println!("{}:", sample.display());
            println!("- channels: {}", buffer.channel_count());
            println!("- frames: {}", buffer.frame_count());
            println!("- sample rate: {}", buffer.sample_rate());
            println!("- duration: {:.3}s", buffer.duration().as_secs_f64());
        }
        Commands::Params {} => {
            println!("Parameters:");
            for key in ParamKey::ALL {
                let (min, max) = key.range();
                println!(
                    "- {} ({}): {} to {}, default {}",
                    key.id(),
                    key.unit(),
                    min,
                    max,
                    key.default_value()
                );
            }
        }
    }

    Ok(())
}

fn render(
    config: &EngineConfig,
    sample: &Path,
    output: &Path,
    notes: &[u8],
    (hold, tail): (Duration, Duration),
    block_size: usize,
    overrides: &[String],
) -> Result<(), Box<dyn Error>> {
    let params = Arc::new(config.build_params()?);
    for assignment in overrides {
        let (key, value) = parse_assignment(assignment)?;
        let stored = params.set(key, value);
        info!(param = %key, value = stored, "Parameter override");
    }

    let (publisher, reader) = sample_exchange();
    let mut engine = GranularEngine::new(config, reader, params);
    let mut loader = SampleLoader::spawn(publisher, config.sample_rate())?;

    loader.request_load(sample)?;
    match loader.wait_for_status(LOAD_TIMEOUT) {
        Some(LoadStatus::Loaded(info)) => info!(
            frames = info.frames,
            duration_ms = info.duration().as_millis(),
            "Sample ready"
        ),
        Some(LoadStatus::Failed { path, reason }) => {
            return Err(format!("unable to load {}: {}", path.display(), reason).into())
        }
        None => return Err("timed out waiting for the sample to load".into()),
    }

    let sample_rate = config.sample_rate();
    let hold_frames = (hold.as_secs_f64() * sample_rate as f64).round() as usize;
    let total_frames = hold_frames + (tail.as_secs_f64() * sample_rate as f64).round() as usize;

    let mut writer = WavWriter::create(
        output,
        WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    )?;

    let note_ons: Vec<NoteEvent> = notes.iter().map(|n| NoteEvent::note_on(*n, 1.0)).collect();
    let note_offs: Vec<NoteEvent> = notes.iter().map(|n| NoteEvent::note_off(*n)).collect();

    let mut left = vec![0.0; block_size];
    let mut right = vec![0.0; block_size];
    let mut events = Vec::with_capacity(notes.len() * 2);
    let mut rendered = 0;
    let mut released = false;
    while rendered < total_frames {
        events.clear();
        if rendered == 0 {
            events.extend_from_slice(&note_ons);
        }
        if !released && rendered >= hold_frames {
            events.extend_from_slice(&note_offs);
            released = true;
        }

        // Blocks are split so the release lands on the exact frame.
        let until = if released { total_frames } else { hold_frames };
        let frames = block_size.min(until - rendered);

        engine.process_block(&events, &mut left[..frames], &mut right[..frames]);
        for (l, r) in left[..frames].iter().zip(&right[..frames]) {
            writer.write_sample(*l)?;
            writer.write_sample(*r)?;
        }
        rendered += frames;
    }
    writer.finalize()?;

    info!(
        output = ?output,
        frames = total_frames,
        notes = ?notes,
        "Render complete"
    );
    loader.shutdown();

    Ok(())
}
