mod decode;
mod detector;
mod evaluate;
mod generate;
mod harmonics;
mod logging;
mod noise;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dtmflab_detect::Detector;
use dtmflab_synth::ToneParams;
use tracing::info;

use detector::DetectorArgs;
use noise::NoiseMode;

#[derive(Parser, Debug)]
#[command(name = "dtmflab", version, about = "DTMF test-signal generator and decoder")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Synthesise a key or key sequence to a WAV file.
    Generate {
        /// Keys to encode: 0-9, A-D, * and #.
        keys: String,
        #[arg(short, long, default_value = "dtmf.wav")]
        output: PathBuf,
        /// Tone length per key in milliseconds.
        #[arg(short, long, default_value_t = 200)]
        duration_ms: u32,
        /// Silence between keys in milliseconds.
        #[arg(short, long, default_value_t = 50)]
        gap_ms: u32,
        #[arg(short = 'r', long, default_value_t = 8000)]
        sample_rate: u32,
        /// Peak level, 0.0 to 1.0 of full scale.
        #[arg(short, long, default_value_t = 0.8)]
        amplitude: f64,
    },
    /// Decode the digits in a WAV file.
    Decode {
        input: PathBuf,
        #[command(flatten)]
        detector: DetectorArgs,
        /// Write per-block classifier features to this CSV file.
        #[arg(long)]
        features: Option<PathBuf>,
    },
    /// Write a silent WAV file.
    Silence {
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        duration_ms: u32,
        #[arg(long, default_value_t = 8000)]
        sample_rate: u32,
    },
    /// Add white noise at a target SNR.
    MixNoise {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        snr_db: f64,
        #[arg(long, value_enum, default_value_t = NoiseMode::White)]
        mode: NoiseMode,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Overlay a few short noise bursts at a target SNR.
    BurstyNoise {
        #[arg(long)]
        base: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        snr_db: f64,
        /// Use Gaussian bursts.
        #[arg(long, value_enum, conflicts_with = "noise_wav", required_unless_present = "noise_wav")]
        noise: Option<NoiseMode>,
        /// Use a noise recording for the bursts.
        #[arg(long)]
        noise_wav: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Join WAV files that share a sample rate.
    Concat {
        #[arg(short, long)]
        output: PathBuf,
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Decode every WAV under a directory and score it against its file name.
    Evaluate {
        root: PathBuf,
        #[arg(long, default_value = "report.csv")]
        report: PathBuf,
        #[command(flatten)]
        detector: DetectorArgs,
    },
    /// Summarise second-harmonic ratios from `decode --features` dumps.
    AnalyseHarmonics {
        /// Directory holding the feature CSV files.
        dir: PathBuf,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Generate {
            keys,
            output,
            duration_ms,
            gap_ms,
            sample_rate,
            amplitude,
        } => {
            let params = ToneParams {
                sample_rate_hz: sample_rate,
                duration_ms,
                amplitude,
            };
            generate::generate(&keys, &params, gap_ms, &output)?;
        }
        Command::Decode {
            input,
            detector,
            features,
        } => {
            let detector = build_detector(&detector)?;
            decode::run(&detector, &input, features.as_deref())?;
        }
        Command::Silence {
            output,
            duration_ms,
            sample_rate,
        } => generate::write_silence(sample_rate, duration_ms, &output)?,
        Command::MixNoise {
            input,
            output,
            snr_db,
            mode,
            seed,
        } => noise::mix(&input, &output, snr_db, mode, seed)?,
        Command::BurstyNoise {
            base,
            out,
            snr_db,
            noise: _,
            noise_wav,
            seed,
        } => noise::bursty(&base, &out, snr_db, noise_wav.as_deref(), seed)?,
        Command::Concat { output, inputs } => generate::concat(&inputs, &output)?,
        Command::Evaluate {
            root,
            report,
            detector,
        } => {
            let detector = build_detector(&detector)?;
            if evaluate::run(&detector, &root, &report)? {
                return Ok(ExitCode::from(2));
            }
        }
        Command::AnalyseHarmonics { dir } => harmonics::run(&dir)?,
    }

    Ok(ExitCode::SUCCESS)
}

fn build_detector(args: &DetectorArgs) -> anyhow::Result<Detector> {
    let config = args.load()?;
    info!(
        sample_rate = config.sample_rate_hz,
        block_len = config.block_len,
        block_ms = config.block_ms(),
        "detector ready"
    );
    Ok(Detector::new(&config)?)
}
