use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use pulse_lib::{
    config::AnalysisConfig,
    io::{ekg as ekg_io, text as text_io, workout as workout_io},
    metrics::{
        heart_rate::{heart_rate_profile, HeartRateProfile},
        irregularity::{detect_irregularities, IrregularityReport},
    },
    plot::{
        figure_from_instantaneous_hr, figure_from_session, Figure, PlotBackend, Series,
        DEFAULT_MAX_POINTS,
    },
    session::{EkgSession, SessionConfig},
    signal::{RRSeries, Signal},
    synth,
    workout::{
        performance::performance_analysis,
        summary::{workout_summary, Sport},
        zones::DEFAULT_CADENCE_HZ,
    },
};
use plotters::prelude::*;
use serde::Serialize;
use std::{
    fs::File,
    io::{self, BufWriter, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(name = "pulse", version, about = "pulse: EKG and workout analysis tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SportArg {
    Cycling,
    Running,
    Swimming,
    Other,
}

impl From<SportArg> for Sport {
    fn from(arg: SportArg) -> Self {
        match arg {
            SportArg::Cycling => Sport::Cycling,
            SportArg::Running => Sport::Running,
            SportArg::Swimming => Sport::Swimming,
            SportArg::Other => Sport::Other,
        }
    }
}

/// Options shared by every command that analyses an EKG recording.
#[derive(Args)]
struct EkgInput {
    /// Recording: headerless amplitude/time table, or a named-column upload with --upload
    #[arg(long)]
    input: PathBuf,
    /// Parse the input as an upload with 'Messwerte in mV' and 'Zeit in ms' headers
    #[arg(long)]
    upload: bool,
    /// TOML file with [ekg] and [subject] sections
    #[arg(long)]
    config: Option<PathBuf>,
    /// Maximum plausible heart rate in bpm; sets the refractory distance between peaks
    #[arg(long)]
    max_hr: Option<f64>,
    /// Minimum peak amplitude in mV (default: 90th percentile of the trace)
    #[arg(long)]
    height: Option<f64>,
    /// Relative RR deviation above which a beat is flagged irregular
    #[arg(long)]
    tolerance: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect heartbeat peaks and print their indices and timestamps
    EkgPeaks {
        #[command(flatten)]
        ekg: EkgInput,
    },
    /// Full EKG report: sampling rate, peaks, heart rate, variability and irregularities
    EkgReport {
        #[command(flatten)]
        ekg: EkgInput,
    },
    /// Render the trace with peak markers (and optionally heart rate) via plotters
    EkgPlot {
        #[command(flatten)]
        ekg: EkgInput,
        /// PNG output for the trace
        #[arg(long)]
        out: Option<PathBuf>,
        /// PNG output for heart rate over time
        #[arg(long)]
        hr_out: Option<PathBuf>,
        /// Write the trace figure as JSON
        #[arg(long)]
        figure_json: Option<PathBuf>,
        /// Only plot the first milliseconds of the recording
        #[arg(long)]
        window_ms: Option<f64>,
    },
    /// Generate a synthetic EKG table from newline-delimited RR intervals (seconds)
    EkgSimulate {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long, default_value_t = 500.0)]
        fs: f64,
        #[arg(long, default_value_t = 0.0)]
        jitter_ms: f64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Heart-rate metrics and irregularity flags from newline-delimited RR intervals (seconds)
    RrMetrics {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long, default_value_t = 0.10)]
        tolerance: f64,
    },
    /// Heart-rate zones, calories and VO2max from a workout CSV export
    WorkoutZones {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Overrides both the config and the observed maximum
        #[arg(long)]
        max_hr: Option<f64>,
        #[arg(long)]
        weight_kg: Option<f64>,
        #[arg(long)]
        age: Option<f64>,
        #[arg(long, default_value_t = DEFAULT_CADENCE_HZ)]
        cadence_hz: f64,
    },
    /// Sport-specific workout overview (distance, speed or pace, elevation)
    WorkoutSummary {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "cycling")]
        sport: SportArg,
    },
}

#[derive(Serialize)]
struct PeaksOutput {
    sampling_rate_hz: Option<f64>,
    indices: Vec<usize>,
    times_ms: Vec<f64>,
}

#[derive(Serialize)]
struct RrOutput {
    rr: RRSeries,
    heart_rate: HeartRateProfile,
    irregularities: IrregularityReport,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::EkgPeaks { ekg } => cmd_ekg_peaks(&ekg)?,
        Commands::EkgReport { ekg } => cmd_ekg_report(&ekg)?,
        Commands::EkgPlot {
            ekg,
            out,
            hr_out,
            figure_json,
            window_ms,
        } => cmd_ekg_plot(
            &ekg,
            out.as_deref(),
            hr_out.as_deref(),
            figure_json.as_deref(),
            window_ms,
        )?,
        Commands::EkgSimulate {
            input,
            fs,
            jitter_ms,
            seed,
            out,
        } => cmd_ekg_simulate(input.as_deref(), fs, jitter_ms, seed, out.as_deref())?,
        Commands::RrMetrics { input, tolerance } => cmd_rr_metrics(input.as_deref(), tolerance)?,
        Commands::WorkoutZones {
            input,
            config,
            max_hr,
            weight_kg,
            age,
            cadence_hz,
        } => cmd_workout_zones(&input, config.as_deref(), max_hr, weight_kg, age, cadence_hz)?,
        Commands::WorkoutSummary { input, sport } => cmd_workout_summary(&input, sport)?,
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(AnalysisConfig::default()),
    }
}

fn load_session(args: &EkgInput) -> Result<EkgSession> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(max_hr) = args.max_hr {
        config.ekg.max_plausible_hr = max_hr;
    }
    if let Some(height) = args.height {
        config.ekg.amplitude_height = Some(height);
    }
    if let Some(tolerance) = args.tolerance {
        config.ekg.irregularity_tolerance = tolerance;
    }
    let session_config: SessionConfig = config.ekg.session_config()?;

    let signal: Signal = if args.upload {
        ekg_io::read_ekg_upload(&args.input)
    } else {
        ekg_io::read_ekg_file(&args.input)
    }
    .with_context(|| format!("reading {}", args.input.display()))?;
    info!(
        "loaded {} samples from {}",
        signal.len(),
        args.input.display()
    );
    Ok(EkgSession::new(signal, session_config))
}

fn read_samples(input: Option<&Path>) -> Result<Vec<f64>> {
    match input {
        Some(path) => text_io::read_rr_seconds(path)
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(text_io::parse_rr_seconds(&buf)?)
        }
    }
}

fn cmd_ekg_peaks(args: &EkgInput) -> Result<()> {
    let mut session = load_session(args)?;
    let indices = session.ensure_peaks().indices.clone();
    let out = PeaksOutput {
        sampling_rate_hz: session.sampling_rate_hz(),
        times_ms: session.peak_times_ms(),
        indices,
    };
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

fn cmd_ekg_report(args: &EkgInput) -> Result<()> {
    let mut session = load_session(args)?;
    let report = session.report();
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

fn cmd_ekg_plot(
    args: &EkgInput,
    out: Option<&Path>,
    hr_out: Option<&Path>,
    figure_json: Option<&Path>,
    window_ms: Option<f64>,
) -> Result<()> {
    if out.is_none() && hr_out.is_none() && figure_json.is_none() {
        bail!("nothing to write: pass --out, --hr-out or --figure-json");
    }
    let mut session = load_session(args)?;
    let fig = figure_from_session(&mut session, window_ms, DEFAULT_MAX_POINTS);
    if let Some(path) = figure_json {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer(BufWriter::new(file), &fig)?;
    }
    if let Some(path) = out {
        PngBackend::new(path).draw(&fig)?;
    }
    if let Some(path) = hr_out {
        let hr_fig = figure_from_instantaneous_hr(&session.instantaneous_hr());
        PngBackend::new(path).draw(&hr_fig)?;
    }
    Ok(())
}

fn cmd_ekg_simulate(
    input: Option<&Path>,
    fs: f64,
    jitter_ms: f64,
    seed: u64,
    out: Option<&Path>,
) -> Result<()> {
    if !(fs > 0.0) {
        bail!("sampling rate must be positive, got {fs}");
    }
    let rr = read_samples(input)?;
    let signal = synth::synthetic_ekg_jittered(fs, &rr, jitter_ms, seed);
    info!("simulated {} samples for {} beats", signal.len(), rr.len() + 1);
    match out {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("creating {}", path.display()))?;
            ekg_io::write_ekg_table(&signal, BufWriter::new(file))?;
        }
        None => ekg_io::write_ekg_table(&signal, io::stdout().lock())?,
    }
    Ok(())
}

fn cmd_rr_metrics(input: Option<&Path>, tolerance: f64) -> Result<()> {
    let rr = RRSeries {
        rr: read_samples(input)?,
    };
    let mut peak_times_ms = Vec::with_capacity(rr.len() + 1);
    let mut t = 0.0;
    peak_times_ms.push(t);
    for interval in rr.to_millis() {
        t += interval;
        peak_times_ms.push(t);
    }
    let out = RrOutput {
        heart_rate: heart_rate_profile(&peak_times_ms),
        irregularities: detect_irregularities(&rr, tolerance),
        rr,
    };
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

fn cmd_workout_zones(
    input: &Path,
    config: Option<&Path>,
    max_hr: Option<f64>,
    weight_kg: Option<f64>,
    age: Option<f64>,
    cadence_hz: f64,
) -> Result<()> {
    let mut subject = load_config(config)?.subject;
    if max_hr.is_some() {
        subject.max_hr = max_hr;
    }
    if let Some(weight) = weight_kg {
        subject.weight_kg = weight;
    }
    if let Some(age) = age {
        subject.age = age;
    }
    subject.validate()?;
    let record = workout_io::read_workout_csv(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let summary = performance_analysis(&record, &subject, cadence_hz);
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn cmd_workout_summary(input: &Path, sport: SportArg) -> Result<()> {
    let record = workout_io::read_workout_csv(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let summary = workout_summary(&record, sport.into());
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

/// Renders figures to PNG files through plotters' bitmap backend.
struct PngBackend<'a> {
    path: &'a Path,
    size: (u32, u32),
}

impl<'a> PngBackend<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            size: (1000, 480),
        }
    }
}

impl PlotBackend for PngBackend<'_> {
    fn draw(&mut self, fig: &Figure) -> Result<()> {
        let Some((x_min, x_max, y_min, y_max)) = fig.bounds() else {
            bail!("figure has no points to draw");
        };
        let (x_min, x_max) = padded(x_min, x_max);
        let (y_min, y_max) = padded(y_min, y_max);

        let backend = BitMapBackend::new(self.path, self.size);
        let root = backend.into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(
                fig.title.clone().unwrap_or_else(|| "Plot".into()),
                ("sans-serif", 24),
            )
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
        chart
            .configure_mesh()
            .x_desc(fig.x.label.clone().unwrap_or_default())
            .y_desc(fig.y.label.clone().unwrap_or_default())
            .draw()?;
        for series in &fig.series {
            match series {
                Series::Line(line) => {
                    let (r, g, b) = line.style.color.rgb();
                    chart.draw_series(LineSeries::new(
                        line.points.iter().map(|p| (p[0], p[1])),
                        RGBColor(r, g, b).stroke_width(line.style.width.round().max(1.0) as u32),
                    ))?;
                }
                Series::Markers(markers) => {
                    let (r, g, b) = markers.color.rgb();
                    let color = RGBColor(r, g, b);
                    chart.draw_series(markers.points.iter().map(|p| {
                        Circle::new((p[0], p[1]), markers.radius, color.filled())
                    }))?;
                }
            }
        }
        root.present()?;
        Ok(())
    }
}

fn padded(min: f64, max: f64) -> (f64, f64) {
    if max > min {
        (min, max)
    } else {
        (min - 1.0, max + 1.0)
    }
}
