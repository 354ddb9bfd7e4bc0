//! Object projector: replays clouds, transforms and detection batches and prints poses.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use object_projector::{
    config::Config,
    debug::LogDebugSink,
    detection::DetectionBatch,
    geometry::RigidTransform,
    localizer::LocalizationStrategy,
    point_cloud::PointCloudFrame,
    pose::ObjectPose,
    projector::{PoseSink, Projector},
    transform::{TransformBuffer, TransformProvider},
};
use parking_lot::Mutex;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Newline-delimited JSON event file (stdin if omitted)
    #[arg(short, long)]
    input: Option<String>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Anchor strategy override (mean, midpoint)
    #[arg(short, long)]
    strategy: Option<String>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

/// One line of the replay stream
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Event {
    Transform {
        parent: String,
        child: String,
        transform: RigidTransform,
    },
    Cloud(PointCloudFrame),
    Detections(DetectionBatch),
}

/// Writes each pose as one JSON line
struct JsonLinesSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> PoseSink for JsonLinesSink<W> {
    fn publish(&self, pose: &ObjectPose) -> object_projector::Result<()> {
        let mut out = self.out.lock();
        serde_json::to_writer(&mut *out, pose)?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {path}");
            Config::from_file(path).with_context(|| format!("Failed to load config file {path}"))?
        }
        None => Config::default(),
    };

    if let Some(strategy) = &args.strategy {
        config.localization.strategy = strategy.parse::<LocalizationStrategy>()?;
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    let config = load_config(&args)?;

    if args.print_config {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    info!("Object Projector");
    info!(
        "Streams: clouds '{}', detections '{}', poses '{}'",
        config.topics.pointcloud, config.topics.detections, config.topics.objects
    );

    let transforms = Arc::new(TransformBuffer::new());
    for st in &config.transforms.static_transforms {
        transforms.set_transform(st.parent.clone(), st.child.clone(), st.transform);
    }

    let debug_sink = LogDebugSink::from_topics(&config.topics);
    let sink = Arc::new(JsonLinesSink {
        out: Mutex::new(io::stdout()),
    });
    let provider: Arc<dyn TransformProvider> = transforms.clone();
    let projector = Projector::new(config, provider, sink)?.with_debug_sink(Arc::new(debug_sink));

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => {
            info!("Replaying events from: {path}");
            Box::new(BufReader::new(File::open(path).with_context(|| format!("Failed to open {path}"))?))
        }
        None => {
            info!("Replaying events from stdin");
            Box::new(io::stdin().lock())
        }
    };

    let (mut batches, mut poses) = (0usize, 0usize);
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let event: Event = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!("Skipping malformed event on line {}: {e}", number + 1);
                continue;
            }
        };

        match event {
            Event::Transform { parent, child, transform } => transforms.set_transform(parent, child, transform),
            Event::Cloud(frame) => {
                if let Err(e) = projector.on_cloud(frame) {
                    warn!("Cloud on line {} not buffered: {e}", number + 1);
                }
            }
            Event::Detections(batch) => match projector.on_detections(&batch) {
                Ok(report) => {
                    batches += 1;
                    poses += report.poses.len();
                }
                Err(e) => warn!("Batch on line {} skipped: {e}", number + 1),
            },
        }
    }

    info!("Replay finished: {poses} poses from {batches} batches");
    Ok(())
}
