use std::env;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use idmatch::batch::{self, BatchOptions};
use idmatch::report::{self, SubjectRecord, Summary};
use idmatch::{config, images, pairing, Deadline, FaceMatcher, RestMatchClient, Threshold};
use log::{info, warn};

#[derive(Parser)]
#[command(name = "idmatch")]
#[command(
    version,
    about = "Match identity document photos against live selfies via a face-comparison service"
)]
struct Cli {
    /// Config file (defaults to the system-wide path)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match every subject directory under the data root
    Run {
        /// Directory with one sub-directory per subject
        #[arg(short, long)]
        data_root: Option<PathBuf>,
        /// JSON Lines output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Subjects processed concurrently
        #[arg(short, long)]
        concurrency: Option<usize>,
    },
    /// Compare one document image with one live image
    Match {
        document: PathBuf,
        live: PathBuf,
        /// Similarity threshold in [0, 1]
        #[arg(short, long)]
        threshold: Option<f32>,
    },
    /// Show which images would be paired in a subject directory
    Pair { dir: PathBuf },
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Run {
            data_root,
            output,
            concurrency,
        } => {
            let mut cfg = config::load_config(config_path)?;
            if let Some(root) = data_root {
                cfg.data_root = root;
            }
            if let Some(out) = output {
                cfg.output = Some(out);
            }
            if let Some(n) = concurrency {
                cfg.concurrency = n;
            }
            cfg.validate()?;
            run(&cfg)
        }
        Commands::Match {
            document,
            live,
            threshold,
        } => {
            let mut cfg = config::load_config(config_path)?;
            if let Some(t) = threshold {
                cfg.threshold = t;
            }
            cfg.validate()?;
            match_one(&cfg, &document, &live)
        }
        Commands::Pair { dir } => pair(&dir),
        Commands::Config => open_config(config_path),
    }
}

fn client(cfg: &config::Config) -> Result<RestMatchClient> {
    let client = RestMatchClient::new(cfg.client.clone())
        .context("Failed to initialize match client")?
        .with_policy(cfg.policy);
    Ok(client)
}

fn run(cfg: &config::Config) -> Result<()> {
    info!("Match service: {}", cfg.client.match_url());
    info!(
        "Threshold {:.2}, {} attempt(s) per subject, worst case {:?} per subject",
        cfg.threshold,
        cfg.client.max_attempts,
        cfg.client.worst_case_duration()
    );

    let client = client(cfg)?;
    let opts = BatchOptions {
        threshold: cfg.threshold()?,
        concurrency: cfg.concurrency,
        subject_timeout: cfg.subject_timeout(),
        cancel: None,
    };

    let records = batch::run_batch(&cfg.data_root, &client, &opts)
        .with_context(|| format!("processing {}", cfg.data_root.display()))?;

    match &cfg.output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            report::write_jsonl(&records, BufWriter::new(file))?;
            info!("✓ Results written to {}", path.display());
        }
        None => report::write_jsonl(&records, io::stdout().lock())?,
    }

    info!("{}", Summary::from_records(&records));
    Ok(())
}

fn match_one(cfg: &config::Config, document: &Path, live: &Path) -> Result<()> {
    let threshold: Threshold = cfg.threshold()?;
    let doc_bytes =
        std::fs::read(document).with_context(|| format!("reading {}", document.display()))?;
    let live_bytes =
        std::fs::read(live).with_context(|| format!("reading {}", live.display()))?;
    // reject unsupported files before spending a retry cycle on them
    let pair = pairing::ImagePair::from_paths(
        document,
        doc_bytes.len() as u64,
        live,
        live_bytes.len() as u64,
    )?;

    let deadline = match cfg.subject_timeout() {
        Some(t) => Deadline::within(t),
        None => Deadline::none(),
    };
    let result = client(cfg)?
        .match_faces(&doc_bytes, &live_bytes, threshold, &deadline)
        .context("Match aborted")?;

    let subject = document
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let record = SubjectRecord::from_result(&subject, &pair, &result);

    println!("{}", serde_json::to_string_pretty(&record)?);
    if result.is_failure() {
        warn!("Service call failed: {}", result.reason());
    }
    Ok(())
}

fn pair(dir: &Path) -> Result<()> {
    let images = images::list_image_files(dir)?;
    info!("Found {} image(s) in {}", images.len(), dir.display());

    match pairing::select_pair(&images) {
        Ok(pair) => {
            println!("document: {}", pair.document.path.display());
            println!("live:     {}", pair.live.path.display());
        }
        Err(e) => println!("skipped:{} ({})", e.cause(), e),
    }
    Ok(())
}

fn open_config(path: Option<&Path>) -> Result<()> {
    let config_path = path.unwrap_or(&config::CONFIG_PATH);
    if !config_path.exists() {
        config::save_config(&config::Config::default(), Some(config_path))
            .context("Failed to write default config")?;
    }
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
