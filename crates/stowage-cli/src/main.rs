//! Stowage operator CLI
//!
//! Reads DATABASE_URL and the STOWAGE_* settings from the environment (or `.env`).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use stowage_core::telemetry::init_tracing;
use stowage_core::Config;
use stowage_db::{
    BucketRepository, DimensionRepository, FileInstanceRepository, FileRepository,
    SettingsRepository,
};
use stowage_processing::{
    CommandTool, GenerateOptions, GenerateOutcome, VariantError, VariantGenerator,
};
use stowage_storage::{ProviderRegistry, RetrieveOpts, StorageManager};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "stowage", about = "Redundant file storage and media variants")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Test connectivity to every enabled bucket
    CheckBuckets,
    /// Generate the variants of one file and wait for them
    Generate {
        /// File UUID
        file_id: Uuid,
        /// Only these dimension presets (repeatable)
        #[arg(long = "only", value_name = "NAME")]
        only: Vec<String>,
    },
    /// Print the first public URL for a stored path
    Url {
        /// Remote path, e.g. 2024/05/photo.jpg
        path: String,
        /// Restrict the lookup to these buckets (repeatable)
        #[arg(long = "bucket", value_name = "UUID")]
        buckets: Vec<Uuid>,
    },
}

struct App {
    files: FileRepository,
    storage: Arc<StorageManager>,
    generator: VariantGenerator,
}

async fn connect(config: &Config) -> anyhow::Result<App> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    stowage_db::MIGRATOR
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    let buckets = Arc::new(BucketRepository::new(pool.clone()));
    let settings = Arc::new(SettingsRepository::new(pool.clone()));
    let storage = Arc::new(
        StorageManager::new(
            buckets,
            settings.clone(),
            ProviderRegistry::with_defaults(config.local_root.clone()),
        )
        .with_cache_ttl(config.bucket_cache_ttl),
    );

    let tool = CommandTool::new(config.tools.clone(), config.tool_timeout)
        .context("Invalid media tool configuration")?;
    let generator = VariantGenerator::new(
        storage.clone(),
        Arc::new(DimensionRepository::new(pool.clone())),
        Arc::new(FileInstanceRepository::new(pool.clone())),
        settings,
        Arc::new(tool),
    )
    .with_temp_dir(config.temp_dir.clone())
    .with_batch_timeout(config.variant_batch_timeout);

    Ok(App {
        files: FileRepository::new(pool),
        storage,
        generator,
    })
}

async fn check_buckets(app: &App) -> anyhow::Result<bool> {
    let checks = app
        .storage
        .test_connections()
        .await
        .context("Failed to list buckets")?;

    if checks.is_empty() {
        println!("No enabled buckets");
        return Ok(false);
    }

    let mut healthy = true;
    for check in &checks {
        let elapsed_ms = check.duration.as_secs_f64() * 1000.0;
        match &check.result {
            Ok(()) => println!(
                "ok    {} ({}, {}) {:.1} ms",
                check.bucket_name, check.provider, check.bucket_id, elapsed_ms
            ),
            Err(e) => {
                healthy = false;
                println!(
                    "FAIL  {} ({}, {}) {:.1} ms: {}",
                    check.bucket_name, check.provider, check.bucket_id, elapsed_ms, e
                );
            }
        }
    }
    Ok(healthy)
}

async fn generate(app: &App, file_id: Uuid, only: Vec<String>) -> anyhow::Result<bool> {
    let file = app
        .files
        .get_by_id(file_id)
        .await
        .context("Failed to load file")?
        .with_context(|| format!("File {} not found", file_id))?;

    let opts = GenerateOptions {
        only: (!only.is_empty()).then_some(only),
        ..GenerateOptions::sync()
    };

    let report = match app.generator.generate_variants(&file, opts).await {
        Ok(GenerateOutcome::Completed(report)) => report,
        Ok(GenerateOutcome::NoWork) => {
            println!(
                "Nothing to generate for {} ({}); check the file type, the enabled dimensions and storage_auto_generate_variants",
                file.id, file.mime_type
            );
            return Ok(true);
        }
        Ok(GenerateOutcome::Spawned(handle)) => handle.wait().await?,
        Err(VariantError::AllFailed(failures)) => {
            for (name, reason) in &failures {
                println!("FAIL  {}: {}", name, reason);
            }
            return Ok(false);
        }
        Err(e) => return Err(e).context("Variant generation failed"),
    };

    for instance in &report.succeeded {
        println!(
            "ok    {} -> {} ({} bytes)",
            instance.variant_name, instance.file_name, instance.size
        );
    }
    for (name, e) in &report.failed {
        println!("FAIL  {}: {}", name, e);
    }
    Ok(report.failed.is_empty())
}

async fn url(app: &App, path: &str, buckets: Vec<Uuid>) -> anyhow::Result<bool> {
    let opts = RetrieveOpts {
        bucket_ids: (!buckets.is_empty()).then_some(buckets),
    };
    match app
        .storage
        .public_url(path, &opts)
        .await
        .context("Failed to resolve URL")?
    {
        Some(url) => {
            println!("{}", url);
            Ok(true)
        }
        None => {
            eprintln!("No bucket exposes a public URL for {}", path);
            Ok(false)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    init_tracing("stowage=info", cli.json_logs)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    let app = connect(&config).await?;

    let ok = match cli.command {
        Commands::CheckBuckets => check_buckets(&app).await?,
        Commands::Generate { file_id, only } => generate(&app, file_id, only).await?,
        Commands::Url { path, buckets } => url(&app, &path, buckets).await?,
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
