mod cli;

use crate::cli::{Command, StorageBackendArg, CLI};
use anyhow::{bail, Context};
use clap::Parser;
use shrink_core::{ShortenedUrl, Shortener, ShortenerError, Storage, Url};
use shrink_generator::Base62Generator;
use shrink_shortener::ShortenerService;
use shrink_storage::{FileStorage, MemoryStorage, PostgresStorage};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_json);

    info!(
        base_url = %config.base_url,
        storage_backend = %config.storage,
        slug_length = config.slug_length,
        "starting shrink"
    );

    let generator = Base62Generator::new(config.slug_length);

    match config.storage {
        StorageBackendArg::Memory => {
            let service = ShortenerService::new(config.base_url, MemoryStorage::new(), generator);
            run(&service, config.command).await
        }
        StorageBackendArg::File => {
            let path = config
                .file_path
                .context("file path is required when storage backend is file")?;
            let storage = FileStorage::open(&path)
                .with_context(|| format!("failed to open file storage {}", path.display()))?;
            let service = ShortenerService::new(config.base_url, storage, generator);
            run(&service, config.command).await
        }
        StorageBackendArg::Postgres => {
            let dsn = config
                .database_dsn
                .context("database dsn is required when storage backend is postgres")?;
            let storage = PostgresStorage::connect(&dsn)
                .await
                .context("failed to connect postgres")?;
            storage.migrate().await.context("failed to migrate postgres")?;

            if let Command::Ping { timeout_ms } = config.command {
                let result = storage.ping(Duration::from_millis(timeout_ms)).await;
                storage.close().await?;
                result.context("postgres ping failed")?;
                println!("pong");
                return Ok(());
            }

            let service = ShortenerService::new(config.base_url, storage, generator);
            run(&service, config.command).await
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Runs one command, then closes the storage whatever the outcome.
async fn run<S: Storage>(
    service: &ShortenerService<S, Base62Generator>,
    command: Command,
) -> anyhow::Result<()> {
    let result = execute(service, command).await;

    if let Err(err) = service.storage().close().await {
        warn!(error = %err, "failed to close storage");
    }
    info!("shutdown: storage");

    result
}

async fn execute<S: Storage>(
    service: &ShortenerService<S, Base62Generator>,
    command: Command,
) -> anyhow::Result<()> {
    let storage = service.storage();

    match command {
        Command::Short { user, corr, url } => {
            match service.short(Url::new(user, corr, url.as_str())).await {
                Ok(value) => println!("{value}"),
                Err(ShortenerError::UniqueViolation) => {
                    let existing = storage.get_by_url(&url).await?;
                    println!("{}", existing.value);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Command::Batch { user, urls } => {
            let urls = urls
                .into_iter()
                .enumerate()
                .map(|(i, raw)| Url::new(user.as_str(), i.to_string(), raw))
                .collect();
            for shortened in service.batch(urls).await? {
                println!("{}\t{}", shortened.corr_id, shortened.value);
            }
        }
        Command::Get { slug } => print_found(storage.get_by_slug(&slug).await?)?,
        Command::Find { url } => print_found(storage.get_by_url(&url).await?)?,
        Command::List { user } => {
            for shortened in storage.collect_by_user(&user).await? {
                println!("{shortened}");
            }
        }
        Command::Delete { user, slugs } => {
            storage.delete(&user, &slugs).await?;
            println!("deleted");
        }
        Command::Stat => {
            let stat = storage.stat().await?;
            println!("urls: {}\nusers: {}", stat.urls, stat.users);
        }
        Command::Ping { .. } => println!("pong"),
    }

    Ok(())
}

fn print_found(shortened: ShortenedUrl) -> anyhow::Result<()> {
    if shortened.is_empty() {
        bail!("not found");
    }
    if shortened.is_deleted {
        bail!("gone: {}", shortened.slug);
    }
    println!("{shortened}");
    Ok(())
}
