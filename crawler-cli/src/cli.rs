use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use bridge_desktop::{ReqwestHttpClient, TokioFileSystem};
use bridge_traits::time::SystemClock;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use core_crawl::{CodeRange, CrawlReport, FetchWorkerPool};
use core_library::db::{create_pool, DatabaseConfig};
use core_library::SqliteImageStore;
use core_runtime::config::{CrawlSettings, SyncSettings};
use core_runtime::logging::{init_logging, LoggingConfig};
use core_sync::{InventoryReader, MetadataSynchronizer, SyncError, SyncReport, SyncTarget};
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "image-crawler",
    version,
    about = "Download numbered images and publish their metadata"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch every code in an inclusive range into a dated folder
    Crawl(CrawlArgs),
    /// Upsert metadata for the images in a folder into the document store
    Sync(SyncArgs),
}

#[derive(Debug, Args)]
pub struct CrawlArgs {
    #[arg(help = "First code number to fetch")]
    pub start_code: u64,
    #[arg(help = "Last code number to fetch (inclusive)")]
    pub end_code: u64,
    #[arg(long, help = "Number of concurrent fetch workers")]
    pub concurrency: Option<usize>,
    #[arg(long, help = "Directory that receives the dated output folder")]
    pub output_base: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    #[arg(help = "Folder holding <code>.jpg files; also used as the URL path segment")]
    pub folder_path: String,
    #[arg(long, help = "Repository branch used in the published URLs")]
    pub branch: Option<String>,
    #[arg(long, help = "Print the sync report as JSON")]
    pub json: bool,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    init_logging(LoggingConfig::from_env()?).context("failed to initialise logging")?;

    match cli.command {
        Command::Crawl(args) => {
            let report = run_crawl(args, env_lookup).await?;
            println!("{}", report.summary());
        }
        Command::Sync(args) => {
            let json = args.json;
            let report = run_sync(args, env_lookup).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.summary());
            }
        }
    }

    Ok(())
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// `<base>/images_<YYYYMMDD>_<start>_to_<end>`, base defaulting to the
/// working directory
pub fn output_dir(base: Option<&Path>, range: &CodeRange, date: NaiveDate) -> PathBuf {
    base.unwrap_or_else(|| Path::new("."))
        .join(range.output_dir_name(date))
}

pub fn crawl_settings<L>(lookup: L, concurrency: Option<usize>) -> anyhow::Result<CrawlSettings>
where
    L: Fn(&str) -> Option<String>,
{
    let mut settings = CrawlSettings::from_lookup(lookup)?;
    if let Some(workers) = concurrency {
        settings.concurrency = workers;
        settings.validate()?;
    }
    Ok(settings)
}

pub fn sync_settings<L>(lookup: L, branch: Option<String>) -> anyhow::Result<SyncSettings>
where
    L: Fn(&str) -> Option<String>,
{
    let mut settings = SyncSettings::from_lookup(lookup)?;
    if let Some(branch) = branch {
        settings.branch = branch;
        settings.validate()?;
    }
    Ok(settings)
}

pub async fn run_crawl<L>(args: CrawlArgs, lookup: L) -> anyhow::Result<CrawlReport>
where
    L: Fn(&str) -> Option<String>,
{
    let range = CodeRange::new(args.start_code, args.end_code)?;
    let settings = crawl_settings(lookup, args.concurrency)?;
    let output_dir = output_dir(
        args.output_base.as_deref(),
        &range,
        Local::now().date_naive(),
    );

    info!(
        start = range.start(),
        end = range.end(),
        concurrency = settings.concurrency,
        output_dir = %output_dir.display(),
        "Crawl configured"
    );

    let http_client = ReqwestHttpClient::with_timeout(settings.request_timeout)
        .context("failed to build HTTP client")?;
    let pool = FetchWorkerPool::new(
        settings,
        Arc::new(http_client),
        Arc::new(TokioFileSystem::new()),
    )?;

    Ok(pool.run(&range, &output_dir).await?)
}

pub async fn run_sync<L>(args: SyncArgs, lookup: L) -> anyhow::Result<SyncReport>
where
    L: Fn(&str) -> Option<String>,
{
    let settings = sync_settings(lookup, args.branch)?;
    let target = SyncTarget::from_settings(&settings, &args.folder_path)?;

    // Lookups and the bulk write never overlap
    let db_config =
        DatabaseConfig::from_url(settings.connection_string.as_str()).max_connections(1);
    let pool = create_pool(db_config)
        .await
        .map_err(|e| SyncError::DocumentStoreConnection(e.to_string()))?;

    let inventory = InventoryReader::new(Arc::new(TokioFileSystem::new()))
        .read(Path::new(&args.folder_path))
        .await
        .with_context(|| format!("cannot read image folder '{}'", args.folder_path))?;

    let synchronizer = MetadataSynchronizer::new(
        Arc::new(SqliteImageStore::new(pool)),
        Arc::new(SystemClock),
    );

    Ok(synchronizer.sync(&inventory, &target).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_crawl::CrawlError;
    use httpmock::prelude::*;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::collections::HashMap;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn jpeg_bytes() -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, image::Rgb([0, 0, 0])));
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_parse_crawl_command() {
        let cli = Cli::try_parse_from([
            "image-crawler",
            "crawl",
            "100",
            "102",
            "--concurrency",
            "8",
            "--output-base",
            "/data",
        ])
        .unwrap();

        match cli.command {
            Command::Crawl(args) => {
                assert_eq!(args.start_code, 100);
                assert_eq!(args.end_code, 102);
                assert_eq!(args.concurrency, Some(8));
                assert_eq!(args.output_base, Some(PathBuf::from("/data")));
            }
            other => panic!("expected crawl, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_sync_command() {
        let cli = Cli::try_parse_from([
            "image-crawler",
            "sync",
            "images_20240101_100_to_102",
            "--branch",
            "gh-pages",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Command::Sync(args) => {
                assert_eq!(args.folder_path, "images_20240101_100_to_102");
                assert_eq!(args.branch.as_deref(), Some("gh-pages"));
                assert!(args.json);
            }
            other => panic!("expected sync, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_non_numeric_code() {
        assert!(Cli::try_parse_from(["image-crawler", "crawl", "s100", "102"]).is_err());
    }

    #[test]
    fn test_output_dir() {
        let range = CodeRange::new(100, 102).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        assert_eq!(
            output_dir(None, &range, date),
            PathBuf::from("./images_20240101_100_to_102")
        );
        assert_eq!(
            output_dir(Some(Path::new("/data")), &range, date),
            PathBuf::from("/data/images_20240101_100_to_102")
        );
    }

    #[test]
    fn test_flags_override_environment() {
        let crawl = crawl_settings(lookup_from(&[("CRAWL_CONCURRENCY", "2")]), Some(9)).unwrap();
        assert_eq!(crawl.concurrency, 9);

        let crawl = crawl_settings(lookup_from(&[("CRAWL_CONCURRENCY", "2")]), None).unwrap();
        assert_eq!(crawl.concurrency, 2);

        assert!(crawl_settings(lookup_from(&[]), Some(0)).is_err());

        let env = [
            ("IMAGE_DB_URL", "sqlite::memory:"),
            ("REPO_OWNER", "o"),
            ("REPO_NAME", "r"),
            ("REPO_BRANCH", "main"),
        ];
        let sync = sync_settings(lookup_from(&env), Some("dev".to_string())).unwrap();
        assert_eq!(sync.branch, "dev");
        assert!(sync_settings(lookup_from(&env), Some("a b".to_string())).is_err());
    }

    #[tokio::test]
    async fn test_crawl_rejects_inverted_range() {
        let args = CrawlArgs {
            start_code: 10,
            end_code: 5,
            concurrency: None,
            output_base: None,
        };

        let err = run_crawl(args, lookup_from(&[])).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CrawlError>(),
            Some(CrawlError::InvalidRange { start: 10, end: 5 })
        ));
    }

    #[tokio::test]
    async fn test_sync_reports_every_missing_variable() {
        let args = SyncArgs {
            folder_path: "images".to_string(),
            branch: None,
            json: false,
        };

        let err = run_sync(args, lookup_from(&[])).await.unwrap_err();
        match err.downcast_ref::<core_runtime::Error>() {
            Some(core_runtime::Error::MissingConfig { keys }) => assert_eq!(keys.len(), 3),
            other => panic!("expected MissingConfig, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_crawl_writes_dated_folder() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/tai-anh-ve/");
                then.status(200).body(jpeg_bytes());
            })
            .await;

        let base = TempDir::new().unwrap();
        let endpoint = format!("{}/tai-anh-ve/?id={{code}}", server.base_url());
        let args = CrawlArgs {
            start_code: 7,
            end_code: 8,
            concurrency: Some(2),
            output_base: Some(base.path().to_path_buf()),
        };

        let report = run_crawl(args, lookup_from(&[("CRAWL_ENDPOINT", &endpoint)]))
            .await
            .unwrap();

        assert_eq!(report.summary(), "Downloaded 2 images out of 2 attempts");
        let folder = report.output_dir().file_name().unwrap().to_str().unwrap();
        assert!(folder.starts_with("images_"));
        assert!(folder.ends_with("_7_to_8"));
        assert!(report.output_dir().join("s7.jpg").exists());
        assert!(report.output_dir().join("s8.jpg").exists());
    }

    #[tokio::test]
    async fn test_sync_twice_is_idempotent() {
        let workspace = TempDir::new().unwrap();
        let images = workspace.path().join("images_20240101_1_to_2");
        std::fs::create_dir(&images).unwrap();
        std::fs::write(images.join("s1.jpg"), b"x").unwrap();
        std::fs::write(images.join("s2.jpg"), b"x").unwrap();
        std::fs::write(images.join("notes.txt"), b"x").unwrap();

        let db_url = format!("sqlite:{}", workspace.path().join("images.db").display());
        let env = [
            ("IMAGE_DB_URL", db_url.as_str()),
            ("REPO_OWNER", "MinhOmega"),
            ("REPO_NAME", "crawler-fgo.vn"),
        ];
        let args = || SyncArgs {
            folder_path: images.to_string_lossy().into_owned(),
            branch: None,
            json: true,
        };

        let first = run_sync(args(), lookup_from(&env)).await.unwrap();
        assert_eq!(first.scanned, 2);
        assert_eq!(first.inserted, 2);

        let second = run_sync(args(), lookup_from(&env)).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.modified, 0);
        assert_eq!(second.unchanged, 2);

        let json = serde_json::to_value(&second).unwrap();
        assert_eq!(json["unchanged"], 2);
    }

    #[tokio::test]
    async fn test_sync_missing_folder_fails() {
        let workspace = TempDir::new().unwrap();
        let db_url = format!("sqlite:{}", workspace.path().join("images.db").display());
        let env = [
            ("IMAGE_DB_URL", db_url.as_str()),
            ("REPO_OWNER", "o"),
            ("REPO_NAME", "r"),
        ];
        let args = SyncArgs {
            folder_path: workspace.path().join("missing").to_string_lossy().into_owned(),
            branch: None,
            json: false,
        };

        assert!(run_sync(args, lookup_from(&env)).await.is_err());
    }
}
