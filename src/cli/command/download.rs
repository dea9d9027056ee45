//! Downloads one day of ICON-D2 files into an existing directory tree.

use std::time::Duration;

use anyhow::{bail, Result};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    batch::{run_batch, BatchConfig, BatchReport},
    catalog::Level,
    cli::{create_progress_bar, DownloadArgs},
    download::{FetchConfig, HttpFetcher},
    enumerate::{enumerate, Selection},
};

use super::{default_destination, make_failed_list_name};

pub async fn download(args: &DownloadArgs) -> Result<String> {
    let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
    let root = match &args.dest {
        Some(dest) => dest.clone(),
        None => default_destination()?,
    };

    let plan = enumerate(date, root)
        .with_selection(selection(args)?)
        .with_base_url(&args.base_url);
    plan.verify_layout()?;

    if args.dry_run {
        for planned in plan.clone() {
            match planned.coordinate {
                Some(coordinate) => {
                    let (upper, lower) = coordinate.level.bounds();
                    println!(
                        "{} -> {} ({:.0} m, layer {:.0}..{:.0} m)",
                        planned.resource.url,
                        planned.artifact.path().display(),
                        coordinate.level.height(),
                        upper,
                        lower
                    );
                }
                None => println!("{} -> {}", planned.resource.url, planned.artifact.path().display()),
            }
        }
        return Ok(format!("{} files planned", plan.len()));
    }

    info!(date = %date, root = %plan.root().display(), files = plan.len(), "Starting download");

    let fetcher = HttpFetcher::new(&FetchConfig {
        request_timeout: Duration::from_secs(args.timeout),
        ..FetchConfig::default()
    })?;
    let config = BatchConfig {
        concurrency: args.concurrency,
        max_consecutive_io_errors: args.max_io_errors,
    };
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing downloads in flight");
            interrupt.cancel();
        }
    });

    let bar = create_progress_bar(plan.len() as u64, "Downloading grib files".to_string());
    let report = run_batch(&fetcher, plan.clone(), &config, &cancel, &bar).await;
    bar.finish_with_message("Downloads finished");

    print_failures(&report);
    if report.failed() > 0 {
        let path = plan.root().join(make_failed_list_name(date));
        report.write_failed_urls(&path)?;
        println!("Failed URLs written to `{}`", path.display());
    }

    if let Some(reason) = &report.aborted {
        bail!("download aborted: {reason}");
    }

    Ok(summary(&report))
}

fn selection(args: &DownloadArgs) -> Result<Selection> {
    let mut selection = Selection::default();

    if !args.model.is_empty() {
        selection.models.clone_from(&args.model);
    }
    if !args.run_hour.is_empty() {
        selection.run_hours.clone_from(&args.run_hour);
    }
    if !args.field.is_empty() {
        selection.fields.clone_from(&args.field);
    }
    selection.members = (0..args.members).collect();
    selection.levels = (0..args.levels).map(Level::new).collect::<Result<_, _>>()?;

    Ok(selection)
}

fn print_failures(report: &BatchReport) {
    for outcome in report.failures() {
        println!("  {} ({})", outcome.resource.url, outcome.status);
    }
}

fn summary(report: &BatchReport) -> String {
    format!(
        "Attempted {}, succeeded {}, failed {}, skipped {}",
        report.attempted(),
        report.succeeded(),
        report.failed(),
        report.skipped()
    )
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use std::{fs, path::PathBuf};

    use axum::{http::StatusCode, routing::get, Router};
    use chrono::NaiveDate;
    use tempfile::TempDir;
    use tokio::net::TcpListener;

    use super::*;
    use crate::{
        catalog::{Field, Model, RunHour, LEVEL_COUNT, MEMBER_COUNT},
        enumerate::LayoutError,
    };

    const FIRST: &str = "icon-d2_germany_regular-lat-lon_model-level_2022111400_000_0_u.grib2.bz2";
    const SECOND: &str = "icon-d2_germany_regular-lat-lon_model-level_2022111400_000_1_u.grib2.bz2";

    fn args(dest: PathBuf, base_url: String) -> DownloadArgs {
        DownloadArgs {
            date: NaiveDate::from_ymd_opt(2022, 11, 14),
            dest: Some(dest),
            base_url,
            model: vec![Model::RegularLatLonModelLevel],
            run_hour: vec![RunHour::new(0).unwrap()],
            field: vec![Field::U],
            members: 1,
            levels: 2,
            concurrency: 2,
            timeout: 5,
            max_io_errors: 10,
            dry_run: false,
        }
    }

    #[test]
    fn should_build_the_selection_from_arguments() {
        let mut download_args = args("/data".into(), String::new());
        download_args.model.clear();
        download_args.members = MEMBER_COUNT;
        download_args.levels = LEVEL_COUNT;

        let selection = selection(&download_args).unwrap();

        assert_eq!(selection.models.len(), 4);
        assert_eq!(selection.run_hours.len(), 1);
        assert_eq!(selection.len(), 4 * 5 * 65);
    }

    #[tokio::test]
    async fn should_refuse_to_start_without_the_directory_tree() {
        let root = TempDir::new().unwrap();

        let err = download(&args(root.path().to_path_buf(), "http://127.0.0.1:9".into()))
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<LayoutError>(),
            Some(LayoutError::MissingDirectories(_))
        ));
        assert!(!root.path().join("00").exists());
    }

    #[tokio::test]
    async fn should_download_and_list_failures_for_retry() {
        let app = Router::new()
            .route(&format!("/grib/00/u/{FIRST}"), get(|| async { "grib bytes" }))
            .fallback(|| async { (StatusCode::NOT_FOUND, "missing") });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let root = TempDir::new().unwrap();
        let directory = root.path().join("00").join("u");
        fs::create_dir_all(&directory).unwrap();

        let message = download(&args(root.path().to_path_buf(), format!("http://{addr}/grib")))
            .await
            .unwrap();

        assert_eq!(message, "Attempted 2, succeeded 1, failed 1, skipped 0");
        assert_eq!(fs::read_to_string(directory.join(FIRST)).unwrap(), "grib bytes");
        assert!(!directory.join(SECOND).exists());
        assert_eq!(
            fs::read_to_string(root.path().join("failed-20221114.txt")).unwrap(),
            format!("http://{addr}/grib/00/u/{SECOND}\n")
        );
    }

    #[tokio::test]
    async fn should_only_plan_on_a_dry_run() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("00").join("u")).unwrap();
        let mut download_args = args(root.path().to_path_buf(), "http://127.0.0.1:9".into());
        download_args.dry_run = true;

        let message = download(&download_args).await.unwrap();

        assert_eq!(message, "2 files planned");
        assert_eq!(fs::read_dir(root.path().join("00").join("u")).unwrap().count(), 0);
    }
}
