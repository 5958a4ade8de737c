//! `qmlsync` keeps a QML project storage database in sync with the qmldir,
//! qmltypes and qml files of a project.

mod cli;

use crate::cli::{Cli, Command, ScopeArgs};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use qmlsync_config::Config;
use qmlsync_fs::FsHandle;
use qmlsync_fs::backend::LocalFileSystem;
use qmlsync_store::ids::ProjectPartId;
use qmlsync_store::{Database, ProjectStorage, Repository, StorageHandle};
use qmlsync_updater::{
    InMemoryPathWatcher, NotifyPathWatcher, PathCache, ProjectStorageUpdater, QueueNotifier, UpdateReport,
    run_notification_loop,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Render an error chain for miette.
fn report<E>(err: exn::Exn<E>) -> miette::Report
where
    E: std::error::Error + Send + Sync + 'static,
{
    miette::miette!("{err:?}")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let mut config = Config::load(cli.config.as_deref()).map_err(report)?;
    match cli.command {
        Command::Update { scope, dry_run } => {
            config.database.dry_run |= dry_run;
            apply_scope(&mut config, scope).map_err(report)?;
            let context = Context::open(&config).await?;
            let result = context.update(&config).await;
            context.db.close().await;
            print_report(&result?);
        },
        Command::Watch { scope } => {
            apply_scope(&mut config, scope).map_err(report)?;
            let context = Context::open(&config).await?;
            let result = context.watch(&config).await;
            context.db.close().await;
            result?;
        },
        Command::Dump => {
            let context = Context::open(&config).await?;
            let result = context.dump().await;
            context.db.close().await;
            result?;
        },
    }
    Ok(())
}

fn apply_scope(config: &mut Config, scope: ScopeArgs) -> qmlsync_config::error::Result<()> {
    let current_dir = std::env::current_dir().ok();
    let absolute = |path: PathBuf| match (&current_dir, path.is_relative()) {
        (Some(cwd), true) => cwd.join(path),
        _ => path,
    };
    if !scope.directories.is_empty() {
        config.project.directories = scope.directories.into_iter().map(absolute).collect();
    }
    if !scope.qmltypes.is_empty() {
        config.project.qmltypes = scope.qmltypes.into_iter().map(absolute).collect();
    }
    if let Some(project_part) = scope.project_part {
        config.project.project_part = project_part;
    }
    config.validate()
}

struct Context {
    db: Database,
    fs: FsHandle,
    storage: StorageHandle,
    paths: Arc<PathCache>,
}

impl Context {
    async fn open(config: &Config) -> Result<Self> {
        if let Some(parent) = config.database.path.parent() {
            std::fs::create_dir_all(parent).into_diagnostic()?;
        }
        let db = Database::connect(&config.database.path).await.map_err(report)?;
        let storage: StorageHandle = Arc::new(Repository::new(db.pool().clone(), config.database.dry_run));
        let paths = Arc::new(PathCache::new(Arc::clone(&storage)));
        paths.populate().await.map_err(report)?;
        let fs: FsHandle = Arc::new(LocalFileSystem::default());
        Ok(Self { db, fs, storage, paths })
    }

    async fn project_part(&self, config: &Config) -> Result<ProjectPartId> {
        self.storage.fetch_project_part_id(&config.project.project_part).await.map_err(report)
    }

    async fn update(&self, config: &Config) -> Result<UpdateReport> {
        let project_part_id = self.project_part(config).await?;
        let watcher = Arc::new(InMemoryPathWatcher::default());
        let updater = ProjectStorageUpdater::new(
            Arc::clone(&self.fs),
            Arc::clone(&self.storage),
            Arc::clone(&self.paths),
            watcher,
        );
        updater
            .update(&config.project.directories, &config.project.qmltypes, project_part_id)
            .await
            .map_err(report)
    }

    async fn watch(&self, config: &Config) -> Result<()> {
        let project_part_id = self.project_part(config).await?;
        let (notifier, queue) = QueueNotifier::new();
        let watcher = NotifyPathWatcher::new(Arc::clone(&self.paths), Arc::new(notifier)).map_err(report)?;
        let updater = Arc::new(ProjectStorageUpdater::new(
            Arc::clone(&self.fs),
            Arc::clone(&self.storage),
            Arc::clone(&self.paths),
            Arc::new(watcher),
        ));
        let report = updater
            .update(&config.project.directories, &config.project.qmltypes, project_part_id)
            .await
            .map_err(report)?;
        print_report(&report);

        let worker = tokio::spawn(run_notification_loop(Arc::clone(&updater), queue, config.watcher.coalesce()));
        tracing::info!(project_part = %config.project.project_part, "Watching for changes");
        tokio::signal::ctrl_c().await.into_diagnostic()?;
        tracing::info!("Shutdown signal received");
        worker.abort();
        Ok(())
    }

    async fn dump(&self) -> Result<()> {
        let schema_version = self.db.schema_version().await.map_err(report)?;
        let snapshot = self.storage.snapshot().await.map_err(report)?;
        let path_of = |source_id| {
            self.paths
                .source_path(source_id)
                .map_or_else(|| format!("<source {source_id}>"), |path| path.display().to_string())
        };

        println!("# types");
        for record in &snapshot.types {
            match &record.prototype {
                Some(prototype) => println!("{} {} : {prototype}", path_of(record.source_id), record.name),
                None => println!("{} {}", path_of(record.source_id), record.name),
            }
        }
        println!("# exports");
        for export in &snapshot.exported_types {
            let module = self.storage.fetch_module(export.module_id).await.map_err(report)?;
            println!("{} {} {} -> {}", module.name, export.name, export.version, export.type_id);
        }
        println!("# imports");
        for import in &snapshot.imports {
            let module = self.storage.fetch_module(import.module_id).await.map_err(report)?;
            println!("{} imports {} {}", path_of(import.source_id), module.name, import.version);
        }
        println!(
            "# schema {schema_version}: {} files, {} project entries, {} module dependencies",
            snapshot.file_statuses.len(),
            snapshot.project_datas.len(),
            snapshot.module_dependencies.len()
        );
        Ok(())
    }
}

fn print_report(report: &UpdateReport) {
    for diagnostic in &report.diagnostics {
        eprintln!("warning: {diagnostic}");
    }
    println!(
        "parsed {} documents and {} type infos, removed {} sources",
        report.documents_parsed, report.type_infos_parsed, report.removed_sources
    );
}
