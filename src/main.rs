use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use rust_s3ui::browser::transfer::{self, BulkSummary, TransferEvent};
use rust_s3ui::browser::{Browser, Notification, PrefixTree, Scope};
use rust_s3ui::config::{Config, S3Config};
use rust_s3ui::connections::ConnectionManager;
use rust_s3ui::format;
use rust_s3ui::s3_client::S3Client;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(name = "rust-s3ui-cli")]
#[command(about = "Browse and manage objects in S3-compatible storage", long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE", help = "Settings file (defaults to the user config directory)")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Connection profile name (defaults to the first one)")]
    profile: Option<String>,

    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    List {
        #[arg(short, long, help = "Prefix to list (defaults to the profile prefix)")]
        prefix: Option<String>,

        #[arg(short, long, help = "Stop after this many objects, 0 for no limit")]
        max_objects: Option<usize>,

        #[arg(short, long, help = "Only show keys containing this text")]
        search: Option<String>,

        #[arg(long, help = "Only show keys below this directory")]
        scope: Option<String>,

        #[arg(long, help = "Print the directory tree")]
        tree: bool,
    },

    Upload {
        #[arg(help = "Local file path")]
        file: PathBuf,

        #[arg(short, long, help = "Directory to upload into")]
        dest_prefix: Option<String>,
    },

    Download {
        #[arg(required = true, help = "Object keys")]
        keys: Vec<String>,

        #[arg(short, long, help = "Output directory")]
        output: PathBuf,
    },

    Delete {
        #[arg(required = true, help = "Object keys")]
        keys: Vec<String>,
    },

    Link {
        #[arg(help = "Object key")]
        key: String,

        #[arg(short, long, help = "Link lifetime in seconds")]
        expiry_secs: Option<u64>,
    },

    Profiles,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let connections = ConnectionManager::load(config_path)?;

    if let Commands::Profiles = cli.command {
        print_profiles(connections.list());
        return Ok(());
    }

    let profile = pick_profile(&connections, cli.profile.as_deref())?;
    info!("Using profile {} ({}/{})", profile.name, profile.endpoint, profile.bucket);
    let client = Arc::new(S3Client::new(profile)?);
    let settings = connections.config().browser.clone();

    match cli.command {
        Commands::List {
            prefix,
            max_objects,
            search,
            scope,
            tree,
        } => {
            let mut settings = settings;
            if let Some(max) = max_objects {
                settings.max_objects = max;
            }
            let prefix = prefix.unwrap_or_else(|| profile.prefix.clone());
            let ceiling = settings.ceiling();
            let mut browser = Browser::new(client, Handle::current(), settings);

            browser.start_load(&prefix, ceiling);
            while browser.is_loading() {
                browser.process_next().await;
                report_notifications(&mut browser);
            }

            if let Some(term) = search {
                browser.apply_search_now(term);
            }
            if let Some(scope) = scope {
                browser.select_scope(Scope::from_id(&scope));
            }
            report_notifications(&mut browser);

            if tree {
                print_tree(browser.tree(), &Scope::Root, 0);
                println!();
            }
            for object in browser.visible_objects() {
                println!(
                    "{:>10}  {}  {}",
                    format::byte_count_si(object.size),
                    format::timestamp(&object.last_modified),
                    object.key
                );
            }
            info!("{} | {}", browser.status(), browser.items_label());
        }

        Commands::Upload { file, dest_prefix } => {
            let dest = dest_prefix.unwrap_or_else(|| profile.prefix.clone());
            info!("Uploading file: {} into {:?}", file.display(), dest);
            let summary = transfer::upload_file(client.as_ref(), &file, &dest, report).await;
            finish(summary)?;
        }

        Commands::Download { keys, output } => {
            tokio::fs::create_dir_all(&output)
                .await
                .context("Failed to create output directory")?;
            let summary = transfer::download_keys(client.as_ref(), keys, &output, report).await;
            finish(summary)?;
        }

        Commands::Delete { keys } => {
            let summary = transfer::delete_keys(client.as_ref(), keys, report).await;
            finish(summary)?;
        }

        Commands::Link { key, expiry_secs } => {
            let expiry = Duration::from_secs(expiry_secs.unwrap_or(settings.link_expiry_secs));
            let summary = transfer::presign(client.as_ref(), &key, expiry, report).await;
            finish(summary)?;
        }

        Commands::Profiles => {}
    }

    Ok(())
}

fn pick_profile<'a>(connections: &'a ConnectionManager, name: Option<&str>) -> Result<&'a S3Config> {
    match name {
        Some(name) => connections
            .find(name)
            .and_then(|i| connections.get(i))
            .ok_or_else(|| anyhow!("No connection profile named {:?}", name)),
        None => connections.get(0).ok_or_else(|| {
            anyhow!(
                "No connection profiles in {}; set S3_ENDPOINT and S3_ACCESS_KEY or add one with the GUI",
                connections.path().display()
            )
        }),
    }
}

fn print_profiles(profiles: &[S3Config]) {
    if profiles.is_empty() {
        println!("No connection profiles");
        return;
    }
    for profile in profiles {
        let scheme = if profile.use_ssl { "https" } else { "http" };
        println!(
            "{}\t{}://{}\t{}/{}",
            profile.name, scheme, profile.endpoint, profile.bucket, profile.prefix
        );
    }
}

fn print_tree(tree: &PrefixTree, node: &Scope, depth: usize) {
    for child in tree.children(node) {
        println!("{}{}/", "  ".repeat(depth), tree.label(child).unwrap_or_default());
        print_tree(tree, child, depth + 1);
    }
}

fn report_notifications(browser: &mut Browser) {
    for notification in browser.drain_notifications() {
        match notification {
            Notification::Progress(progress) => info!("{}", progress.status),
            Notification::Error(e) => error!("{}", e),
            other => debug!("{:?}", other),
        }
    }
}

fn report(event: TransferEvent) {
    match event {
        TransferEvent::Progress {
            operation,
            key,
            transferred,
            total,
        } => match total {
            Some(total) => debug!("{} {}: {} of {}", operation, key, transferred, total),
            None => debug!("{} {}: {}", operation, key, format::byte_count_si(transferred)),
        },
        TransferEvent::Done { operation, key } => info!("{} done: {}", operation, key),
        TransferEvent::Failed(e) => error!("{}", e),
        TransferEvent::Link { key, url } => {
            info!("Link for {}", key);
            println!("{}", url);
        }
    }
}

fn finish(summary: BulkSummary) -> Result<()> {
    if summary.failed > 0 {
        return Err(anyhow!(
            "{} of {} item(s) failed",
            summary.failed,
            summary.failed + summary.succeeded
        ));
    }
    Ok(())
}
