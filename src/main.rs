use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use homepage::chrome::Chrome;
use homepage::config::Config;
use homepage::index::{self, Index};
use homepage::logging;
use homepage::markdown::Markdown;
use homepage::router::Router;
use homepage::serve::{self, Site, StaticFiles};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Serves markdown posts under slug-based URLs.
#[derive(Parser)]
#[command(name = "homepage", version, about)]
struct Cli {
    /// Log filter (e.g. `debug`, `homepage=trace`). Overrides `RUST_LOG`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the post index and serve the site.
    Serve {
        #[command(flatten)]
        project: ProjectArgs,

        /// Listen address; overrides the project file.
        #[arg(long)]
        address: Option<String>,

        /// Number of worker threads; overrides the project file.
        #[arg(long)]
        threads: Option<usize>,
    },

    /// Build the post index, print it, and exit. Fails on any build error.
    Check {
        #[command(flatten)]
        project: ProjectArgs,
    },
}

#[derive(Args)]
struct ProjectArgs {
    /// Directory to search (along with its parents) for `homepage.yaml`.
    #[arg(long, default_value = ".")]
    project: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.log_level.as_deref()) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Serve {
            project,
            address,
            threads,
        } => {
            let mut config = Config::from_directory(&project.project)?;
            if let Some(address) = address {
                config.address = address;
            }
            if let Some(threads) = threads {
                config.threads = threads;
            }
            info!(
                title = %config.title,
                posts = %config.posts_directory.display(),
                prefix = %config.blog_prefix,
                "configuration loaded"
            );

            let index = build_index(&config)?;
            let site = Site {
                router: Router::new(config.blog_prefix.as_str(), index),
                chrome: Chrome::from_config(&config)?,
                statics: config
                    .static_directory
                    .as_ref()
                    .map(|dir| StaticFiles::new(config.static_prefix.as_str(), dir)),
            };
            serve::serve(site, &config.address, config.threads)
        }
        Command::Check { project } => {
            let config = Config::from_directory(&project.project)?;
            let index = build_index(&config)?;
            let mut posts: Vec<_> = index.posts().collect();
            posts.sort_by(|a, b| a.slug.cmp(&b.slug));
            for post in posts {
                println!("{}{}\t{}", config.blog_prefix, post.slug, post.title);
            }
            Ok(())
        }
    }
}

fn build_index(config: &Config) -> Result<Index> {
    index::build(&config.posts_directory, &Markdown).with_context(|| {
        format!(
            "Building post index from `{}`",
            config.posts_directory.display()
        )
    })
}
