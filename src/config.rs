//! Loads the site [`Config`] from a `homepage.yaml` project file. Relative
//! paths in the project file are resolved against the file's directory.
//!
//! ```yaml
//! title: My Homepage
//! address: 0.0.0.0:8888
//! blog_prefix: /blog/
//! posts_directory: posts
//! static_prefix: /fonts/
//! static_directory: static/fonts
//! source_url: https://example.com/homepage
//! ```

use crate::util::open;
use anyhow::{anyhow, ensure, Context, Result};
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "homepage.yaml";

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Project {
    #[serde(default = "default_title")]
    title: String,

    #[serde(default = "default_address")]
    address: String,

    #[serde(default)]
    threads: Option<usize>,

    #[serde(default = "default_blog_prefix")]
    blog_prefix: String,

    #[serde(default = "default_posts_directory")]
    posts_directory: PathBuf,

    #[serde(default = "default_static_prefix")]
    static_prefix: String,

    #[serde(default)]
    static_directory: Option<PathBuf>,

    #[serde(default)]
    template: Option<PathBuf>,

    #[serde(default)]
    source_url: Option<Url>,
}

fn default_title() -> String {
    String::from("Homepage")
}

fn default_address() -> String {
    String::from("0.0.0.0:8888")
}

fn default_blog_prefix() -> String {
    String::from("/blog/")
}

fn default_posts_directory() -> PathBuf {
    PathBuf::from("posts")
}

fn default_static_prefix() -> String {
    String::from("/static/")
}

/// Process configuration. Built once in `main` and handed to whatever needs
/// it.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Site title, used by the page template.
    pub title: String,

    /// The `host:port` to listen on.
    pub address: String,

    /// The number of request-handling threads.
    pub threads: usize,

    /// The URL prefix posts are served under. Starts and ends with `/`.
    pub blog_prefix: String,

    /// The content root holding the post sources.
    pub posts_directory: PathBuf,

    /// The URL prefix static files are served under. Starts and ends with `/`.
    pub static_prefix: String,

    /// The root of the static file tree. Static serving is disabled when
    /// unset.
    pub static_directory: Option<PathBuf>,

    /// A custom page template. The embedded default is used when unset.
    pub template: Option<PathBuf>,

    /// Linked from the page footer when set.
    pub source_url: Option<Url>,
}

impl Config {
    /// Searches `dir` and then each of its ancestors for [`PROJECT_FILE`] and
    /// loads the first one found.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let dir = dir
            .canonicalize()
            .with_context(|| format!("Resolving project directory `{}`", dir.display()))?;
        for ancestor in dir.ancestors() {
            let path = ancestor.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path)
                    .with_context(|| format!("Loading configuration from `{}`", path.display()));
            }
        }
        Err(anyhow!(
            "Could not find `{}` in `{}` or any parent directory",
            PROJECT_FILE,
            dir.display()
        ))
    }

    /// Loads a specific project file.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let project: Project = serde_yaml::from_reader(open(path, "project")?)?;
        match path.parent() {
            None => Err(anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )),
            Some(project_root) => Config::from_project(project, project_root),
        }
    }

    /// Parses project YAML as if it lived in `project_root`.
    pub fn from_yaml(yaml: &str, project_root: &Path) -> Result<Config> {
        let project: Project = if yaml.trim().is_empty() {
            serde_yaml::from_str("{}")?
        } else {
            serde_yaml::from_str(yaml)?
        };
        Config::from_project(project, project_root)
    }

    fn from_project(project: Project, project_root: &Path) -> Result<Config> {
        validate_prefix("blog_prefix", &project.blog_prefix)?;
        validate_prefix("static_prefix", &project.static_prefix)?;
        ensure!(
            project.static_directory.is_none() || project.blog_prefix != project.static_prefix,
            "`blog_prefix` and `static_prefix` must differ (both are `{}`)",
            project.blog_prefix
        );
        ensure!(project.threads != Some(0), "`threads` must be at least 1");

        Ok(Config {
            title: project.title,
            address: project.address,
            threads: project.threads.unwrap_or_else(default_threads),
            blog_prefix: project.blog_prefix,
            posts_directory: project_root.join(project.posts_directory),
            static_prefix: project.static_prefix,
            static_directory: project.static_directory.map(|dir| project_root.join(dir)),
            template: project.template.map(|path| project_root.join(path)),
            source_url: project.source_url,
        })
    }
}

fn validate_prefix(name: &str, prefix: &str) -> Result<()> {
    ensure!(
        prefix.starts_with('/') && prefix.ends_with('/'),
        "`{}` must start and end with `/`, got `{}`",
        name,
        prefix
    );
    ensure!(
        prefix.is_ascii() && !prefix.contains(|c| c == '#' || c == '?'),
        "`{}` must be plain ASCII without `#` or `?`, got `{}`",
        name,
        prefix
    );
    Ok(())
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
