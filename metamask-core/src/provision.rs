//! Extension package download and cache.
//!
//! Packages are cached as files named after the last path segment of their
//! download URL. A file that already exists is a cache hit; its content is
//! never checked, so a changed upstream package needs a new file name.
//!
//! Cache location:
//! - explicit directory passed to [`ExtensionProvisioner::with_dir`]
//! - `METAMASK_CACHE_DIR` env var
//! - the current working directory

use anyhow::{bail, Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

const MANIFEST: &str = "manifest.json";

/// Fetches extension packages and unpacks them for `--load-extension`.
pub struct ExtensionProvisioner {
    cache_dir: PathBuf,
    client: reqwest::Client,
}

impl ExtensionProvisioner {
    /// Create a provisioner using the resolved cache directory.
    pub fn new() -> Result<Self> {
        Self::with_dir(resolve_cache_dir()?)
    }

    /// Create a provisioner caching into `cache_dir`.
    pub fn with_dir(cache_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache dir: {}", cache_dir.display()))?;
        Ok(Self {
            cache_dir,
            client: reqwest::Client::new(),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Where the package downloaded from `url` is cached.
    pub fn local_path(&self, url: &str) -> Result<PathBuf> {
        let parsed = Url::parse(url).with_context(|| format!("Invalid package URL: {}", url))?;
        let name = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .with_context(|| format!("Package URL has no file name: {}", url))?;
        Ok(self.cache_dir.join(name))
    }

    /// Return the cached package for `url`, downloading it on a miss.
    pub async fn fetch(&self, url: &str) -> Result<PathBuf> {
        info!("Downloading metamask...");
        let path = self.local_path(url)?;

        if path.exists() {
            info!("Metamask {} found in cache", path.display());
            return Ok(path);
        }

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to request {}", url))?
            .error_for_status()
            .with_context(|| format!("Failed to download {}", url))?;

        // Written aside and renamed so an interrupted download is never a cache hit
        let partial = partial_path(&path);
        let mut file = tokio::fs::File::create(&partial)
            .await
            .with_context(|| format!("Failed to create {}", partial.display()))?;

        let mut written = 0usize;
        while let Some(chunk) = response
            .chunk()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&partial, &path)
            .await
            .with_context(|| format!("Failed to move package into {}", path.display()))?;

        info!(bytes = written, "Metamask saved to {}", path.display());
        Ok(path)
    }

    /// Unpack a package next to it and return the directory holding its
    /// `manifest.json`. An earlier unpack is reused.
    pub fn unpack(&self, archive: &Path) -> Result<PathBuf> {
        unpack_archive(archive)
    }

    /// Fetch and unpack: the returned directory can be loaded as an extension.
    pub async fn provision(&self, url: &str) -> Result<PathBuf> {
        let archive = self.fetch(url).await?;
        tokio::task::spawn_blocking(move || unpack_archive(&archive))
            .await
            .context("Unpack task panicked")?
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn unpack_archive(archive: &Path) -> Result<PathBuf> {
    let target = archive.with_extension("");
    if target == archive {
        bail!("Package {} has no extension to strip", archive.display());
    }

    if target.is_dir() {
        if let Some(root) = manifest_root(&target)? {
            debug!("Reusing unpacked extension at {}", root.display());
            return Ok(root);
        }
        fs::remove_dir_all(&target)
            .with_context(|| format!("Failed to clear {}", target.display()))?;
    }

    let staging = partial_path(&target);
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    extract_zip(archive, &staging)?;
    fs::rename(&staging, &target)
        .with_context(|| format!("Failed to move unpacked extension to {}", target.display()))?;

    let root = manifest_root(&target)?
        .with_context(|| format!("No {} in {}", MANIFEST, archive.display()))?;
    info!("Unpacked extension to {}", root.display());
    Ok(root)
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<()> {
    let file = fs::File::open(archive)
        .with_context(|| format!("Failed to open {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file)
        .with_context(|| format!("Failed to open ZIP {}", archive.display()))?;

    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .with_context(|| format!("Failed to read ZIP entry {}", i))?;

        let relative = match entry.enclosed_name() {
            Some(path) => path,
            None => bail!("ZIP entry escapes the target directory: {}", entry.name()),
        };
        let outpath = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = fs::File::create(&outpath)
                .with_context(|| format!("Failed to create {}", outpath.display()))?;
            io::copy(&mut entry, &mut outfile)?;
        }
    }

    Ok(())
}

/// `dir` itself, or its only subdirectory, whichever holds the manifest.
fn manifest_root(dir: &Path) -> Result<Option<PathBuf>> {
    if dir.join(MANIFEST).is_file() {
        return Ok(Some(dir.to_path_buf()));
    }

    let mut subdirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            subdirs.push(entry.path());
        }
    }

    match subdirs.as_slice() {
        [only] if only.join(MANIFEST).is_file() => Ok(Some(only.clone())),
        _ => Ok(None),
    }
}

/// Resolve the cache directory.
///
/// Priority:
/// 1. `METAMASK_CACHE_DIR` env var
/// 2. Current working directory
fn resolve_cache_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("METAMASK_CACHE_DIR") {
        return Ok(PathBuf::from(dir));
    }

    std::env::current_dir().context("Failed to determine the working directory")
}
