/*!
 * System image version oracle
 *
 * The local side of the comparison is the image's own `version` marker when
 * it ships one, otherwise a SHA-256 over every file in the image directory.
 * The installed side is read from the device's build info.
 */

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tether_interface::{CollaboratorError, Result, Session, VersionOracle};
use tracing::debug;
use walkdir::WalkDir;

/// Version marker shipped at the root of an image directory
pub const IMAGE_VERSION_FILE: &str = "version";

/// Where the device records the version of its installed build
pub const INSTALLED_VERSION_PATH: &str = "/config/build-info/version";

/// Compares local system images against installed software
#[derive(Debug, Clone, Default)]
pub struct ImageVersionOracle;

impl ImageVersionOracle {
    pub fn new() -> Self {
        Self
    }
}

/// Hash every regular file under `image_dir`
///
/// Files are visited in sorted order and each contributes its relative path
/// as well as its content, so renames change the digest.
pub fn hash_image_dir(image_dir: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    let mut files = 0usize;

    for entry in WalkDir::new(image_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| match e.into_io_error() {
            Some(io) => CollaboratorError::Io(io),
            None => CollaboratorError::Unavailable("filesystem loop in image directory".to_string()),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(image_dir).unwrap_or(entry.path());
        hasher.update(relative.to_string_lossy().as_bytes());
        hasher.update([0u8]);

        let mut file = BufReader::new(File::open(entry.path())?);
        loop {
            let n = file.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
        files += 1;
    }

    debug!(image_dir = %image_dir.display(), files, "Hashed system image");
    Ok(hex::encode(hasher.finalize()))
}

fn read_local_version(image_dir: &Path) -> Result<String> {
    if !image_dir.is_dir() {
        return Err(CollaboratorError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("system image directory {} not found", image_dir.display()),
        )));
    }

    let marker = image_dir.join(IMAGE_VERSION_FILE);
    if marker.is_file() {
        let version = std::fs::read_to_string(&marker)?.trim().to_string();
        if !version.is_empty() {
            return Ok(version);
        }
    }

    hash_image_dir(image_dir)
}

#[async_trait]
impl VersionOracle for ImageVersionOracle {
    async fn local_image_version(&self, image_dir: &Path) -> Result<String> {
        let dir: PathBuf = image_dir.to_path_buf();
        tokio::task::spawn_blocking(move || read_local_version(&dir))
            .await
            .map_err(|e| CollaboratorError::Unavailable(format!("image hashing task failed: {}", e)))?
    }

    async fn installed_version(&self, session: &dyn Session) -> Result<String> {
        let stdout = session.run(&["cat", INSTALLED_VERSION_PATH]).await?;
        let version = stdout.trim();
        if version.is_empty() {
            return Err(CollaboratorError::Parse(format!(
                "{} is empty on the device",
                INSTALLED_VERSION_PATH
            )));
        }
        Ok(version.to_string())
    }
}
