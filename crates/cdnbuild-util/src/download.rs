//! HTTP download with SHA-256 digest.

use std::io::{Read, Write};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::UtilError;

/// Download a URL to a file, logging progress and computing SHA-256.
///
/// Returns the hex-encoded SHA-256 hash of the downloaded content. The digest
/// is informational; nothing here compares it against an expected value.
///
/// # Errors
/// Returns an error if the HTTP request fails, the file cannot be written,
/// or a read error occurs during streaming.
pub fn download_to_file(url: &str, dest: &Path) -> Result<String, UtilError> {
    let agent = ureq::Agent::new_with_config(
        ureq::config::Config::builder()
            .timeout_connect(Some(std::time::Duration::from_secs(30)))
            .timeout_global(Some(std::time::Duration::from_secs(600)))
            .build(),
    );

    tracing::info!(url, dest = %dest.display(), "downloading");
    let response = agent.get(url).call().map_err(|e| UtilError::Download {
        message: format!("{url}: {e}"),
    })?;

    let content_length: Option<u64> = response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok());

    let mut body = response.into_body();
    let mut reader = body.as_reader();
    let mut file = std::fs::File::create(dest).map_err(|source| UtilError::Io {
        path: dest.display().to_string(),
        source,
    })?;

    let mut hasher = Sha256::new();
    let mut downloaded: u64 = 0;
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let n = reader.read(&mut buf).map_err(|e| UtilError::Download {
            message: format!("{url}: {e}"),
        })?;
        if n == 0 {
            break;
        }

        let Some(chunk) = buf.get(..n) else {
            break;
        };
        file.write_all(chunk).map_err(|source| UtilError::Io {
            path: dest.display().to_string(),
            source,
        })?;
        hasher.update(chunk);
        downloaded = downloaded.saturating_add(n as u64);
    }

    let sha256 = format!("{:x}", hasher.finalize());
    tracing::info!(
        url,
        bytes = downloaded,
        expected_bytes = content_length,
        %sha256,
        "download finished"
    );
    Ok(sha256)
}
