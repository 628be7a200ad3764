//! Static redirect lists.
//!
//! Two newline-separated files are read once at startup:
//! - the k8s list holds appids whose traffic is tagged with `X-Lb-K8s`;
//! - the ubitech list holds client IPs tagged with `X-Lb-Ubitech`.
//!
//! Lines starting with `#` are comments; blank lines are ignored.

use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ListsConfig;

#[derive(Debug, Error)]
#[error("failed to read list {}: {source}", .path.display())]
pub struct ListError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
}

/// Parse a list from any reader.
pub fn read_list<R: Read>(mut reader: R) -> std::io::Result<HashSet<String>> {
    let mut data = String::new();
    reader.read_to_string(&mut data)?;

    Ok(data
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn load_list(path: &Path) -> Result<HashSet<String>, ListError> {
    let file = fs::File::open(path).map_err(|source| ListError {
        path: path.to_path_buf(),
        source,
    })?;
    read_list(file).map_err(|source| ListError {
        path: path.to_path_buf(),
        source,
    })
}

/// The loaded lists, immutable after startup.
#[derive(Debug, Clone, Default)]
pub struct RedirectLists {
    k8s_appids: HashSet<String>,
    ubitech_ips: HashSet<String>,
}

impl RedirectLists {
    pub fn new(k8s_appids: HashSet<String>, ubitech_ips: HashSet<String>) -> Self {
        Self {
            k8s_appids,
            ubitech_ips,
        }
    }

    /// Load the files named in the config. Unset paths yield empty lists.
    pub fn load(config: &ListsConfig) -> Result<Self, ListError> {
        let k8s_appids = match &config.k8s_list_path {
            Some(path) => load_list(path)?,
            None => HashSet::new(),
        };
        let ubitech_ips = match &config.ubitech_list_path {
            Some(path) => load_list(path)?,
            None => HashSet::new(),
        };

        tracing::info!(
            k8s_appids = k8s_appids.len(),
            ubitech_ips = ubitech_ips.len(),
            "Redirect lists loaded"
        );
        Ok(Self::new(k8s_appids, ubitech_ips))
    }

    pub fn is_k8s_app(&self, appid: &str) -> bool {
        self.k8s_appids.contains(appid)
    }

    pub fn is_ubitech_ip(&self, ip: &str) -> bool {
        self.ubitech_ips.contains(ip)
    }
}
