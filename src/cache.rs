//! Phase-result cache: every artifact is addressed by host name plus phase
//! (and, for worker partials, a part name). The pipeline receives a cache
//! instead of looking at the working directory.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::canonical::{CanonicalGraph, Signature};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Subgraphs,
    Poset,
    Colorings,
    DownArrowSet,
    Ideals,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Subgraphs,
        Phase::Poset,
        Phase::Colorings,
        Phase::DownArrowSet,
        Phase::Ideals,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Subgraphs => "subgraphs",
            Phase::Poset => "poset",
            Phase::Colorings => "colorings",
            Phase::DownArrowSet => "down-arrow-set",
            Phase::Ideals => "ideals",
        }
    }

    pub fn from_name(name: &str) -> Option<Phase> {
        Phase::ALL.into_iter().find(|phase| phase.name() == name)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtifactKey {
    pub phase: Phase,
    pub part: Option<String>,
}

impl ArtifactKey {
    pub fn result(phase: Phase) -> Self {
        ArtifactKey { phase, part: None }
    }

    pub fn part(phase: Phase, part: impl Into<String>) -> Self {
        ArtifactKey {
            phase,
            part: Some(part.into()),
        }
    }

    pub fn is_part(&self) -> bool {
        self.part.is_some()
    }

    fn file_name(&self) -> String {
        match &self.part {
            None => format!("{}.json", self.phase),
            Some(part) => format!("{}.part.{}.json", self.phase, part),
        }
    }

    fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(".json")?;
        match stem.split_once(".part.") {
            Some((phase, part)) => Some(ArtifactKey::part(Phase::from_name(phase)?, part)),
            None => Some(ArtifactKey::result(Phase::from_name(stem)?)),
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.part {
            None => write!(f, "{}", self.phase),
            Some(part) => write!(f, "{}[{}]", self.phase, part),
        }
    }
}

pub trait PhaseCache: Send + Sync {
    fn get(&self, host: &str, key: &ArtifactKey) -> Result<Option<Vec<u8>>>;

    fn put(&self, host: &str, key: &ArtifactKey, bytes: &[u8]) -> Result<()>;

    fn remove(&self, host: &str, key: &ArtifactKey) -> Result<()>;

    /// All artifact keys currently stored for `host`, sorted.
    fn keys(&self, host: &str) -> Result<Vec<ArtifactKey>>;

    /// Hosts with at least one stored artifact, sorted.
    fn hosts(&self) -> Result<Vec<String>>;

    fn contains(&self, host: &str, key: &ArtifactKey) -> Result<bool> {
        Ok(self.get(host, key)?.is_some())
    }

    fn clear(&self, host: &str) -> Result<()> {
        for key in self.keys(host)? {
            self.remove(host, &key)?;
        }
        Ok(())
    }
}

pub fn load<T: DeserializeOwned>(
    cache: &dyn PhaseCache,
    host: &str,
    key: &ArtifactKey,
) -> Result<Option<T>> {
    match cache.get(host, key)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

pub fn store<T: Serialize>(
    cache: &dyn PhaseCache,
    host: &str,
    key: &ArtifactKey,
    value: &T,
) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    cache.put(host, key, &bytes)
}

/// Artifacts on disk under `<root>/<host>/`.
#[derive(Debug, Clone)]
pub struct FsCache {
    root: PathBuf,
}

impl FsCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsCache { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn host_dir(&self, host: &str) -> Result<PathBuf> {
        if host.is_empty() || host.contains(['/', '\\']) || host == "." || host == ".." {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("`{host}` cannot be used as a cache directory"),
            )));
        }
        Ok(self.root.join(host))
    }

    pub fn path_of(&self, host: &str, key: &ArtifactKey) -> Result<PathBuf> {
        Ok(self.host_dir(host)?.join(key.file_name()))
    }
}

impl PhaseCache for FsCache {
    fn get(&self, host: &str, key: &ArtifactKey) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_of(host, key)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, host: &str, key: &ArtifactKey, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(self.host_dir(host)?)?;
        let path = self.path_of(host, key)?;
        // A crash mid-write leaves only the temp file behind, never a torn artifact.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, host: &str, key: &ArtifactKey) -> Result<()> {
        match fs::remove_file(self.path_of(host, key)?) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn keys(&self, host: &str) -> Result<Vec<ArtifactKey>> {
        let entries = match fs::read_dir(self.host_dir(host)?) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut keys = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            if let Some(key) = name.to_str().and_then(ArtifactKey::from_file_name) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn hosts(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut hosts = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    hosts.push(name.to_string());
                }
            }
        }
        hosts.sort();
        Ok(hosts)
    }

    fn contains(&self, host: &str, key: &ArtifactKey) -> Result<bool> {
        Ok(self.path_of(host, key)?.is_file())
    }

    /// Removes every artifact, any temp file left by an interrupted write,
    /// and then the host directory itself once it is empty.
    fn clear(&self, host: &str) -> Result<()> {
        let dir = self.host_dir(host)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if ArtifactKey::from_file_name(name).is_some() || name.ends_with(".json.tmp") {
                fs::remove_file(entry.path())?;
            }
        }
        match fs::remove_dir(&dir) {
            Ok(()) => Ok(()),
            // Files the cache does not own stay, and so does their directory.
            Err(e) if e.kind() == io::ErrorKind::DirectoryNotEmpty => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process cache, for tests and for callers that do not want files.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<BTreeMap<(String, ArtifactKey), Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        MemoryCache::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<(String, ArtifactKey), Vec<u8>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PhaseCache for MemoryCache {
    fn get(&self, host: &str, key: &ArtifactKey) -> Result<Option<Vec<u8>>> {
        Ok(self.entries().get(&(host.to_string(), key.clone())).cloned())
    }

    fn put(&self, host: &str, key: &ArtifactKey, bytes: &[u8]) -> Result<()> {
        self.entries()
            .insert((host.to_string(), key.clone()), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, host: &str, key: &ArtifactKey) -> Result<()> {
        self.entries().remove(&(host.to_string(), key.clone()));
        Ok(())
    }

    fn keys(&self, host: &str) -> Result<Vec<ArtifactKey>> {
        Ok(self
            .entries()
            .keys()
            .filter(|(h, _)| h == host)
            .map(|(_, key)| key.clone())
            .collect())
    }

    fn hosts(&self) -> Result<Vec<String>> {
        let mut hosts: Vec<String> = self.entries().keys().map(|(h, _)| h.clone()).collect();
        hosts.dedup();
        Ok(hosts)
    }
}

/// One graph as stored in artifacts. Edges are 1-indexed, matching the
/// JSON graph files produced by the enumeration tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub signature: Signature,
    pub node_count: usize,
    pub edges: Vec<(usize, usize)>,
}

impl GraphRecord {
    pub fn from_canonical(graph: &CanonicalGraph) -> Self {
        GraphRecord {
            signature: graph.signature().clone(),
            node_count: graph.node_count(),
            edges: graph
                .dense()
                .edges()
                .into_iter()
                .map(|(u, v)| (u + 1, v + 1))
                .collect(),
        }
    }

    /// Decodes the signature and checks the recorded edges are its canonical labeling.
    pub fn to_canonical(&self) -> Result<CanonicalGraph> {
        let graph = CanonicalGraph::from_signature(&self.signature)?;
        if graph.node_count() != self.node_count || GraphRecord::from_canonical(&graph).edges != self.edges {
            return Err(Error::InvalidGraph6 {
                input: self.signature.to_string(),
                reason: "record does not match its signature".to_string(),
            });
        }
        Ok(graph)
    }
}
