//! Release artifact records, the run inventory, and filter combinators.

use std::collections::BTreeSet;
use std::fs::File;
use std::io;
use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

/// Classification of a built release artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    UploadableArchive,
    UploadableBinary,
    LinuxPackage,
    Checksum,
    Signature,
}

/// One locally-built release artifact.
///
/// The publisher never mutates artifacts; it only opens their content and
/// reads size and bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub path: PathBuf,
    pub kind: ArtifactKind,
    /// Build identifier consulted by allow-list filtering.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub arch: String,
}

impl Artifact {
    /// Hex digest of the artifact's content.
    ///
    /// Supported algorithms: `sha224`, `sha256`, `sha384`, `sha512`.
    pub fn checksum(&self, algorithm: &str) -> Result<String> {
        let mut file = File::open(&self.path)
            .with_context(|| format!("failed to checksum {}", self.path.display()))?;
        let digest = match algorithm {
            "sha224" => hash::<Sha224>(&mut file),
            "sha256" => hash::<Sha256>(&mut file),
            "sha384" => hash::<Sha384>(&mut file),
            "sha512" => hash::<Sha512>(&mut file),
            other => bail!("invalid checksum algorithm: {other}"),
        };
        digest.with_context(|| format!("failed to checksum {}", self.path.display()))
    }
}

fn hash<D: Digest + io::Write>(file: &mut File) -> Result<String> {
    let mut digest = D::new();
    io::copy(file, &mut digest)?;
    Ok(hex::encode(digest.finalize()))
}

/// Predicate over artifacts, assembled from the combinators below.
pub type Filter = Box<dyn Fn(&Artifact) -> bool + Send + Sync>;

/// Matches artifacts of exactly this kind.
pub fn by_kind(kind: ArtifactKind) -> Filter {
    Box::new(move |artifact| artifact.kind == kind)
}

/// Matches artifacts whose id is in the allow-list.
pub fn by_ids<S: AsRef<str>>(ids: &[S]) -> Filter {
    let ids: BTreeSet<String> = ids.iter().map(|id| id.as_ref().to_string()).collect();
    Box::new(move |artifact| ids.contains(&artifact.id))
}

/// Matches artifacts satisfying both filters.
pub fn and(left: Filter, right: Filter) -> Filter {
    Box::new(move |artifact| left(artifact) && right(artifact))
}

/// Matches artifacts satisfying any of the filters; empty input matches
/// nothing.
pub fn or(filters: Vec<Filter>) -> Filter {
    Box::new(move |artifact| filters.iter().any(|filter| filter(artifact)))
}

/// Append-only inventory of the artifacts built by a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifacts {
    items: Vec<Artifact>,
}

impl Artifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, artifact: Artifact) {
        self.items.push(artifact);
    }

    pub fn list(&self) -> &[Artifact] {
        &self.items
    }

    /// Artifacts matching the filter, in insertion order.
    pub fn filtered(&self, filter: &Filter) -> Vec<&Artifact> {
        self.items.iter().filter(|artifact| filter(artifact)).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
