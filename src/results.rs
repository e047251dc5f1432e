//! Result artifacts: what a finished translation produced and how to
//! load it.
//!
//! A completed job leaves up to four artifact kinds on the backend: the
//! translated text, an extracted-formulas text file, a translated XLSX
//! table and a set of page images. The listing ([`ResultSet`]) describes
//! what exists; loading is **per-kind independent** — one broken artifact
//! never hides the others. Fatal errors stop at the listing; everything
//! after it is contained in [`LoadedResults::errors`].
//!
//! Images are the exception to fetching: they are addressed, not
//! downloaded. [`ImageArtifact`] carries a ready-to-use URL so a UI can
//! point an `<img>` tag (or a browser) at the backend directly.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::backend::BackendApi;
use crate::error::ArtifactError;
use crate::progress::ProgressCallback;
use crate::workbook::{self, Workbook};

/// The artifact kinds a finished job can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Text,
    Formulas,
    Table,
    Images,
}

impl ArtifactKind {
    /// Every kind, in loading order.
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Text,
        ArtifactKind::Formulas,
        ArtifactKind::Table,
        ArtifactKind::Images,
    ];
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            ArtifactKind::Text => "text",
            ArtifactKind::Formulas => "formulas",
            ArtifactKind::Table => "table",
            ArtifactKind::Images => "images",
        })
    }
}

/// One artifact as the backend lists it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Server-side path, also the fetch key.
    pub path: String,
    pub filename: String,
    #[serde(rename = "size", default)]
    pub size_bytes: u64,
}

/// The result listing for a completed job. Absent kinds deserialize to
/// `None`/empty, so partial listings are ordinary data, not errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub text: Option<ArtifactRef>,
    #[serde(default)]
    pub formulas: Option<ArtifactRef>,
    #[serde(default)]
    pub table: Option<ArtifactRef>,
    #[serde(default)]
    pub images: Vec<ArtifactRef>,
}

impl ResultSet {
    /// Kinds present in this listing, in loading order.
    pub fn available_kinds(&self) -> Vec<ArtifactKind> {
        ArtifactKind::ALL
            .into_iter()
            .filter(|kind| self.contains(*kind))
            .collect()
    }

    pub fn contains(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::Text => self.text.is_some(),
            ArtifactKind::Formulas => self.formulas.is_some(),
            ArtifactKind::Table => self.table.is_some(),
            ArtifactKind::Images => !self.images.is_empty(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.available_kinds().is_empty()
    }
}

/// An image artifact with its display URL. Never fetched by this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageArtifact {
    pub reference: ArtifactRef,
    pub url: String,
}

/// The table artifact after a fetch: either a decoded [`Workbook`] or the
/// reason it would not decode. A corrupt workbook is a property of one
/// artifact, never a translation failure.
#[derive(Debug, Clone, PartialEq)]
pub enum TableOutcome {
    Decoded(Workbook),
    Undecodable {
        reference: ArtifactRef,
        reason: String,
    },
}

impl TableOutcome {
    pub fn workbook(&self) -> Option<&Workbook> {
        match self {
            TableOutcome::Decoded(workbook) => Some(workbook),
            TableOutcome::Undecodable { .. } => None,
        }
    }
}

/// One successfully loaded artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedArtifact {
    Text(String),
    Formulas(String),
    Table(TableOutcome),
    Images(Vec<ImageArtifact>),
}

impl LoadedArtifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            LoadedArtifact::Text(_) => ArtifactKind::Text,
            LoadedArtifact::Formulas(_) => ArtifactKind::Formulas,
            LoadedArtifact::Table(_) => ArtifactKind::Table,
            LoadedArtifact::Images(_) => ArtifactKind::Images,
        }
    }
}

/// Everything [`load_all`] could get its hands on, plus the listing it
/// worked from and the per-artifact failures it contained.
#[derive(Debug, Clone, Default)]
pub struct LoadedResults {
    pub listing: ResultSet,
    pub text: Option<String>,
    pub formulas: Option<String>,
    pub table: Option<TableOutcome>,
    pub images: Vec<ImageArtifact>,
    pub errors: Vec<ArtifactError>,
}

impl LoadedResults {
    /// How many kinds loaded successfully.
    pub fn loaded_count(&self) -> usize {
        usize::from(self.text.is_some())
            + usize::from(self.formulas.is_some())
            + usize::from(self.table.is_some())
            + usize::from(!self.images.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.loaded_count() == 0
    }
}

/// Load one artifact kind from a listing. `Ok(None)` means the listing
/// does not contain that kind.
pub async fn load_one(
    backend: &dyn BackendApi,
    base_url: &str,
    listing: &ResultSet,
    kind: ArtifactKind,
) -> Result<Option<LoadedArtifact>, ArtifactError> {
    Ok(load_kind(backend, base_url, listing, kind)
        .await?
        .map(|(artifact, _)| artifact))
}

/// Load every artifact the listing offers. Infallible by construction:
/// per-kind failures land in [`LoadedResults::errors`] and the rest keep
/// loading. Progress fires once per kind, loaded or failed.
pub async fn load_all(
    backend: &dyn BackendApi,
    base_url: &str,
    listing: &ResultSet,
    progress: Option<&ProgressCallback>,
) -> LoadedResults {
    let mut results = LoadedResults {
        listing: listing.clone(),
        ..LoadedResults::default()
    };

    for kind in ArtifactKind::ALL {
        match load_kind(backend, base_url, listing, kind).await {
            Ok(None) => {}
            Ok(Some((artifact, amount))) => {
                if let Some(progress) = progress {
                    progress.on_artifact_loaded(kind, amount);
                }
                match artifact {
                    LoadedArtifact::Text(text) => results.text = Some(text),
                    LoadedArtifact::Formulas(formulas) => results.formulas = Some(formulas),
                    LoadedArtifact::Table(outcome) => results.table = Some(outcome),
                    LoadedArtifact::Images(images) => results.images = images,
                }
            }
            Err(error) => {
                warn!(kind = %kind, error = %error, "artifact failed to load");
                if let Some(progress) = progress {
                    progress.on_artifact_failed(kind, error.to_string());
                }
                results.errors.push(error);
            }
        }
    }
    results
}

/// Shared loader: the artifact plus the amount reported to progress
/// (bytes fetched, or image count).
async fn load_kind(
    backend: &dyn BackendApi,
    base_url: &str,
    listing: &ResultSet,
    kind: ArtifactKind,
) -> Result<Option<(LoadedArtifact, usize)>, ArtifactError> {
    match kind {
        ArtifactKind::Text => match &listing.text {
            None => Ok(None),
            Some(reference) => {
                let text = fetch_text(backend, kind, reference).await?;
                let amount = text.len();
                Ok(Some((LoadedArtifact::Text(text), amount)))
            }
        },
        ArtifactKind::Formulas => match &listing.formulas {
            None => Ok(None),
            Some(reference) => {
                let formulas = fetch_text(backend, kind, reference).await?;
                let amount = formulas.len();
                Ok(Some((LoadedArtifact::Formulas(formulas), amount)))
            }
        },
        ArtifactKind::Table => match &listing.table {
            None => Ok(None),
            Some(reference) => {
                let bytes = fetch(backend, kind, reference).await?;
                let amount = bytes.len();
                let outcome = match workbook::decode(&bytes) {
                    Ok(workbook) => {
                        debug!(sheets = workbook.sheets.len(), "table artifact decoded");
                        TableOutcome::Decoded(workbook)
                    }
                    Err(error) => {
                        warn!(
                            filename = %reference.filename,
                            error = %error,
                            "table artifact would not decode, keeping raw reference"
                        );
                        TableOutcome::Undecodable {
                            reference: reference.clone(),
                            reason: error.to_string(),
                        }
                    }
                };
                Ok(Some((LoadedArtifact::Table(outcome), amount)))
            }
        },
        ArtifactKind::Images => {
            if listing.images.is_empty() {
                return Ok(None);
            }
            let images: Vec<ImageArtifact> = listing
                .images
                .iter()
                .map(|reference| ImageArtifact {
                    reference: reference.clone(),
                    url: artifact_url(base_url, &reference.path),
                })
                .collect();
            let amount = images.len();
            Ok(Some((LoadedArtifact::Images(images), amount)))
        }
    }
}

async fn fetch(
    backend: &dyn BackendApi,
    kind: ArtifactKind,
    reference: &ArtifactRef,
) -> Result<Vec<u8>, ArtifactError> {
    backend
        .fetch_bytes(&reference.path)
        .await
        .map_err(|error| ArtifactError::Fetch {
            kind,
            message: error.to_string(),
        })
}

async fn fetch_text(
    backend: &dyn BackendApi,
    kind: ArtifactKind,
    reference: &ArtifactRef,
) -> Result<String, ArtifactError> {
    let bytes = fetch(backend, kind, reference).await?;
    String::from_utf8(bytes).map_err(|_| ArtifactError::NotText {
        kind,
        path: reference.path.clone(),
    })
}

/// Join the backend base URL and a server-side artifact path.
pub fn artifact_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
