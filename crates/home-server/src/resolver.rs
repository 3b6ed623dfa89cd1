//! Note-graph resolver: find a note by display name, one hop from a set of roots.
//!
//! Resolution scans every stored note on each request, so a lookup costs
//! O(number of stored notes). No index is kept between requests.

use std::collections::BTreeSet;

use md_links::extract_absolute_targets;
use note_fs::{NoteMeta, ensure_note_suffix, is_image, validate_identifier};

use crate::store::{FileStore, StoreError, StoredFile};

/// Errors that can occur while resolving a note.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No reachable note carries the requested display name
    #[error("no note named '{name}' is reachable from the given roots")]
    NotFound { name: String },
    /// A root could not be read; the whole request fails
    #[error("root '{root}' could not be read: {source}")]
    RootUnreadable {
        root: String,
        #[source]
        source: StoreError,
    },
    /// A root has no parseable metadata block
    #[error("root '{root}' has no valid metadata block")]
    RootMalformed { root: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Split an `among` parameter into root identifiers.
///
/// Roots are separated by commas or slashes; blanks are dropped.
pub fn parse_roots(among: &str) -> Vec<String> {
    among
        .split([',', '/'])
        .map(str::trim)
        .filter(|root| !root.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolve `name` to a stored note.
///
/// A direct identifier hit wins. Otherwise the note must be one of the roots
/// or a direct link target of one, and its display name must equal `name`
/// exactly. Several matches resolve to the smallest identifier.
pub async fn resolve<S: AsRef<str>>(
    store: &FileStore,
    name: &str,
    roots: &[S],
) -> Result<StoredFile, ResolveError> {
    if let Some(file) = direct_fetch(store, name).await? {
        tracing::debug!("Resolved '{}' directly to {}", name, file.id);
        return Ok(file);
    }

    let reachable = reachability_set(store, roots).await?;
    tracing::debug!(
        "Searching for '{}' among {} reachable names/identifiers",
        name,
        reachable.len()
    );

    let mut best: Option<StoredFile> = None;
    for id in store.list_notes().await? {
        let file = match store.read_public(&id).await {
            Ok(file) => file,
            Err(e) => {
                tracing::debug!("Skipping {} during scan: {}", id, e);
                continue;
            }
        };
        let Some(meta) = file.text().and_then(NoteMeta::parse) else {
            tracing::debug!("Skipping {}: no valid metadata block", id);
            continue;
        };

        let in_scope = reachable.contains(&id) || reachable.contains(&meta.name);
        if !in_scope || meta.name != name {
            continue;
        }

        if best.as_ref().is_none_or(|current| id < current.id) {
            best = Some(file);
        }
    }

    best.ok_or_else(|| ResolveError::NotFound {
        name: name.to_string(),
    })
}

/// Try `name` as a file identifier before searching the graph.
///
/// Images are fetched as named; anything else is read as a note, so "v1.2"
/// looks up "v1.2.md" and "secret.pdf" is never served without the ACL. Names that are
/// not valid identifiers (display names may contain slashes) simply fall
/// through to the search.
async fn direct_fetch(store: &FileStore, name: &str) -> Result<Option<StoredFile>, StoreError> {
    let Ok(clean) = validate_identifier(name) else {
        return Ok(None);
    };
    let id = if is_image(clean) {
        clean.to_string()
    } else {
        ensure_note_suffix(clean)
    };

    match store.read_public(&id).await {
        Ok(file) => Ok(Some(file)),
        Err(StoreError::NotFound { .. } | StoreError::Denied { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Build the set of display names and identifiers one hop from `roots`.
///
/// Each root contributes its own display name and the identifiers of every
/// absolute-style link in its body. Links inside those targets are not
/// followed.
pub async fn reachability_set<S: AsRef<str>>(
    store: &FileStore,
    roots: &[S],
) -> Result<BTreeSet<String>, ResolveError> {
    let mut reachable = BTreeSet::new();

    for root in roots {
        let root_id = ensure_note_suffix(root.as_ref());
        let file = store
            .read_public(&root_id)
            .await
            .map_err(|source| ResolveError::RootUnreadable {
                root: root_id.clone(),
                source,
            })?;
        let meta = file
            .text()
            .and_then(NoteMeta::parse)
            .ok_or_else(|| ResolveError::RootMalformed {
                root: root_id.clone(),
            })?;

        reachable.insert(meta.name.clone());
        reachable.extend(
            extract_absolute_targets(meta.body)
                .iter()
                .map(|target| ensure_note_suffix(target)),
        );
    }

    Ok(reachable)
}
