use std::{collections::HashMap, io, path::Path};

use serde::Deserialize;
use thiserror::Error;

use crate::{Error, Result};

/// One `tag,taxonomy_id` line of the mapping file.
#[derive(Debug, Deserialize)]
struct MappingRow {
    tag: String,
    taxonomy_id: String,
}

/// Returned by [`TaxonomyMap::resolve`] when the tag isn't mapped.
/// Carries every valid tag so the caller can correct the request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown tag: {tag}")]
pub struct UnknownTag {
    pub tag: String,
    pub available: Vec<String>,
}

/// Immutable tag -> taxonomy id lookup, built once at startup.
#[derive(Debug, Clone)]
pub struct TaxonomyMap {
    tags: HashMap<String, String>,
}

impl TaxonomyMap {
    /// Reads the mapping from a CSV file with a `tag,taxonomy_id` header.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: io::Read>(rdr: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(rdr);

        let mut tags = HashMap::new();
        for (idx, row) in reader.deserialize::<MappingRow>().enumerate() {
            let row = row?;
            // Header is line 1.
            let line = idx as u64 + 2;
            if row.tag.is_empty() {
                return Err(Error::EmptyColumn { column: "tag", line });
            }
            if row.taxonomy_id.is_empty() {
                return Err(Error::EmptyColumn {
                    column: "taxonomy_id",
                    line,
                });
            }
            if tags.contains_key(&row.tag) {
                return Err(Error::DuplicateTag(row.tag));
            }
            tags.insert(row.tag, row.taxonomy_id);
        }

        if tags.is_empty() {
            return Err(Error::MappingEmpty);
        }
        Ok(Self { tags })
    }

    /// Exact, case-sensitive lookup.
    pub fn resolve(&self, tag: &str) -> std::result::Result<&str, UnknownTag> {
        self.tags.get(tag).map(String::as_str).ok_or_else(|| UnknownTag {
            tag: tag.to_string(),
            available: self.available_tags(),
        })
    }

    /// All configured tags, sorted.
    pub fn available_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.tags.keys().cloned().collect();
        tags.sort_unstable();
        tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl FromIterator<(String, String)> for TaxonomyMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            tags: iter.into_iter().collect(),
        }
    }
}
