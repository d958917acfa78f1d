use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use super::loader::{self, Format};
use super::model::Table;
use super::schema::{DatasetSchema, Variant};
use crate::error::Result;

/// SHA-256 of a file's bytes.
pub type ContentDigest = [u8; 32];

pub fn content_digest(bytes: &[u8]) -> ContentDigest {
    Sha256::digest(bytes).into()
}

/// Loaded tables keyed by content digest and dataset variant.
///
/// Two files with the same name but different bytes never share an entry;
/// the same bytes under another name do.
#[derive(Debug, Default)]
pub struct LoadCache {
    entries: HashMap<(ContentDigest, Variant), Arc<Table>>,
}

impl LoadCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_bytes(
        &mut self,
        bytes: &[u8],
        format: Format,
        schema: &DatasetSchema,
    ) -> Result<Arc<Table>> {
        let key = (content_digest(bytes), schema.variant);
        if let Some(table) = self.entries.get(&key) {
            log::debug!("load cache hit ({} rows)", table.len());
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(loader::load_bytes(bytes, format, schema)?);
        self.entries.insert(key, Arc::clone(&table));
        Ok(table)
    }

    pub fn load_file(&mut self, path: &Path, schema: &DatasetSchema) -> Result<Arc<Table>> {
        let format = Format::from_path(path)?;
        let bytes = std::fs::read(path)?;
        self.load_bytes(&bytes, format, schema)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
