use std::{fs, io::ErrorKind, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{
    models::{Bundle, Pair, Token},
    store::{MemoryStore, ReferenceStore},
};

/// Serialized state of one deployment: every entity plus the replay
/// checkpoint. Entities are sorted by id so the file diffs cleanly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub network: String,
    /// Last block whose logs are fully applied
    #[serde(default)]
    pub last_block: Option<u64>,
    #[serde(default)]
    pub bundle: Option<Bundle>,
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub pairs: Vec<Pair>,
}

impl Snapshot {
    pub fn from_store(network: &str, last_block: Option<u64>, store: &MemoryStore) -> Self {
        let mut tokens: Vec<Token> = store.tokens().cloned().collect();
        tokens.sort_by(|a, b| a.id.cmp(&b.id));

        let mut pairs: Vec<Pair> = store.pairs().cloned().collect();
        pairs.sort_by(|a, b| a.id.cmp(&b.id));

        Self {
            network: network.to_string(),
            last_block,
            bundle: store.load_bundle(),
            tokens,
            pairs,
        }
    }

    pub fn into_store(self) -> MemoryStore {
        let mut store = MemoryStore::new();
        for token in self.tokens {
            store.save_token(token);
        }
        for pair in self.pairs {
            store.save_pair(pair);
        }
        if let Some(bundle) = self.bundle {
            store.save_bundle(bundle);
        }
        store
    }

    /// Read a snapshot file. A missing file is `Ok(None)`.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            },
        };

        let snapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;

        Ok(Some(snapshot))
    }

    /// Write through a temp file and rename so a crash never leaves a
    /// truncated snapshot behind.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let tmp = path.with_extension("json.tmp");

        let content = serde_json::to_vec_pretty(self).context("Failed to serialize snapshot")?;
        fs::write(&tmp, content).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to move snapshot into {}", path.display()))?;

        Ok(())
    }
}
