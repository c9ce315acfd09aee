use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use lrc_common::{CodeState, Error, FileName, Result, StripeId};
use parking_lot::RwLock;

use crate::model::{FileMeta, MetaUpdate, StripeMeta};

#[derive(Default)]
struct Tables {
    files: HashMap<FileName, FileMeta>,
    stripes: HashMap<StripeId, StripeMeta>,
}

/// A point-in-time dump of every file and stripe, for a CLI or daemon to
/// persist across process restarts (the coordinator itself holds no
/// on-disk state of its own).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MetaSnapshot {
    pub files: Vec<FileMeta>,
    pub stripes: Vec<StripeMeta>,
}

/// In-memory file/stripe/block graph, guarded by a single `RwLock`. Reads
/// take a consistent snapshot at the start of a kernel routine; writes only
/// occur through [`MetaStore::apply`], called once per stripe operation
/// after every ack has arrived.
pub struct MetaStore {
    tables: RwLock<Tables>,
}

impl MetaStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Rebuild a store from a previously exported snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: MetaSnapshot) -> Self {
        let store = Self::new();
        let mut tables = store.tables.write();
        for stripe in snapshot.stripes {
            tables.stripes.insert(stripe.id.clone(), stripe);
        }
        for file in snapshot.files {
            tables.files.insert(file.name.clone(), file);
        }
        drop(tables);
        store
    }

    /// Dump every file and stripe currently held.
    #[must_use]
    pub fn snapshot(&self) -> MetaSnapshot {
        let tables = self.tables.read();
        MetaSnapshot {
            files: tables.files.values().cloned().collect(),
            stripes: tables.stripes.values().cloned().collect(),
        }
    }

    pub fn snapshot_file(&self, name: &FileName) -> Result<FileMeta> {
        self.tables
            .read()
            .files
            .get(name)
            .cloned()
            .ok_or_else(|| Error::FileNotFound(name.to_string()))
    }

    pub fn snapshot_stripe(&self, id: &StripeId) -> Result<StripeMeta> {
        self.tables
            .read()
            .stripes
            .get(id)
            .cloned()
            .ok_or_else(|| Error::StripeNotFound(id.to_string()))
    }

    pub fn snapshot_stripes(&self, file: &FileName) -> Result<Vec<StripeMeta>> {
        let file_meta = self.snapshot_file(file)?;
        let tables = self.tables.read();
        file_meta
            .stripes
            .iter()
            .map(|id| {
                tables
                    .stripes
                    .get(id)
                    .cloned()
                    .ok_or_else(|| Error::StripeNotFound(id.to_string()))
            })
            .collect()
    }

    /// Apply an update record produced by a completed kernel routine. This
    /// is the only mutation path into the store.
    pub fn apply(&self, update: MetaUpdate) -> Result<()> {
        let mut tables = self.tables.write();
        match update {
            MetaUpdate::CreateFile { file, stripes } => {
                for stripe in stripes {
                    tables.stripes.insert(stripe.id.clone(), stripe);
                }
                tables.files.insert(file.name.clone(), file);
            }
            MetaUpdate::FlipCold { stripe_id } => {
                let stripe = tables
                    .stripes
                    .get_mut(&stripe_id)
                    .ok_or_else(|| Error::StripeNotFound(stripe_id.to_string()))?;
                stripe.state = CodeState::Cold;
                let file_name = stripe_id.file.clone();
                flip_file_if_all_match(&mut tables, &file_name, CodeState::Cold)?;
            }
            MetaUpdate::FlipHot { stripe_id } => {
                let stripe = tables
                    .stripes
                    .get_mut(&stripe_id)
                    .ok_or_else(|| Error::StripeNotFound(stripe_id.to_string()))?;
                stripe.state = CodeState::Hot;
                let file_name = stripe_id.file.clone();
                flip_file_if_all_match(&mut tables, &file_name, CodeState::Hot)?;
            }
        }
        Ok(())
    }
}

impl Default for MetaStore {
    fn default() -> Self {
        Self::new()
    }
}

fn flip_file_if_all_match(tables: &mut Tables, file_name: &FileName, target: CodeState) -> Result<()> {
    let stripe_ids = tables
        .files
        .get(file_name)
        .ok_or_else(|| Error::FileNotFound(file_name.to_string()))?
        .stripes
        .clone();
    let all_match = stripe_ids.iter().all(|id| {
        tables
            .stripes
            .get(id)
            .is_some_and(|s| matches!((s.state, target), (CodeState::Hot, CodeState::Hot) | (CodeState::Cold, CodeState::Cold)))
    });
    if all_match {
        if let Some(file) = tables.files.get_mut(file_name) {
            file.hot = matches!(target, CodeState::Hot);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lrc_common::{BlockSeq, NodeId, StripeSeq};

    fn stripe(file: FileName, seq: u16) -> StripeMeta {
        let id = StripeId::new(file, StripeSeq::new(seq).unwrap());
        StripeMeta::new(id, vec![NodeId::new([10, 0, 0, 1]); 6])
    }

    #[test]
    fn create_then_snapshot() {
        let store = MetaStore::new();
        let file = FileName::new("abcdef").unwrap();
        let s = stripe(file.clone(), 0);
        let stripe_id = s.id.clone();
        store
            .apply(MetaUpdate::CreateFile {
                file: FileMeta::new(file.clone(), 4096, 0),
                stripes: vec![s],
            })
            .unwrap();

        assert!(store.snapshot_file(&file).is_ok());
        assert!(store.snapshot_stripe(&stripe_id).is_ok());
    }

    #[test]
    fn flip_cold_updates_file_when_all_stripes_cold() {
        let store = MetaStore::new();
        let file = FileName::new("abcdef").unwrap();
        let s = stripe(file.clone(), 0);
        let stripe_id = s.id.clone();
        store
            .apply(MetaUpdate::CreateFile {
                file: FileMeta::new(file.clone(), 4096, 0),
                stripes: vec![s],
            })
            .unwrap();

        store.apply(MetaUpdate::FlipCold { stripe_id }).unwrap();
        assert!(!store.snapshot_file(&file).unwrap().hot);
    }

    #[test]
    fn missing_file_is_reported() {
        let store = MetaStore::new();
        let err = store
            .snapshot_file(&FileName::new("zzzzzz").unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }
}
