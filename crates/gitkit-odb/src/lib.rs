//! Object locator: a unified view over loose and packed object storage.
//!
//! `locate`/`read` check loose storage first, then each loaded pack
//! (newest first); a hash present in both resolves to the loose copy,
//! matching how a partial-fetch-then-GC repository behaves (§4.1).
//!
//! Non-goals: writing objects (mutations are delegated to the `git`
//! binary, see the repository facade) and alternate object databases /
//! abbreviated-hash resolution (no SPEC_FULL.md caller needs either).

mod search;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use gitkit_hash::ObjectId;
use gitkit_loose::LooseObjectStore;
use gitkit_object::cache::ObjectCache;
use gitkit_object::{Object, ObjectType};
use gitkit_pack::pack::PackFile;

pub use error::OdbError;

mod error {
    use gitkit_hash::ObjectId;

    #[derive(Debug, thiserror::Error)]
    pub enum OdbError {
        #[error("object not found: {0}")]
        NotFound(ObjectId),

        #[error("corrupt object {oid}: {reason}")]
        Corrupt { oid: ObjectId, reason: String },

        #[error(transparent)]
        Loose(#[from] gitkit_loose::LooseError),

        #[error(transparent)]
        Pack(#[from] gitkit_pack::PackError),

        #[error(transparent)]
        Io(#[from] std::io::Error),
    }
}

/// Lightweight object info (header only, no content).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub obj_type: ObjectType,
    pub size: usize,
}

/// Unified object database: loose store plus every discovered pack.
pub struct ObjectDatabase {
    loose: LooseObjectStore,
    /// Pack files, newest first (protected by RwLock so `refresh` can swap
    /// the list after a repack without invalidating live readers).
    packs: RwLock<Vec<PackFile>>,
    cache: Mutex<ObjectCache>,
    objects_dir: PathBuf,
}

impl ObjectDatabase {
    /// Open the object database at the given objects directory.
    pub fn open(objects_dir: impl AsRef<Path>) -> Result<Self, OdbError> {
        let objects_dir = objects_dir.as_ref().to_path_buf();
        let loose = LooseObjectStore::open(&objects_dir);
        let packs = Self::discover_packs(&objects_dir)?;

        Ok(Self {
            loose,
            packs: RwLock::new(packs),
            cache: Mutex::new(ObjectCache::new(1024)),
            objects_dir,
        })
    }

    /// Read an object by OID (searches loose, then packs).
    pub fn read(&self, oid: &ObjectId) -> Result<Option<Object>, OdbError> {
        search::find_object(self, oid)
    }

    /// Read an object with caching.
    pub fn read_cached(&self, oid: &ObjectId) -> Result<Option<Object>, OdbError> {
        {
            let mut cache = self.cache.lock().unwrap();
            if let Some(obj) = cache.get(oid) {
                return Ok(Some(obj.clone()));
            }
        }

        let obj = self.read(oid)?;

        if let Some(ref obj) = obj {
            let mut cache = self.cache.lock().unwrap();
            cache.insert(*oid, obj.clone());
        }

        Ok(obj)
    }

    /// Read just the header (type + size) without full content.
    pub fn read_header(&self, oid: &ObjectId) -> Result<Option<ObjectInfo>, OdbError> {
        search::find_header(self, oid)
    }

    /// Check if an object exists (fast, no decompression for packed objects).
    pub fn contains(&self, oid: &ObjectId) -> bool {
        search::object_exists(self, oid)
    }

    /// Refresh the list of pack files (call after gc/repack).
    pub fn refresh(&self) -> Result<(), OdbError> {
        let new_packs = Self::discover_packs(&self.objects_dir)?;
        let mut packs = self.packs.write().unwrap();
        *packs = new_packs;
        Ok(())
    }

    /// Iterate over all known object OIDs.
    pub fn iter_all_oids(
        &self,
    ) -> Result<Box<dyn Iterator<Item = Result<ObjectId, OdbError>> + '_>, OdbError> {
        let loose_iter = self.loose.iter()?.map(|r| r.map_err(OdbError::from));

        let packs = self.packs.read().unwrap();
        let mut pack_oids: Vec<Result<ObjectId, OdbError>> = Vec::new();
        for pack in packs.iter() {
            for (oid, _offset) in pack.index().iter() {
                pack_oids.push(Ok(oid));
            }
        }

        Ok(Box::new(loose_iter.chain(pack_oids)))
    }

    /// Get the path to the objects directory.
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    /// Discover pack files in the objects/pack directory, newest first
    /// (matches C git's preference for recently written packs).
    fn discover_packs(objects_dir: &Path) -> Result<Vec<PackFile>, OdbError> {
        let pack_dir = objects_dir.join("pack");
        if !pack_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut packs = Vec::new();
        let mut entries: Vec<_> = std::fs::read_dir(&pack_dir)?
            .filter_map(|e| e.ok())
            .collect();

        entries.sort_by(|a, b| {
            let a_time = a.metadata().and_then(|m| m.modified()).ok();
            let b_time = b.metadata().and_then(|m| m.modified()).ok();
            b_time.cmp(&a_time)
        });

        for entry in entries {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "pack") {
                match PackFile::open(&path) {
                    Ok(pack) => packs.push(pack),
                    Err(_) => continue,
                }
            }
        }

        Ok(packs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_loose_blob(objects_dir: &Path, content: &[u8]) -> ObjectId {
        let oid = gitkit_hash::hasher::Hasher::hash_object("blob", content).unwrap();
        let path = objects_dir.join(oid.loose_path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut encoder =
            flate2::write::ZlibEncoder::new(std::fs::File::create(&path).unwrap(), flate2::Compression::default());
        encoder
            .write_all(format!("blob {}\0", content.len()).as_bytes())
            .unwrap();
        encoder.write_all(content).unwrap();
        encoder.finish().unwrap();
        oid
    }

    #[test]
    fn missing_object_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let odb = ObjectDatabase::open(dir.path()).unwrap();
        let oid = ObjectId::from_hex("da39a3ee5e6b4b0d3255bfef95601890afd80709").unwrap();
        assert!(odb.read(&oid).unwrap().is_none());
        assert!(!odb.contains(&oid));
    }

    #[test]
    fn reads_loose_object() {
        let dir = tempfile::tempdir().unwrap();
        let oid = write_loose_blob(dir.path(), b"hello\n");

        let odb = ObjectDatabase::open(dir.path()).unwrap();
        assert!(odb.contains(&oid));
        let obj = odb.read(&oid).unwrap().unwrap();
        assert_eq!(obj.object_type(), ObjectType::Blob);
        assert_eq!(obj.serialize_content(), b"hello\n");

        let info = odb.read_header(&oid).unwrap().unwrap();
        assert_eq!(info.obj_type, ObjectType::Blob);
        assert_eq!(info.size, 6);
    }

    #[test]
    fn read_cached_returns_same_content_on_second_call() {
        let dir = tempfile::tempdir().unwrap();
        let oid = write_loose_blob(dir.path(), b"cached content\n");

        let odb = ObjectDatabase::open(dir.path()).unwrap();
        let first = odb.read_cached(&oid).unwrap().unwrap();
        let second = odb.read_cached(&oid).unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn no_pack_directory_yields_empty_pack_list() {
        let dir = tempfile::tempdir().unwrap();
        let odb = ObjectDatabase::open(dir.path()).unwrap();
        assert_eq!(odb.packs.read().unwrap().len(), 0);
    }
}
