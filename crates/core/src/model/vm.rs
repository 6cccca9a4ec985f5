//! Virtual memory: the arena that owns all composite object storage.
//!
//! Arrays, strings and dictionaries live in indexed stores; objects hold
//! handles. `checkpoint` copies the stores wholesale (handles keep their
//! ids), so `rollback` is a plain swap-back: mutations performed after the
//! checkpoint disappear, aliases made before it survive, and cycles need no
//! special treatment. Handles allocated after a checkpoint dangle once it is
//! restored; the accessors report that as a VMerror instead of panicking.

use crate::error::PsError;
use crate::model::object::{ArrayRef, DictRef, PsObject, SaveRef, StringRef};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

/// Storage slot for one array.
#[derive(Debug, Clone, Default)]
pub struct ArrayStorage {
    pub items: Vec<PsObject>,
    pub read_only: bool,
}

/// Storage slot for one string.
#[derive(Debug, Clone, Default)]
pub struct StringStorage {
    pub bytes: Vec<u8>,
    pub read_only: bool,
}

/// Storage slot for one dictionary.
#[derive(Debug, Clone, Default)]
pub struct DictStorage {
    pub map: FxHashMap<SmolStr, PsObject>,
    pub read_only: bool,
}

#[derive(Debug, Clone, Default)]
struct Stores {
    arrays: Vec<ArrayStorage>,
    strings: Vec<StringStorage>,
    dicts: Vec<DictStorage>,
}

/// Identity key of a composite's backing storage, used by [`Vm::deep_clone`]
/// to preserve shared-structure topology and terminate on cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloneKey {
    Array(usize),
    String(usize),
    Dict(usize),
}

/// Source-identity to clone-identity mapping threaded through a deep clone.
pub type CloneMap = FxHashMap<CloneKey, usize>;

/// The virtual memory manager.
#[derive(Debug, Default)]
pub struct Vm {
    stores: Stores,
    snapshots: Vec<Option<Stores>>,
}

impl Vm {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------

    /// Allocates a new array; the returned handle views the whole storage.
    pub fn alloc_array(&mut self, items: Vec<PsObject>) -> ArrayRef {
        let id = self.stores.arrays.len();
        let len = items.len();
        self.stores.arrays.push(ArrayStorage {
            items,
            read_only: false,
        });
        ArrayRef {
            id,
            start: 0,
            len,
            literal: true,
        }
    }

    pub fn alloc_string(&mut self, bytes: Vec<u8>) -> StringRef {
        let id = self.stores.strings.len();
        let len = bytes.len();
        self.stores.strings.push(StringStorage {
            bytes,
            read_only: false,
        });
        StringRef { id, start: 0, len }
    }

    pub fn alloc_dict(&mut self) -> DictRef {
        let id = self.stores.dicts.len();
        self.stores.dicts.push(DictStorage::default());
        DictRef { id }
    }

    // ------------------------------------------------------------------
    // Array access
    // ------------------------------------------------------------------

    fn array_storage(&self, id: usize) -> Result<&ArrayStorage, PsError> {
        self.stores
            .arrays
            .get(id)
            .ok_or_else(|| PsError::VmError("stale array handle".into()))
    }

    fn array_storage_mut(&mut self, id: usize) -> Result<&mut ArrayStorage, PsError> {
        self.stores
            .arrays
            .get_mut(id)
            .ok_or_else(|| PsError::VmError("stale array handle".into()))
    }

    /// The elements viewed by an array handle.
    pub fn array(&self, r: ArrayRef) -> Result<&[PsObject], PsError> {
        let storage = self.array_storage(r.id)?;
        storage
            .items
            .get(r.start..r.start + r.len)
            .ok_or_else(|| PsError::VmError("array view out of bounds".into()))
    }

    pub fn array_get(&self, r: ArrayRef, index: usize) -> Result<PsObject, PsError> {
        if index >= r.len {
            return Err(PsError::RangeCheck);
        }
        Ok(self.array(r)?[index].clone())
    }

    pub fn array_put(&mut self, r: ArrayRef, index: usize, value: PsObject) -> Result<(), PsError> {
        if index >= r.len {
            return Err(PsError::RangeCheck);
        }
        let storage = self.array_storage_mut(r.id)?;
        if storage.read_only {
            return Err(PsError::InvalidAccess);
        }
        storage.items[r.start + index] = value;
        Ok(())
    }

    pub fn array_set_read_only(&mut self, r: ArrayRef) -> Result<(), PsError> {
        self.array_storage_mut(r.id)?.read_only = true;
        Ok(())
    }

    pub fn array_is_writable(&self, r: ArrayRef) -> Result<bool, PsError> {
        Ok(!self.array_storage(r.id)?.read_only)
    }

    // ------------------------------------------------------------------
    // String access
    // ------------------------------------------------------------------

    fn string_storage(&self, id: usize) -> Result<&StringStorage, PsError> {
        self.stores
            .strings
            .get(id)
            .ok_or_else(|| PsError::VmError("stale string handle".into()))
    }

    fn string_storage_mut(&mut self, id: usize) -> Result<&mut StringStorage, PsError> {
        self.stores
            .strings
            .get_mut(id)
            .ok_or_else(|| PsError::VmError("stale string handle".into()))
    }

    /// The bytes viewed by a string handle.
    pub fn string(&self, r: StringRef) -> Result<&[u8], PsError> {
        let storage = self.string_storage(r.id)?;
        storage
            .bytes
            .get(r.start..r.start + r.len)
            .ok_or_else(|| PsError::VmError("string view out of bounds".into()))
    }

    pub fn string_get(&self, r: StringRef, index: usize) -> Result<u8, PsError> {
        if index >= r.len {
            return Err(PsError::RangeCheck);
        }
        Ok(self.string(r)?[index])
    }

    pub fn string_put(&mut self, r: StringRef, index: usize, byte: u8) -> Result<(), PsError> {
        if index >= r.len {
            return Err(PsError::RangeCheck);
        }
        let storage = self.string_storage_mut(r.id)?;
        if storage.read_only {
            return Err(PsError::InvalidAccess);
        }
        storage.bytes[r.start + index] = byte;
        Ok(())
    }

    pub fn string_set_read_only(&mut self, r: StringRef) -> Result<(), PsError> {
        self.string_storage_mut(r.id)?.read_only = true;
        Ok(())
    }

    pub fn string_is_writable(&self, r: StringRef) -> Result<bool, PsError> {
        Ok(!self.string_storage(r.id)?.read_only)
    }

    // ------------------------------------------------------------------
    // Dictionary access
    // ------------------------------------------------------------------

    fn dict_storage(&self, r: DictRef) -> Result<&DictStorage, PsError> {
        self.stores
            .dicts
            .get(r.id)
            .ok_or_else(|| PsError::VmError("stale dict handle".into()))
    }

    fn dict_storage_mut(&mut self, r: DictRef) -> Result<&mut DictStorage, PsError> {
        self.stores
            .dicts
            .get_mut(r.id)
            .ok_or_else(|| PsError::VmError("stale dict handle".into()))
    }

    pub fn dict_get(&self, r: DictRef, key: &str) -> Result<Option<PsObject>, PsError> {
        Ok(self.dict_storage(r)?.map.get(key).cloned())
    }

    pub fn dict_put(&mut self, r: DictRef, key: SmolStr, value: PsObject) -> Result<(), PsError> {
        let storage = self.dict_storage_mut(r)?;
        if storage.read_only {
            return Err(PsError::InvalidAccess);
        }
        storage.map.insert(key, value);
        Ok(())
    }

    /// Unconditional insert, bypassing the access flag. Interpreter setup
    /// uses this to populate systemdict before sealing it.
    pub fn dict_put_unchecked(
        &mut self,
        r: DictRef,
        key: SmolStr,
        value: PsObject,
    ) -> Result<(), PsError> {
        self.dict_storage_mut(r)?.map.insert(key, value);
        Ok(())
    }

    pub fn dict_contains(&self, r: DictRef, key: &str) -> Result<bool, PsError> {
        Ok(self.dict_storage(r)?.map.contains_key(key))
    }

    pub fn dict_len(&self, r: DictRef) -> Result<usize, PsError> {
        Ok(self.dict_storage(r)?.map.len())
    }

    /// All entries of a dictionary, cloned out of the storage.
    pub fn dict_entries(&self, r: DictRef) -> Result<Vec<(SmolStr, PsObject)>, PsError> {
        Ok(self
            .dict_storage(r)?
            .map
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    pub fn dict_set_read_only(&mut self, r: DictRef) -> Result<(), PsError> {
        self.dict_storage_mut(r)?.read_only = true;
        Ok(())
    }

    pub fn dict_is_writable(&self, r: DictRef) -> Result<bool, PsError> {
        Ok(!self.dict_storage(r)?.read_only)
    }

    /// Converts an object to the textual form used as a dictionary key.
    pub fn dict_key(&self, obj: &PsObject) -> Result<SmolStr, PsError> {
        match obj {
            PsObject::Name(n) => Ok(n.name.clone()),
            PsObject::String(r) => {
                let bytes = self.string(*r)?;
                Ok(SmolStr::from(String::from_utf8_lossy(bytes)))
            }
            PsObject::Integer(n) => Ok(SmolStr::from(n.to_string())),
            PsObject::Real(r) => Ok(SmolStr::from(r.to_string())),
            PsObject::Boolean(b) => Ok(SmolStr::new_static(if *b { "true" } else { "false" })),
            _ => Err(PsError::TypeCheck),
        }
    }

    // ------------------------------------------------------------------
    // Checkpoints
    // ------------------------------------------------------------------

    /// Creates a full checkpoint of composite storage.
    pub fn checkpoint(&mut self) -> SaveRef {
        let id = self.snapshots.len();
        self.snapshots.push(Some(self.stores.clone()));
        SaveRef { id }
    }

    /// Rolls composite storage back to a checkpoint. Checkpoints taken after
    /// it become stale, as does the checkpoint itself: a save object can be
    /// restored at most once.
    pub fn rollback(&mut self, save: SaveRef) -> Result<(), PsError> {
        let slot = self
            .snapshots
            .get_mut(save.id)
            .ok_or(PsError::InvalidRestore)?;
        let stores = slot.take().ok_or(PsError::InvalidRestore)?;
        self.stores = stores;
        self.snapshots.truncate(save.id);
        Ok(())
    }

    /// Nesting depth of live checkpoints.
    pub fn save_level(&self) -> usize {
        self.snapshots.iter().filter(|s| s.is_some()).count()
    }

    /// Rough count of allocated composite cells, for `vmstatus`.
    pub fn used(&self) -> usize {
        let arrays: usize = self.stores.arrays.iter().map(|a| a.items.len()).sum();
        let strings: usize = self.stores.strings.iter().map(|s| s.bytes.len()).sum();
        let dicts: usize = self.stores.dicts.iter().map(|d| d.map.len()).sum();
        arrays + strings + dicts
    }

    // ------------------------------------------------------------------
    // Deep clone
    // ------------------------------------------------------------------

    /// Clones an object graph. Composite storage is duplicated once per
    /// source identity: the clone map is consulted before recursing, so
    /// aliases stay aliases in the clone and cyclic graphs terminate.
    pub fn deep_clone(&mut self, obj: &PsObject, map: &mut CloneMap) -> Result<PsObject, PsError> {
        match obj {
            PsObject::Array(r) => {
                let id = match map.get(&CloneKey::Array(r.id)) {
                    Some(&id) => id,
                    None => {
                        let id = self.stores.arrays.len();
                        // Placeholder first, so cyclic references resolve to
                        // the slot being built.
                        self.stores.arrays.push(ArrayStorage::default());
                        map.insert(CloneKey::Array(r.id), id);
                        let source = self.array_storage(r.id)?.clone();
                        let mut items = Vec::with_capacity(source.items.len());
                        for item in &source.items {
                            items.push(self.deep_clone(item, map)?);
                        }
                        self.stores.arrays[id] = ArrayStorage {
                            items,
                            read_only: source.read_only,
                        };
                        id
                    }
                };
                Ok(PsObject::Array(ArrayRef { id, ..*r }))
            }
            PsObject::String(r) => {
                let id = match map.get(&CloneKey::String(r.id)) {
                    Some(&id) => id,
                    None => {
                        let id = self.stores.strings.len();
                        let source = self.string_storage(r.id)?.clone();
                        self.stores.strings.push(source);
                        map.insert(CloneKey::String(r.id), id);
                        id
                    }
                };
                Ok(PsObject::String(StringRef { id, ..*r }))
            }
            PsObject::Dict(r) => {
                let id = match map.get(&CloneKey::Dict(r.id)) {
                    Some(&id) => id,
                    None => {
                        let id = self.stores.dicts.len();
                        self.stores.dicts.push(DictStorage::default());
                        map.insert(CloneKey::Dict(r.id), id);
                        let source = self.dict_storage(*r)?.clone();
                        let mut cloned = FxHashMap::default();
                        for (key, value) in &source.map {
                            cloned.insert(key.clone(), self.deep_clone(value, map)?);
                        }
                        self.stores.dicts[id] = DictStorage {
                            map: cloned,
                            read_only: source.read_only,
                        };
                        id
                    }
                };
                Ok(PsObject::Dict(DictRef { id }))
            }
            other => Ok(other.clone()),
        }
    }
}
