//! Native containers: arrays, hash maps, hash sets and opaque structs.
//!
//! Maps and sets follow an append-then-rehash protocol. Bulk writers clear
//! the container, append default entries with
//! [`NativeMap::add_default_value_needs_rehash`], fill them in place, and finish
//! with [`NativeMap::rehash`]. Rehashing removes duplicate keys (the later
//! entry wins) and reorders entries by hash bucket, so iteration order after a
//! rehash is the container's own, not the insertion order.

use std::borrow::Cow;

use rustc_hash::FxHashMap;

use crate::{NativeValue, PropertyKind, TypeHash};

// ============================================================================
// Arrays
// ============================================================================

#[derive(Debug, Clone)]
enum ArrayStorage {
    /// Contiguous bytes for `Array<Byte>`.
    Bytes(Vec<u8>),
    Values(Vec<NativeValue>),
}

/// A native dynamic array.
#[derive(Debug, Clone)]
pub struct NativeArray {
    element: PropertyKind,
    storage: ArrayStorage,
}

impl NativeArray {
    pub fn new(element: &PropertyKind) -> Self {
        let storage = match element {
            PropertyKind::Byte => ArrayStorage::Bytes(Vec::new()),
            _ => ArrayStorage::Values(Vec::new()),
        };
        Self {
            element: element.clone(),
            storage,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            element: PropertyKind::Byte,
            storage: ArrayStorage::Bytes(bytes),
        }
    }

    /// Build an array from values. Values that are not of the element kind are
    /// replaced by the element default.
    pub fn from_values(element: &PropertyKind, values: Vec<NativeValue>) -> Self {
        let mut array = Self::new(element);
        array.resize(values.len());
        for (index, value) in values.into_iter().enumerate() {
            array.set(index, value);
        }
        array
    }

    pub fn element_kind(&self) -> &PropertyKind {
        &self.element
    }

    pub fn len(&self) -> usize {
        match &self.storage {
            ArrayStorage::Bytes(bytes) => bytes.len(),
            ArrayStorage::Values(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `count` default-initialized elements, returning the first new index.
    pub fn add_values(&mut self, count: usize) -> usize {
        let start = self.len();
        self.resize(start + count);
        start
    }

    /// Remove `count` elements starting at `start`. Out-of-range parts are ignored.
    pub fn remove_values(&mut self, start: usize, count: usize) {
        let len = self.len();
        let start = start.min(len);
        let end = start.saturating_add(count).min(len);
        match &mut self.storage {
            ArrayStorage::Bytes(bytes) => {
                bytes.drain(start..end);
            }
            ArrayStorage::Values(values) => {
                values.drain(start..end);
            }
        }
    }

    /// Grow with defaults or shrink to `len` elements.
    pub fn resize(&mut self, len: usize) {
        match &mut self.storage {
            ArrayStorage::Bytes(bytes) => bytes.resize(len, 0),
            ArrayStorage::Values(values) => {
                let element = &self.element;
                values.resize_with(len, || NativeValue::default_for(element));
            }
        }
    }

    /// The raw bytes of an `Array<Byte>`.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.storage {
            ArrayStorage::Bytes(bytes) => Some(bytes),
            ArrayStorage::Values(_) => None,
        }
    }

    /// Resize to `bytes.len()` and copy the bytes in one block.
    ///
    /// Returns false if this is not an `Array<Byte>`.
    pub fn copy_from_bytes(&mut self, bytes: &[u8]) -> bool {
        match &mut self.storage {
            ArrayStorage::Bytes(storage) => {
                storage.resize(bytes.len(), 0);
                storage.copy_from_slice(bytes);
                true
            }
            ArrayStorage::Values(_) => false,
        }
    }

    pub fn get(&self, index: usize) -> Option<Cow<'_, NativeValue>> {
        match &self.storage {
            ArrayStorage::Bytes(bytes) => {
                bytes.get(index).map(|b| Cow::Owned(NativeValue::Byte(*b)))
            }
            ArrayStorage::Values(values) => values.get(index).map(Cow::Borrowed),
        }
    }

    /// Replace the element at `index`. Returns false when out of range or of the wrong kind.
    pub fn set(&mut self, index: usize, value: NativeValue) -> bool {
        if !value.matches_kind(&self.element) {
            return false;
        }
        match (&mut self.storage, value) {
            (ArrayStorage::Bytes(bytes), NativeValue::Byte(byte)) => match bytes.get_mut(index) {
                Some(slot) => {
                    *slot = byte;
                    true
                }
                None => false,
            },
            (ArrayStorage::Values(values), value) => match values.get_mut(index) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    /// Run `f` on a mutable view of the element at `index`.
    pub fn with_element_mut<R>(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut NativeValue) -> R,
    ) -> Option<R> {
        match &mut self.storage {
            ArrayStorage::Bytes(bytes) => {
                let slot = bytes.get_mut(index)?;
                let mut value = NativeValue::Byte(*slot);
                let result = f(&mut value);
                if let NativeValue::Byte(byte) = value {
                    *slot = byte;
                }
                Some(result)
            }
            ArrayStorage::Values(values) => values.get_mut(index).map(f),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Cow<'_, NativeValue>> {
        (0..self.len()).filter_map(move |index| self.get(index))
    }
}

// ============================================================================
// Maps
// ============================================================================

/// A native hash map of key/value slots.
#[derive(Debug, Clone)]
pub struct NativeMap {
    key: PropertyKind,
    value: PropertyKind,
    pairs: Vec<(NativeValue, NativeValue)>,
    index: FxHashMap<u64, Vec<usize>>,
    needs_rehash: bool,
}

impl NativeMap {
    pub fn new(key: &PropertyKind, value: &PropertyKind) -> Self {
        Self {
            key: key.clone(),
            value: value.clone(),
            pairs: Vec::new(),
            index: FxHashMap::default(),
            needs_rehash: false,
        }
    }

    pub fn key_kind(&self) -> &PropertyKind {
        &self.key
    }

    pub fn value_kind(&self) -> &PropertyKind {
        &self.value
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn needs_rehash(&self) -> bool {
        self.needs_rehash
    }

    /// Remove every entry.
    pub fn empty_values(&mut self) {
        self.pairs.clear();
        self.index.clear();
        self.needs_rehash = false;
    }

    /// Append a default pair without hashing it, returning its position.
    ///
    /// Lookups are invalid until [`NativeMap::rehash`] runs.
    pub fn add_default_value_needs_rehash(&mut self) -> usize {
        self.pairs.push((
            NativeValue::default_for(&self.key),
            NativeValue::default_for(&self.value),
        ));
        self.needs_rehash = true;
        self.pairs.len() - 1
    }

    pub fn pair_mut(&mut self, position: usize) -> Option<(&mut NativeValue, &mut NativeValue)> {
        self.pairs.get_mut(position).map(|(k, v)| (k, v))
    }

    /// Deduplicate keys and rebuild hash order.
    pub fn rehash(&mut self) {
        let pairs = std::mem::take(&mut self.pairs);
        let entries = dedupe_by_key(pairs.into_iter().map(|(k, v)| (k.key_hash(), k, v)));
        let ordered = bucket_order(entries);

        self.index.clear();
        self.pairs = Vec::with_capacity(ordered.len());
        for (position, (hash, key, value)) in ordered.into_iter().enumerate() {
            self.index.entry(hash).or_default().push(position);
            self.pairs.push((key, value));
        }
        self.needs_rehash = false;
    }

    /// Insert or replace a single entry, keeping the index current.
    pub fn add(&mut self, key: NativeValue, value: NativeValue) {
        if self.needs_rehash {
            self.rehash();
        }
        let hash = key.key_hash();
        if let Some(position) = self.position_of(hash, &key) {
            self.pairs[position].1 = value;
            return;
        }
        self.index.entry(hash).or_default().push(self.pairs.len());
        self.pairs.push((key, value));
    }

    /// Look up a key. Entries appended since the last rehash are not visible.
    pub fn find(&self, key: &NativeValue) -> Option<&NativeValue> {
        self.position_of(key.key_hash(), key)
            .map(|position| &self.pairs[position].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NativeValue, &NativeValue)> {
        self.pairs.iter().map(|(k, v)| (k, v))
    }

    fn position_of(&self, hash: u64, key: &NativeValue) -> Option<usize> {
        self.index
            .get(&hash)?
            .iter()
            .copied()
            .find(|&position| self.pairs[position].0.key_eq(key))
    }
}

// ============================================================================
// Sets
// ============================================================================

/// A native hash set.
#[derive(Debug, Clone)]
pub struct NativeSet {
    element: PropertyKind,
    elements: Vec<NativeValue>,
    index: FxHashMap<u64, Vec<usize>>,
    needs_rehash: bool,
}

impl NativeSet {
    pub fn new(element: &PropertyKind) -> Self {
        Self {
            element: element.clone(),
            elements: Vec::new(),
            index: FxHashMap::default(),
            needs_rehash: false,
        }
    }

    pub fn element_kind(&self) -> &PropertyKind {
        &self.element
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn needs_rehash(&self) -> bool {
        self.needs_rehash
    }

    pub fn empty_elements(&mut self) {
        self.elements.clear();
        self.index.clear();
        self.needs_rehash = false;
    }

    /// Append a default element without hashing it, returning its position.
    pub fn add_default_value_needs_rehash(&mut self) -> usize {
        self.elements.push(NativeValue::default_for(&self.element));
        self.needs_rehash = true;
        self.elements.len() - 1
    }

    pub fn element_mut(&mut self, position: usize) -> Option<&mut NativeValue> {
        self.elements.get_mut(position)
    }

    pub fn rehash(&mut self) {
        let elements = std::mem::take(&mut self.elements);
        let entries = dedupe_by_key(elements.into_iter().map(|e| (e.key_hash(), e, ())));
        let ordered = bucket_order(entries);

        self.index.clear();
        self.elements = Vec::with_capacity(ordered.len());
        for (position, (hash, element, ())) in ordered.into_iter().enumerate() {
            self.index.entry(hash).or_default().push(position);
            self.elements.push(element);
        }
        self.needs_rehash = false;
    }

    /// Insert an element. Returns false if it was already present.
    pub fn add(&mut self, element: NativeValue) -> bool {
        if self.needs_rehash {
            self.rehash();
        }
        if self.contains(&element) {
            return false;
        }
        let hash = element.key_hash();
        self.index.entry(hash).or_default().push(self.elements.len());
        self.elements.push(element);
        true
    }

    pub fn contains(&self, element: &NativeValue) -> bool {
        self.index.get(&element.key_hash()).is_some_and(|positions| {
            positions
                .iter()
                .any(|&position| self.elements[position].key_eq(element))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &NativeValue> {
        self.elements.iter()
    }
}

/// Keep the last value for every distinct key, at the key's first position.
fn dedupe_by_key<V>(
    entries: impl Iterator<Item = (u64, NativeValue, V)>,
) -> Vec<(u64, NativeValue, V)> {
    let mut unique: Vec<(u64, NativeValue, V)> = Vec::new();
    let mut seen: FxHashMap<u64, Vec<usize>> = FxHashMap::default();
    for (hash, key, value) in entries {
        let existing = seen
            .get(&hash)
            .and_then(|positions| positions.iter().copied().find(|&p| unique[p].1.key_eq(&key)));
        match existing {
            Some(position) => unique[position].2 = value,
            None => {
                seen.entry(hash).or_default().push(unique.len());
                unique.push((hash, key, value));
            }
        }
    }
    unique
}

/// Order entries by hash bucket, as a power-of-two bucket table would iterate them.
fn bucket_order<V>(mut entries: Vec<(u64, NativeValue, V)>) -> Vec<(u64, NativeValue, V)> {
    let mask = (entries.len().next_power_of_two().max(1) - 1) as u64;
    entries.sort_by_key(|(hash, _, _)| hash & mask);
    entries
}

// ============================================================================
// Structs
// ============================================================================

/// An opaque native struct value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeStruct {
    struct_type: TypeHash,
    data: Vec<u8>,
}

impl NativeStruct {
    pub fn new(struct_type: TypeHash) -> Self {
        Self {
            struct_type,
            data: Vec::new(),
        }
    }

    pub fn with_data(struct_type: TypeHash, data: Vec<u8>) -> Self {
        Self { struct_type, data }
    }

    pub fn struct_type(&self) -> TypeHash {
        self.struct_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }

    /// Generic copy from another value of the same struct type.
    pub fn copy_from(&mut self, other: &NativeStruct) -> bool {
        if other.struct_type != self.struct_type {
            return false;
        }
        self.data.clone_from(&other.data);
        true
    }
}
