use dedup_types::PropertyName;

use crate::error::FingerprintResult;
use crate::record::FingerprintRecord;

/// Ordered fingerprint collection of one node.
///
/// Holds at most one record per `(property, algorithm)` pair; inserting a
/// record for a pair that is already present replaces it in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FingerprintSet {
    records: Vec<FingerprintRecord>,
}

impl FingerprintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a stored collection. Fails on the first malformed entry.
    pub fn decode<S: AsRef<str>>(encoded: &[S]) -> FingerprintResult<Self> {
        let mut set = Self::new();
        for entry in encoded {
            set.insert(entry.as_ref().parse()?);
        }
        Ok(set)
    }

    /// Encode for storage, preserving order.
    pub fn encode(&self) -> Vec<String> {
        self.records.iter().map(ToString::to_string).collect()
    }

    /// Add a record, replacing any record for the same property and
    /// algorithm.
    pub fn insert(&mut self, record: FingerprintRecord) {
        let existing = self.records.iter_mut().find(|r| {
            r.property() == record.property() && r.algorithm() == record.algorithm()
        });
        match existing {
            Some(slot) => *slot = record,
            None => self.records.push(record),
        }
    }

    /// The set with every record for `property` dropped.
    pub fn without_property(mut self, property: &PropertyName) -> Self {
        self.records.retain(|r| r.property() != property);
        self
    }

    /// Records describing `property`.
    pub fn for_property<'a>(
        &'a self,
        property: &'a PropertyName,
    ) -> impl Iterator<Item = &'a FingerprintRecord> + 'a {
        self.records.iter().filter(move |r| r.property() == property)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FingerprintRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<FingerprintRecord> for FingerprintSet {
    fn from_iter<I: IntoIterator<Item = FingerprintRecord>>(iter: I) -> Self {
        let mut set = Self::new();
        for record in iter {
            set.insert(record);
        }
        set
    }
}

impl IntoIterator for FingerprintSet {
    type Item = FingerprintRecord;
    type IntoIter = std::vec::IntoIter<FingerprintRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}
