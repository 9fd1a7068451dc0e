use crate::schema::ColumnDef;
use crate::value::{Attributes, Value};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Runtime instance of a model class.
///
/// Singular associations (belongs-to, has-one) are held in `links`, has-many in `collections`.
/// A record exclusively owns whatever it links to; once both sides are persisted the link is
/// also mirrored by a foreign-key attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    model: String,
    id: Option<u64>,
    attributes: Attributes,
    links: BTreeMap<String, Box<Record>>,
    collections: BTreeMap<String, Vec<Record>>,
}

impl Record {
    pub(crate) fn new(model: &str, columns: &[ColumnDef]) -> Self {
        Record {
            model: model.to_string(),
            id: None,
            attributes: columns.iter().map(|c| (c.name.clone(), Value::Null)).collect(),
            links: BTreeMap::new(),
            collections: BTreeMap::new(),
        }
    }

    /// Rebuilds a persisted record; stored attributes missing from the row default to null.
    pub(crate) fn loaded(model: &str, id: u64, columns: &[ColumnDef], mut row: Attributes) -> Self {
        let mut record = Record::new(model, columns);
        for (name, value) in record.attributes.iter_mut() {
            if let Some(stored) = row.remove(name) {
                *value = stored;
            }
        }
        record.id = Some(id);
        record
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn id(&self) -> Option<u64> {
        self.id
    }

    pub fn is_new_record(&self) -> bool {
        self.id.is_none()
    }

    /// Native attributes only; delegated ones are read through the registry.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn linked(&self, role: &str) -> Option<&Record> {
        self.links.get(role).map(|b| &**b)
    }

    pub fn linked_mut(&mut self, role: &str) -> Option<&mut Record> {
        self.links.get_mut(role).map(|b| &mut **b)
    }

    pub fn collection(&self, role: &str) -> &[Record] {
        self.collections.get(role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn collection_mut(&mut self, role: &str) -> Option<&mut Vec<Record>> {
        self.collections.get_mut(role)
    }

    pub(crate) fn put_attribute(&mut self, name: &str, value: Value) {
        self.attributes.insert(name.to_string(), value);
    }

    pub(crate) fn set_link(&mut self, role: &str, target: Record) -> &mut Record {
        match self.links.entry(role.to_string()) {
            Entry::Occupied(mut slot) => {
                slot.insert(Box::new(target));
                &mut **slot.into_mut()
            }
            Entry::Vacant(slot) => &mut **slot.insert(Box::new(target)),
        }
    }

    pub(crate) fn clear_link(&mut self, role: &str) -> Option<Record> {
        self.links.remove(role).map(|b| *b)
    }

    pub(crate) fn push_collection(&mut self, role: &str, target: Record) -> &mut Record {
        let items = self.collections.entry(role.to_string()).or_default();
        let idx = items.len();
        items.push(target);
        &mut items[idx]
    }

    pub(crate) fn replace_collection(&mut self, role: &str, targets: Vec<Record>) {
        self.collections.insert(role.to_string(), targets);
    }

    pub(crate) fn mark_persisted(&mut self, id: u64) {
        self.id = Some(id);
    }
}
