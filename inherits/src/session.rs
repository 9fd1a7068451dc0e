use crate::error::AppError;
use crate::inherit;
use crate::inherit::MemberKind;
use crate::record::Record;
use crate::registry::{HookKind, ModelClass, ModelRegistry};
use crate::schema::{AssociationDef, AssociationKind};
use crate::storage::Store;
use crate::validation;
use crate::value::{Attributes, Value};
use crate::debug;

/// Persistence entry point: saves and loads records of the registered models.
#[derive(Clone, Copy)]
pub struct Session<'a> {
    registry: &'a ModelRegistry,
    store: &'a Store,
}

impl<'a> Session<'a> {
    pub fn new(registry: &'a ModelRegistry, store: &'a Store) -> Self {
        Session { registry, store }
    }

    pub fn registry(&self) -> &'a ModelRegistry {
        self.registry
    }

    pub fn store(&self) -> &'a Store {
        self.store
    }

    pub fn is_new_record(&self, record: &Record) -> bool {
        record.is_new_record()
    }

    /// Validates, runs the create or update hooks, writes the row and autosaves new owned children.
    ///
    /// Any error leaves `record` unpersisted. Rows already written by hooks are not rolled back.
    pub fn save(&self, record: &mut Record) -> Result<(), AppError> {
        let class = self.registry.resolve_class_by_name(record.model())?;
        for hook in class.hooks(HookKind::BeforeValidation) {
            hook(record, self)?;
        }
        let errors = validation::validate(self.registry, record)?;
        if !errors.is_empty() {
            return Err(AppError::Validation { model: class.name().to_string(), errors });
        }

        let kind = if record.is_new_record() { HookKind::BeforeCreate } else { HookKind::BeforeUpdate };
        for hook in class.hooks(kind) {
            hook(record, self)?;
        }

        sync_foreign_keys(class, record);
        let table = &class.def().table_name;
        match record.id() {
            None => {
                let id = self.store.insert(table, record.attributes())?;
                record.mark_persisted(id);
                debug!("Created {} #{id}", class.name());
            }
            Some(id) => {
                self.store.update(table, id, record.attributes())?;
                debug!("Updated {} #{id}", class.name());
            }
        }
        self.autosave_children(class, record)
    }

    /// Loads a record with its inherited parents and its owned children (one level deep).
    pub fn find(&self, model: &str, id: u64) -> Result<Record, AppError> {
        let class = self.registry.resolve_class_by_name(model)?;
        let mut record = self.load_row(class, id)?;
        for inheritance in class.inheritances() {
            if let Some(parent_id) = record.attribute(inheritance.foreign_key()).and_then(Value::as_id) {
                let parent = self.find(inheritance.parent(), parent_id)?;
                record.set_link(inheritance.role(), parent);
            }
        }
        for assoc in class.def().associations.iter() {
            match assoc.kind {
                AssociationKind::BelongsTo => {}
                AssociationKind::HasOne => {
                    if let Some(child) = self.load_children(assoc, id)?.into_iter().next() {
                        record.set_link(&assoc.name, child);
                    }
                }
                AssociationKind::HasMany => {
                    let children = self.load_children(assoc, id)?;
                    record.replace_collection(&assoc.name, children);
                }
            }
        }
        Ok(record)
    }

    /// `create_<name>`: builds through [`ModelRegistry::build_association`] and saves the result.
    pub fn create_association<'r>(&self, record: &'r mut Record, name: &str, attrs: Attributes) -> Result<&'r mut Record, AppError> {
        let class = self.registry.resolve_class_by_name(record.model())?;
        if let Some(assoc) = class.def().association(name) {
            return match assoc.kind {
                AssociationKind::BelongsTo => {
                    let target = self.registry.build_association(record, name, attrs)?;
                    self.save(target)?;
                    let target_id = target.id();
                    record.put_attribute(&assoc.foreign_key, Value::from(target_id));
                    record.linked_mut(name).ok_or_else(|| AppError::UnknownAssociation {
                        model: class.name().to_string(),
                        name: name.to_string(),
                    })
                }
                AssociationKind::HasOne | AssociationKind::HasMany => {
                    if record.is_new_record() {
                        return Err(AppError::UnsavedOwner { model: class.name().to_string(), association: name.to_string() });
                    }
                    let target = self.registry.build_association(record, name, attrs)?;
                    self.save(target)?;
                    Ok(target)
                }
            };
        }
        match class.delegate(name) {
            Some(delegate) if delegate.kind == MemberKind::Association => {
                let parent = inherit::delegation_target(self.registry, record, &delegate.role, name)?;
                self.create_association(parent, name, attrs)
            }
            _ => Err(AppError::UnknownAssociation { model: class.name().to_string(), name: name.to_string() }),
        }
    }

    fn load_row(&self, class: &ModelClass, id: u64) -> Result<Record, AppError> {
        let row = self
            .store
            .get(&class.def().table_name, id)?
            .ok_or_else(|| AppError::NotFound(format!("{} #{id}", class.name())))?;
        Ok(Record::loaded(class.name(), id, &class.def().columns, row))
    }

    fn load_children(&self, assoc: &AssociationDef, owner_id: u64) -> Result<Vec<Record>, AppError> {
        let target = self.registry.resolve_class_by_name(&assoc.target)?;
        let mut children = Vec::new();
        for (id, row) in self.store.scan(&target.def().table_name)? {
            if row.get(&assoc.foreign_key).and_then(Value::as_id) == Some(owner_id) {
                children.push(Record::loaded(target.name(), id, &target.def().columns, row));
            }
        }
        Ok(children)
    }

    fn autosave_children(&self, class: &ModelClass, record: &mut Record) -> Result<(), AppError> {
        let Some(owner_id) = record.id() else {
            return Ok(());
        };
        for assoc in class.def().associations.iter() {
            match assoc.kind {
                AssociationKind::BelongsTo => {}
                AssociationKind::HasOne => {
                    if let Some(child) = record.linked_mut(&assoc.name).filter(|c| c.is_new_record()) {
                        child.put_attribute(&assoc.foreign_key, Value::from(owner_id));
                        self.save(child)?;
                    }
                }
                AssociationKind::HasMany => {
                    if let Some(children) = record.collection_mut(&assoc.name) {
                        for child in children.iter_mut().filter(|c| c.is_new_record()) {
                            child.put_attribute(&assoc.foreign_key, Value::from(owner_id));
                            self.save(child)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Copies the ids of persisted belongs-to targets into their foreign-key columns.
fn sync_foreign_keys(class: &ModelClass, record: &mut Record) {
    for assoc in class.def().associations.iter().filter(|a| a.kind == AssociationKind::BelongsTo) {
        if let Some(id) = record.linked(&assoc.name).and_then(Record::id) {
            record.put_attribute(&assoc.foreign_key, Value::from(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{catalog, temp_store};
    use crate::{attrs, Linked};

    #[test]
    fn saving_a_new_child_persists_the_parent_first() {
        let registry = catalog();
        let store = temp_store("session_ordering");
        let session = Session::new(&registry, &store);

        let mut book = registry.new_record("Book").unwrap();
        registry.write_attribute(&mut book, "name", "Agile Development with Rails").unwrap();
        registry.write_attribute(&mut book, "pages", 400).unwrap();
        session.save(&mut book).unwrap();

        let parent = book.linked("product").unwrap();
        let parent_id = parent.id().unwrap();
        assert_eq!(book.attribute("product_id"), Some(&Value::from(parent_id)));
        let row = store.get("products", parent_id).unwrap().unwrap();
        assert_eq!(row["type"], Value::from("Book"));
        assert_eq!(row["name"], Value::from("Agile Development with Rails"));
        assert!(!session.is_new_record(&book));
    }

    #[test]
    fn invalid_child_writes_nothing() {
        let registry = catalog();
        let store = temp_store("session_invalid");
        let session = Session::new(&registry, &store);

        let mut book = registry.new_record("Book").unwrap();
        registry.write_attribute(&mut book, "pages", 120).unwrap();
        let err = session.save(&mut book).unwrap_err();
        match err {
            AppError::Validation { model, errors } => {
                assert_eq!(model, "Book");
                assert!(errors.on("name").is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(book.is_new_record());
        assert_eq!(store.count("products").unwrap(), 0);
        assert_eq!(store.count("books").unwrap(), 0);
    }

    #[test]
    fn updates_resave_the_parent() {
        let registry = catalog();
        let store = temp_store("session_update");
        let session = Session::new(&registry, &store);

        let mut book = registry.new_record("Book").unwrap();
        registry.write_attribute(&mut book, "name", "Agile").unwrap();
        registry.write_attribute(&mut book, "pages", 400).unwrap();
        session.save(&mut book).unwrap();

        let mut loaded = session.find("Book", book.id().unwrap()).unwrap();
        registry.write_attribute(&mut loaded, "name", "Agile, 2nd ed.").unwrap();
        session.save(&mut loaded).unwrap();

        let reloaded = session.find("Book", book.id().unwrap()).unwrap();
        assert_eq!(reloaded.linked("product").unwrap().attribute("name"), Some(&Value::from("Agile, 2nd ed.")));
        assert_eq!(store.count("products").unwrap(), 1);
    }

    #[test]
    fn create_on_unsaved_owner_is_rejected() {
        let registry = catalog();
        let store = temp_store("session_unsaved_owner");
        let session = Session::new(&registry, &store);
        let mut book = registry.new_record("Book").unwrap();
        let err = session.create_association(&mut book, "reviews", attrs! { "body" => "early" }).unwrap_err();
        assert!(matches!(err, AppError::UnsavedOwner { model, association } if model == "Product" && association == "reviews"));
    }

    #[test]
    fn built_children_are_autosaved_with_the_owner() {
        let registry = catalog();
        let store = temp_store("session_autosave");
        let session = Session::new(&registry, &store);

        let mut book = registry.new_record("Book").unwrap();
        registry.write_attribute(&mut book, "name", "Agile").unwrap();
        registry.write_attribute(&mut book, "pages", 400).unwrap();
        registry.build_association(&mut book, "reviews", attrs! { "body" => "Dense", "stars" => 4 }).unwrap();
        session.save(&mut book).unwrap();

        let product_id = book.linked("product").unwrap().id().unwrap();
        let reviews = store.scan("reviews").unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].1["product_id"], Value::from(product_id));

        let mut loaded = session.find("Book", book.id().unwrap()).unwrap();
        assert!(matches!(registry.read_association(&mut loaded, "reviews").unwrap(), Linked::Many(items) if items.len() == 1));
    }

    #[test]
    fn belongs_to_create_sets_the_owner_key() {
        let registry = catalog();
        let store = temp_store("session_belongs_to");
        let session = Session::new(&registry, &store);
        let mut product = registry.new_record("Product").unwrap();
        let vendor = session.create_association(&mut product, "vendor", attrs! { "name" => "Pragmatic" }).unwrap();
        let vendor_id = vendor.id().unwrap();
        assert_eq!(product.attribute("vendor_id"), Some(&Value::from(vendor_id)));
        assert!(product.is_new_record());
    }

    #[test]
    fn find_reports_missing_rows() {
        let registry = catalog();
        let store = temp_store("session_missing");
        let session = Session::new(&registry, &store);
        assert!(matches!(session.find("Book", 7), Err(AppError::NotFound(msg)) if msg == "Book #7"));
        assert!(matches!(session.find("Gadget", 1), Err(AppError::Resolution(_))));
    }
}
