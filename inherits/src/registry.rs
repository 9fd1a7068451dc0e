use crate::error::AppError;
use crate::inherit::{self, Delegate, Inheritance, MemberKind};
use crate::record::Record;
use crate::schema::{AssociationDef, AssociationKind, ModelDef, DISCRIMINATOR};
use crate::session::Session;
use crate::validation::Validation;
use crate::value::{Attributes, Value};
use crate::info;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Lifecycle callback. An `Err` aborts the save that fired it.
pub type Hook = Arc<dyn Fn(&mut Record, &Session<'_>) -> Result<(), AppError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    BeforeValidation,
    BeforeCreate,
    BeforeUpdate,
}

/// Borrowed view of an association's current target(s).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Linked<'a> {
    One(Option<&'a Record>),
    Many(&'a [Record]),
}

/// Owned replacement for an association's target(s).
#[derive(Debug, Clone, PartialEq)]
pub enum Assign {
    One(Option<Record>),
    Many(Vec<Record>),
}

/// Schema plus everything declared against it at startup.
pub struct ModelClass {
    def: ModelDef,
    validations: Vec<Validation>,
    before_validation: Vec<Hook>,
    before_create: Vec<Hook>,
    before_update: Vec<Hook>,
    inheritances: Vec<Inheritance>,
    delegates: BTreeMap<String, Delegate>,
}

impl ModelClass {
    fn new(def: ModelDef) -> Self {
        ModelClass {
            def,
            validations: Vec::new(),
            before_validation: Vec::new(),
            before_create: Vec::new(),
            before_update: Vec::new(),
            inheritances: Vec::new(),
            delegates: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn def(&self) -> &ModelDef {
        &self.def
    }

    pub fn validations(&self) -> &[Validation] {
        &self.validations
    }

    pub fn hooks(&self, kind: HookKind) -> &[Hook] {
        match kind {
            HookKind::BeforeValidation => &self.before_validation,
            HookKind::BeforeCreate => &self.before_create,
            HookKind::BeforeUpdate => &self.before_update,
        }
    }

    pub fn inheritances(&self) -> &[Inheritance] {
        &self.inheritances
    }

    pub fn inheritance(&self, role: &str) -> Option<&Inheritance> {
        self.inheritances.iter().find(|i| i.role() == role)
    }

    pub fn delegate(&self, name: &str) -> Option<&Delegate> {
        self.delegates.get(name)
    }

    pub fn delegates(&self) -> impl Iterator<Item = (&str, &Delegate)> {
        self.delegates.iter().map(|(name, d)| (name.as_str(), d))
    }

    /// Native column, native association or delegated member.
    pub fn responds_to(&self, name: &str) -> bool {
        self.def.has_column(name) || self.def.association(name).is_some() || self.delegates.contains_key(name)
    }

    pub(crate) fn def_mut(&mut self) -> &mut ModelDef {
        &mut self.def
    }

    pub(crate) fn add_inheritance(&mut self, inheritance: Inheritance) {
        self.inheritances.push(inheritance);
    }

    /// First registration of a name wins. Returns whether it was added.
    pub(crate) fn add_delegate(&mut self, name: &str, delegate: Delegate) -> bool {
        if self.delegates.contains_key(name) {
            return false;
        }
        self.delegates.insert(name.to_string(), delegate);
        true
    }

    fn add_validation(&mut self, validation: Validation) {
        if !self.validations.contains(&validation) {
            self.validations.push(validation);
        }
    }
}

impl fmt::Debug for ModelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClass")
            .field("def", &self.def)
            .field("validations", &self.validations)
            .field("before_validation", &self.before_validation.len())
            .field("before_create", &self.before_create.len())
            .field("before_update", &self.before_update.len())
            .field("inheritances", &self.inheritances)
            .field("delegates", &self.delegates)
            .finish()
    }
}

/// Explicit model registry, populated once at startup and then shared read-only.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelClass>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, def: ModelDef) -> Result<&mut ModelClass, AppError> {
        if self.models.contains_key(&def.name) {
            return Err(AppError::Schema(format!("model class `{}` is already registered", def.name)));
        }
        info!("Registering model {} ({} columns, {} associations)", def.name, def.columns.len(), def.associations.len());
        let name = def.name.clone();
        Ok(self.models.entry(name).or_insert(ModelClass::new(def)))
    }

    pub fn resolve_class_by_name(&self, name: &str) -> Result<&ModelClass, AppError> {
        self.models.get(name).ok_or_else(|| AppError::Resolution(name.to_string()))
    }

    pub(crate) fn class_mut(&mut self, name: &str) -> Result<&mut ModelClass, AppError> {
        self.models.get_mut(name).ok_or_else(|| AppError::Resolution(name.to_string()))
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn list_columns(&self, class: &str) -> Result<Vec<String>, AppError> {
        Ok(self.resolve_class_by_name(class)?.def.column_names().map(str::to_string).collect())
    }

    pub fn list_associations(&self, class: &str) -> Result<Vec<String>, AppError> {
        Ok(self.resolve_class_by_name(class)?.def.association_names().map(str::to_string).collect())
    }

    pub fn declare_belongs_to(&mut self, class: &str, role: &str) -> Result<AssociationDef, AppError> {
        Ok(self.class_mut(class)?.def.add_belongs_to(role).clone())
    }

    pub fn declare_validates_presence_of_association(&mut self, class: &str, role: &str) -> Result<(), AppError> {
        let model = self.class_mut(class)?;
        if model.def.association(role).is_none() {
            return Err(AppError::UnknownAssociation { model: class.to_string(), name: role.to_string() });
        }
        model.add_validation(Validation::AssociatedPresence(role.to_string()));
        Ok(())
    }

    /// Names are checked when the record is validated, so delegated attributes are allowed.
    pub fn validates_presence_of(&mut self, class: &str, attrs: &[&str]) -> Result<(), AppError> {
        let model = self.class_mut(class)?;
        for attr in attrs {
            model.add_validation(Validation::Presence(attr.to_string()));
        }
        Ok(())
    }

    pub fn register_hook(&mut self, class: &str, kind: HookKind, hook: Hook) -> Result<(), AppError> {
        let model = self.class_mut(class)?;
        match kind {
            HookKind::BeforeValidation => model.before_validation.push(hook),
            HookKind::BeforeCreate => model.before_create.push(hook),
            HookKind::BeforeUpdate => model.before_update.push(hook),
        }
        Ok(())
    }

    pub fn register_before_validation(&mut self, class: &str, hook: Hook) -> Result<(), AppError> {
        self.register_hook(class, HookKind::BeforeValidation, hook)
    }

    pub fn register_before_create(&mut self, class: &str, hook: Hook) -> Result<(), AppError> {
        self.register_hook(class, HookKind::BeforeCreate, hook)
    }

    pub fn register_before_update(&mut self, class: &str, hook: Hook) -> Result<(), AppError> {
        self.register_hook(class, HookKind::BeforeUpdate, hook)
    }

    pub fn new_record(&self, class: &str) -> Result<Record, AppError> {
        let model = self.resolve_class_by_name(class)?;
        Ok(Record::new(model.name(), &model.def.columns))
    }

    pub fn association(&self, class: &str, name: &str) -> Result<&AssociationDef, AppError> {
        self.resolve_class_by_name(class)?
            .def
            .association(name)
            .ok_or_else(|| AppError::UnknownAssociation { model: class.to_string(), name: name.to_string() })
    }

    pub fn get_linked_object<'a>(&self, record: &'a Record, role: &str) -> Option<&'a Record> {
        record.linked(role)
    }

    pub fn set_linked_object<'a>(&self, record: &'a mut Record, role: &str, target: Record) -> Result<&'a mut Record, AppError> {
        let assoc = self.association(record.model(), role)?;
        if !assoc.kind.is_singular() {
            return Err(AppError::Custom(format!("{}.{} is a collection", record.model(), role)));
        }
        self.check_target(record.model(), assoc, &target)?;
        if assoc.kind == AssociationKind::BelongsTo {
            record.put_attribute(&assoc.foreign_key, Value::from(target.id()));
        }
        Ok(record.set_link(role, target))
    }

    /// Attaches a fresh unsaved target for a native association and returns it.
    ///
    /// Building an inheritance role replaces the current parent, so delegated values written so far are
    /// dropped. The new parent is stamped with the record's class name.
    pub fn build_linked_object<'a>(&self, record: &'a mut Record, role: &str) -> Result<&'a mut Record, AppError> {
        let class = self.resolve_class_by_name(record.model())?;
        let assoc = self.association(record.model(), role)?;
        let mut target = self.new_record(&assoc.target)?;
        if assoc.kind != AssociationKind::BelongsTo {
            target.put_attribute(&assoc.foreign_key, Value::from(record.id()));
        }
        if class.inheritance(role).is_some() {
            target.put_attribute(DISCRIMINATOR, Value::from(class.name()));
        }
        Ok(match assoc.kind {
            AssociationKind::BelongsTo | AssociationKind::HasOne => record.set_link(role, target),
            AssociationKind::HasMany => record.push_collection(role, target),
        })
    }

    /// Reads a native column or forwards to the parent owning the delegated attribute.
    pub fn read_attribute(&self, record: &mut Record, name: &str) -> Result<Value, AppError> {
        let class = self.resolve_class_by_name(record.model())?;
        if class.def.has_column(name) {
            return Ok(record.attribute(name).cloned().unwrap_or_default());
        }
        match class.delegate(name) {
            Some(delegate) if delegate.kind == MemberKind::Attribute => {
                let parent = inherit::delegation_target(self, record, &delegate.role, name)?;
                self.read_attribute(parent, name)
            }
            _ => Err(AppError::UnknownAttribute { model: class.name().to_string(), name: name.to_string() }),
        }
    }

    pub fn write_attribute(&self, record: &mut Record, name: &str, value: impl Into<Value>) -> Result<(), AppError> {
        let value = value.into();
        let class = self.resolve_class_by_name(record.model())?;
        if let Some(column) = class.def.column(name) {
            if !column.ty.accepts(&value) {
                return Err(AppError::TypeMismatch {
                    model: class.name().to_string(),
                    name: name.to_string(),
                    expected: column.ty.to_string(),
                    found: value.type_name().to_string(),
                });
            }
            record.put_attribute(name, column.ty.cast(value));
            return Ok(());
        }
        match class.delegate(name) {
            Some(delegate) if delegate.kind == MemberKind::Attribute => {
                let parent = inherit::delegation_target(self, record, &delegate.role, name)?;
                self.write_attribute(parent, name, value)
            }
            _ => Err(AppError::UnknownAttribute { model: class.name().to_string(), name: name.to_string() }),
        }
    }

    pub fn assign_attributes(&self, record: &mut Record, attrs: Attributes) -> Result<(), AppError> {
        for (name, value) in attrs {
            self.write_attribute(record, &name, value)?;
        }
        Ok(())
    }

    pub fn read_association<'a>(&self, record: &'a mut Record, name: &str) -> Result<Linked<'a>, AppError> {
        let class = self.resolve_class_by_name(record.model())?;
        if let Some(assoc) = class.def.association(name) {
            return Ok(if assoc.kind.is_singular() {
                Linked::One(record.linked(name))
            } else {
                Linked::Many(record.collection(name))
            });
        }
        match class.delegate(name) {
            Some(delegate) if delegate.kind == MemberKind::Association => {
                let parent = inherit::delegation_target(self, record, &delegate.role, name)?;
                self.read_association(parent, name)
            }
            _ => Err(AppError::UnknownAssociation { model: class.name().to_string(), name: name.to_string() }),
        }
    }

    pub fn assign_association(&self, record: &mut Record, name: &str, value: Assign) -> Result<(), AppError> {
        let class = self.resolve_class_by_name(record.model())?;
        if let Some(assoc) = class.def.association(name) {
            match (assoc.kind.is_singular(), value) {
                (true, Assign::One(Some(target))) => {
                    self.set_linked_object(record, name, target)?;
                }
                (true, Assign::One(None)) => {
                    record.clear_link(name);
                    if assoc.kind == AssociationKind::BelongsTo {
                        record.put_attribute(&assoc.foreign_key, Value::Null);
                    }
                }
                (false, Assign::Many(targets)) => {
                    for target in &targets {
                        self.check_target(class.name(), assoc, target)?;
                    }
                    record.replace_collection(name, targets);
                }
                (singular, _) => {
                    return Err(AppError::Custom(format!(
                        "{}.{} expects {}",
                        class.name(),
                        name,
                        if singular { "a single record" } else { "a collection" }
                    )))
                }
            }
            return Ok(());
        }
        match class.delegate(name) {
            Some(delegate) if delegate.kind == MemberKind::Association => {
                let parent = inherit::delegation_target(self, record, &delegate.role, name)?;
                self.assign_association(parent, name, value)
            }
            _ => Err(AppError::UnknownAssociation { model: class.name().to_string(), name: name.to_string() }),
        }
    }

    /// `build_<name>`: native associations build in place, delegated ones build on the parent.
    pub fn build_association<'a>(&self, record: &'a mut Record, name: &str, attrs: Attributes) -> Result<&'a mut Record, AppError> {
        let class = self.resolve_class_by_name(record.model())?;
        if class.def.association(name).is_some() {
            let target = self.build_linked_object(record, name)?;
            self.assign_attributes(target, attrs)?;
            return Ok(target);
        }
        match class.delegate(name) {
            Some(delegate) if delegate.kind == MemberKind::Association => {
                let parent = inherit::delegation_target(self, record, &delegate.role, name)?;
                self.build_association(parent, name, attrs)
            }
            _ => Err(AppError::UnknownAssociation { model: class.name().to_string(), name: name.to_string() }),
        }
    }

    fn check_target(&self, model: &str, assoc: &AssociationDef, target: &Record) -> Result<(), AppError> {
        if target.model() == assoc.target {
            Ok(())
        } else {
            Err(AppError::TypeMismatch {
                model: model.to_string(),
                name: assoc.name.clone(),
                expected: assoc.target.clone(),
                found: target.model().to_string(),
            })
        }
    }
}
