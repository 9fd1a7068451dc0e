use crate::error::AppError;
use crate::record::Record;
use crate::registry::ModelRegistry;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Attribute must not be blank. Delegated attributes are read through their parent.
    Presence(String),
    /// Linked object must be present and itself valid.
    AssociatedPresence(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn blank(field: &str) -> Self {
        FieldError { field: field.to_string(), message: "can't be blank".to_string() }
    }

    fn nested(role: &str, inner: FieldError) -> Self {
        FieldError { field: format!("{role}.{}", inner.field), message: inner.message }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn on(&self, field: &str) -> Option<&FieldError> {
        self.0.iter().find(|e| e.field == field)
    }

    fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }
}

impl From<Vec<FieldError>> for ValidationErrors {
    fn from(errors: Vec<FieldError>) -> Self {
        ValidationErrors(errors)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(", "))
    }
}

/// Runs the class validations of `record` (recursing into validated associations).
///
/// Reads go through the registry, so delegated attributes may lazily build a parent.
pub fn validate(registry: &ModelRegistry, record: &mut Record) -> Result<ValidationErrors, AppError> {
    let class = registry.resolve_class_by_name(record.model())?;
    let mut errors = ValidationErrors::default();
    for validation in class.validations() {
        match validation {
            Validation::Presence(attr) => {
                if registry.read_attribute(record, attr)?.is_blank() {
                    errors.push(FieldError::blank(attr));
                }
            }
            Validation::AssociatedPresence(role) => match record.linked_mut(role) {
                None => errors.push(FieldError::blank(role)),
                Some(linked) => {
                    for nested in validate(registry, linked)?.0 {
                        errors.push(FieldError::nested(role, nested));
                    }
                }
            },
        }
    }
    Ok(errors)
}
