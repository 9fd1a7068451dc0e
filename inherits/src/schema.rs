use crate::value::Value;
use std::fmt;

/// Name of the attribute a parent row uses to record which child class created it.
pub const DISCRIMINATOR: &str = "type";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    Boolean,
}

impl ColumnType {
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (ColumnType::Integer, Value::Int(_))
                | (ColumnType::Float, Value::Float(_) | Value::Int(_))
                | (ColumnType::Text, Value::Text(_))
                | (ColumnType::Boolean, Value::Bool(_))
        )
    }

    /// Normalizes an accepted value to the column's storage type (`Int` into a `Float` column becomes `Float`).
    pub fn cast(&self, value: Value) -> Value {
        match (self, value) {
            (ColumnType::Float, Value::Int(v)) => Value::Float(v as f64),
            (_, value) => value,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
            ColumnType::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    BelongsTo,
    HasOne,
    HasMany,
}

impl AssociationKind {
    pub fn is_singular(&self) -> bool {
        !matches!(self, AssociationKind::HasMany)
    }
}

/// Relationship from an owning model to `target`.
///
/// For `BelongsTo` the foreign key lives on the owner; for `HasOne`/`HasMany` it lives on the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationDef {
    pub name: String,
    pub kind: AssociationKind,
    pub target: String,
    pub foreign_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDef {
    pub name: String,
    pub table_name: String,
    pub columns: Vec<ColumnDef>,
    pub associations: Vec<AssociationDef>,
}

impl ModelDef {
    pub fn new(name: &str) -> Self {
        ModelDef {
            name: name.to_string(),
            table_name: format!("{}s", underscore(name)),
            columns: Vec::new(),
            associations: Vec::new(),
        }
    }

    pub fn with_table_name(mut self, table_name: &str) -> Self {
        self.table_name = table_name.to_string();
        self
    }

    pub fn with_column(mut self, name: &str, ty: ColumnType) -> Self {
        self.add_column(name, ty);
        self
    }

    /// `role` names the target by convention: `product` targets `Product` through `product_id`.
    pub fn with_belongs_to(mut self, role: &str) -> Self {
        self.add_belongs_to(role);
        self
    }

    pub fn with_has_one(mut self, role: &str, target: &str) -> Self {
        self.add_owned(role, target, AssociationKind::HasOne);
        self
    }

    pub fn with_has_many(mut self, role: &str, target: &str) -> Self {
        self.add_owned(role, target, AssociationKind::HasMany);
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn association(&self, name: &str) -> Option<&AssociationDef> {
        self.associations.iter().find(|a| a.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn association_names(&self) -> impl Iterator<Item = &str> {
        self.associations.iter().map(|a| a.name.as_str())
    }

    /// Appends a column unless one with the same name exists. Returns whether it was added.
    pub(crate) fn add_column(&mut self, name: &str, ty: ColumnType) -> bool {
        if self.has_column(name) {
            return false;
        }
        self.columns.push(ColumnDef { name: name.to_string(), ty });
        true
    }

    pub(crate) fn add_belongs_to(&mut self, role: &str) -> &AssociationDef {
        let foreign_key = foreign_key_for(role);
        self.add_column(&foreign_key, ColumnType::Integer);
        self.push_association(AssociationDef {
            name: role.to_string(),
            kind: AssociationKind::BelongsTo,
            target: class_name_for(role),
            foreign_key,
        })
    }

    fn add_owned(&mut self, role: &str, target: &str, kind: AssociationKind) {
        let foreign_key = foreign_key_for(&underscore(&self.name));
        self.push_association(AssociationDef { name: role.to_string(), kind, target: target.to_string(), foreign_key });
    }

    fn push_association(&mut self, def: AssociationDef) -> &AssociationDef {
        let idx = match self.associations.iter().position(|a| a.name == def.name) {
            Some(idx) => {
                self.associations[idx] = def;
                idx
            }
            None => {
                self.associations.push(def);
                self.associations.len() - 1
            }
        };
        &self.associations[idx]
    }
}

/// `product` -> `Product`, `line_item` -> `LineItem`.
pub fn class_name_for(role: &str) -> String {
    role.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// `LineItem` -> `line_item`.
pub fn underscore(class_name: &str) -> String {
    let mut out = String::with_capacity(class_name.len() + 4);
    for (i, ch) in class_name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

pub fn foreign_key_for(role: &str) -> String {
    format!("{role}_id")
}
