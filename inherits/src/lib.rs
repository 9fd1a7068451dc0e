//! inherits adds table inheritance to a small record layer persisted in
//! [Redb](https://github.com/cberner/redb).
//!
//! A child model (`Book`, `Video`) declares that it inherits from a parent model (`Product`) through a
//! belongs-to role. The child stores only its own columns, every parent column and association becomes
//! readable and writable on the child, the parent row is created lazily and stamped with the child's class
//! name in its `type` column, and saving the child saves the parent first.
//!
//! Rows are encoded with `bincode` and kept in two redb tables, one for records and one for id sequences.
//!

pub mod logger;
pub mod macro_rules;
pub mod error;
pub mod value;
pub mod schema;
pub mod record;
pub mod registry;
pub mod validation;
pub mod inherit;
pub mod storage;
pub mod session;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::AppError;
pub use inherit::{declare_inheritance, delegated_members, ensure_parent_link, Delegate, DelegatedMember, InheritOptions, Inheritance, MemberKind};
pub use record::Record;
pub use registry::{Assign, Hook, HookKind, Linked, ModelClass, ModelRegistry};
pub use schema::{class_name_for, foreign_key_for, underscore, AssociationDef, AssociationKind, ColumnDef, ColumnType, ModelDef, DISCRIMINATOR};
pub use session::Session;
pub use storage::{Store, StoreConfig};
pub use validation::{FieldError, Validation, ValidationErrors};
pub use value::{attributes_from_json, Attributes, Value};

pub use redb;
pub use serde_json;
