//! Table inheritance: a child model delegates the columns and associations it lacks to a parent
//! record living in the parent's own table.
//!
//! [`declare_inheritance`] runs once per child class at startup. It diffs the parent schema
//! against the child's, records a [`Delegate`] per missing member in the child's delegation table
//! and registers the lifecycle hooks that create and persist the parent. At runtime the generic
//! entry points of [`ModelRegistry`] dispatch through that table, building the parent lazily via
//! [`ensure_parent_link`].
//!
//! Parent and child are written in separate store transactions, parent first. If the child's own
//! write fails after the parent was saved, the parent row stays behind.

use crate::error::AppError;
use crate::record::Record;
use crate::registry::{Hook, ModelRegistry};
use crate::schema::{class_name_for, ColumnType, ModelDef, DISCRIMINATOR};
use crate::session::Session;
use crate::{debug, info, warn};
use std::sync::Arc;

/// Accepted for forward compatibility; no option changes behavior yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct InheritOptions {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Attribute,
    Association,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegatedMember {
    pub name: String,
    pub kind: MemberKind,
}

/// Delegation table entry: which parent role answers for a member, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delegate {
    pub role: String,
    pub kind: MemberKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inheritance {
    role: String,
    parent: String,
    foreign_key: String,
    members: Vec<DelegatedMember>,
    options: InheritOptions,
}

impl Inheritance {
    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn parent(&self) -> &str {
        &self.parent
    }

    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    pub fn members(&self) -> &[DelegatedMember] {
        &self.members
    }

    pub fn options(&self) -> &InheritOptions {
        &self.options
    }
}

/// Parent columns and associations the child does not define itself.
///
/// The discriminator and the inheritance role are never delegated.
pub fn delegated_members(parent: &ModelDef, child: &ModelDef, role: &str) -> Vec<DelegatedMember> {
    let excluded = |name: &str| {
        name == DISCRIMINATOR || name == role || child.has_column(name) || child.association(name).is_some()
    };
    let attributes = parent
        .column_names()
        .filter(|name| !excluded(name))
        .map(|name| DelegatedMember { name: name.to_string(), kind: MemberKind::Attribute });
    let associations = parent
        .association_names()
        .filter(|name| !excluded(name))
        .map(|name| DelegatedMember { name: name.to_string(), kind: MemberKind::Association });
    attributes.chain(associations).collect()
}

/// Makes `child` inherit from the class named by `role` (`product` -> `Product`).
///
/// Both classes are resolved before anything is registered, so a [`AppError::Resolution`]
/// leaves the child untouched.
pub fn declare_inheritance(registry: &mut ModelRegistry, child: &str, role: &str, options: InheritOptions) -> Result<(), AppError> {
    let parent_name = class_name_for(role);
    let child_class = registry.resolve_class_by_name(child)?;
    if child_class.inheritance(role).is_some() {
        return Err(AppError::Schema(format!("{child} already inherits through `{role}`")));
    }
    if parent_name == child {
        return Err(AppError::Schema(format!("{child} cannot inherit from itself")));
    }
    let parent_def = registry.resolve_class_by_name(&parent_name)?.def().clone();

    let assoc = registry.declare_belongs_to(child, role)?;
    registry.class_mut(&parent_name)?.def_mut().add_column(DISCRIMINATOR, ColumnType::Text);

    let child_class = registry.class_mut(child)?;
    let mut members = Vec::new();
    for member in delegated_members(&parent_def, child_class.def(), role) {
        let delegate = Delegate { role: role.to_string(), kind: member.kind };
        if child_class.add_delegate(&member.name, delegate) {
            members.push(member);
        } else {
            warn!("{child}.{} is already delegated, skipping it for `{role}`", member.name);
        }
    }
    let delegated = members.len();
    child_class.add_inheritance(Inheritance {
        role: role.to_string(),
        parent: parent_name.clone(),
        foreign_key: assoc.foreign_key,
        members,
        options,
    });

    registry.declare_validates_presence_of_association(child, role)?;
    registry.register_before_validation(child, link_parent_hook(role.to_string()))?;
    registry.register_before_create(child, save_parent_hook(role.to_string()))?;
    registry.register_before_update(child, save_parent_hook(role.to_string()))?;
    info!("{child} inherits from {parent_name} through `{role}` with {delegated} delegated members");
    Ok(())
}

/// Builds the parent of a new record on first use and stamps it with the record's class name.
///
/// Idempotent: persisted records and records already linked are left alone.
pub fn ensure_parent_link(registry: &ModelRegistry, record: &mut Record, role: &str) -> Result<(), AppError> {
    if !record.is_new_record() || record.linked(role).is_some() {
        return Ok(());
    }
    let concrete = record.model().to_string();
    let parent = registry.build_linked_object(record, role)?;
    debug!("Built {} parent for new {concrete} through `{role}`", parent.model());
    Ok(())
}

/// The parent a delegated `member` is forwarded to.
pub(crate) fn delegation_target<'a>(registry: &ModelRegistry, record: &'a mut Record, role: &str, member: &str) -> Result<&'a mut Record, AppError> {
    ensure_parent_link(registry, record, role)?;
    let model = record.model().to_string();
    record.linked_mut(role).ok_or_else(|| AppError::DelegationTargetMissing {
        model,
        role: role.to_string(),
        member: member.to_string(),
    })
}

fn link_parent_hook(role: String) -> Hook {
    Arc::new(move |record: &mut Record, session: &Session<'_>| ensure_parent_link(session.registry(), record, &role))
}

fn save_parent_hook(role: String) -> Hook {
    Arc::new(move |record: &mut Record, session: &Session<'_>| {
        let parent = delegation_target(session.registry(), record, &role, "save")?;
        match session.save(parent) {
            Ok(()) => Ok(()),
            Err(source) => {
                warn!("{} parent `{role}` failed to save: {source}", record.model());
                Err(AppError::Persistence {
                    model: record.model().to_string(),
                    role: role.clone(),
                    source: Box::new(source),
                })
            }
        }
    })
}
