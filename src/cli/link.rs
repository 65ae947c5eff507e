//! Link CLI command: relationship edits through the relation graph.

use crate::config::KinshipConfig;
use crate::models::{graph::ParentRole, PersonId, RelationGraph};
use crate::store::{FilesystemStore, RecordStore};
use crate::Result;

/// The relation to edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LinkKind {
    /// Set `b` as the father of `a`.
    Father,
    /// Set `b` as the mother of `a`.
    Mother,
    /// Link `a` and `b` as spouses.
    Spouse,
    /// Link `a` and `b` as siblings.
    Sibling,
}

/// Runs the link command.
///
/// All edits go through [`RelationGraph`], so the paired edge is always
/// written too, and the whole population is saved back in one pass.
///
/// # Errors
///
/// Returns an error if either id is unknown or the store cannot be
/// written.
pub fn cmd_link(
    config: &KinshipConfig,
    kind: LinkKind,
    a: &str,
    b: &str,
    remove: bool,
) -> Result<()> {
    let store = FilesystemStore::new(&config.data_dir);
    let mut graph = RelationGraph::from_people(store.read_all()?);

    let a = PersonId::new(a);
    let b = PersonId::new(b);
    match (kind, remove) {
        (LinkKind::Father, false) => graph.set_parent(&a, Some(&b), ParentRole::Father)?,
        (LinkKind::Father, true) => graph.set_parent(&a, None, ParentRole::Father)?,
        (LinkKind::Mother, false) => graph.set_parent(&a, Some(&b), ParentRole::Mother)?,
        (LinkKind::Mother, true) => graph.set_parent(&a, None, ParentRole::Mother)?,
        (LinkKind::Spouse, false) => graph.add_spouse(&a, &b)?,
        (LinkKind::Spouse, true) => graph.remove_spouse(&a, &b),
        (LinkKind::Sibling, false) => graph.add_sibling(&a, &b)?,
        (LinkKind::Sibling, true) => graph.remove_sibling(&a, &b),
    }

    store.save_all(&graph.into_people())?;
    println!("{} {} {:?} {}", if remove { "Unlinked" } else { "Linked" }, a, kind, b);
    Ok(())
}
