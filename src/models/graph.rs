//! Family relation graph with symmetric-edge maintenance.
//!
//! The sync engine treats relational fields as opaque data; this module is
//! the one place that mutates them. Every mutation keeps the paired edge in
//! step: linking a father updates the father's `children` list, adding a
//! sibling or spouse writes both directions, and removing a person drops
//! every edge that pointed at them.

use super::{Person, PersonId};
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Parent role used when linking a child to a parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRole {
    /// The `father` back-reference.
    Father,
    /// The `mother` back-reference.
    Mother,
}

/// An arena of person nodes indexed by id.
///
/// Backed by a `BTreeMap` so iteration order is stable (ascending id),
/// which keeps `save_all` output deterministic.
#[derive(Debug, Default, Clone)]
pub struct RelationGraph {
    people: BTreeMap<PersonId, Person>,
}

impl RelationGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from a population, keeping edges exactly as given.
    ///
    /// Call [`RelationGraph::repair_symmetry`] afterwards to normalize a
    /// population loaded from an older store.
    #[must_use]
    pub fn from_people(people: Vec<Person>) -> Self {
        Self {
            people: people.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    /// Consumes the graph, returning the population in ascending id order.
    #[must_use]
    pub fn into_people(self) -> Vec<Person> {
        self.people.into_values().collect()
    }

    /// Returns the number of people in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.people.len()
    }

    /// Returns whether the graph is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    /// Looks up a person by id.
    #[must_use]
    pub fn get(&self, id: &PersonId) -> Option<&Person> {
        self.people.get(id)
    }

    /// Returns whether the graph contains the id.
    #[must_use]
    pub fn contains(&self, id: &PersonId) -> bool {
        self.people.contains_key(id)
    }

    /// Inserts or replaces a person node without touching edges.
    pub fn insert(&mut self, person: Person) {
        self.people.insert(person.id.clone(), person);
    }

    /// Removes a person and every edge pointing at them.
    ///
    /// Returns the removed record, or `None` if the id was unknown.
    pub fn remove_person(&mut self, id: &PersonId) -> Option<Person> {
        let removed = self.people.remove(id)?;
        for person in self.people.values_mut() {
            if person.father.as_ref() == Some(id) {
                person.father = None;
            }
            if person.mother.as_ref() == Some(id) {
                person.mother = None;
            }
            person.children.retain(|c| c != id);
            person.siblings.retain(|s| s != id);
            person.spouse.retain(|s| s != id);
        }
        Some(removed)
    }

    /// Links `child` to `parent` in the given role, maintaining the
    /// parent's `children` list and unlinking any previous parent.
    ///
    /// Pass `None` to clear the role.
    ///
    /// # Errors
    ///
    /// Returns an error if either id is unknown or the child would parent
    /// themselves.
    pub fn set_parent(
        &mut self,
        child: &PersonId,
        parent: Option<&PersonId>,
        role: ParentRole,
    ) -> Result<()> {
        if !self.people.contains_key(child) {
            return Err(unknown_person(child));
        }
        if let Some(parent) = parent {
            if parent == child {
                return Err(Error::InvalidInput(format!(
                    "person '{child}' cannot be their own parent"
                )));
            }
            if !self.people.contains_key(parent) {
                return Err(unknown_person(parent));
            }
        }

        let Some(record) = self.people.get_mut(child) else {
            return Err(unknown_person(child));
        };
        let previous = match role {
            ParentRole::Father => record.father.replace_with(parent),
            ParentRole::Mother => record.mother.replace_with(parent),
        };

        // Unlink the previous parent unless they still hold the other role.
        if let Some(previous) = previous {
            if !self.is_parent_of(&previous, child) {
                if let Some(record) = self.people.get_mut(&previous) {
                    record.children.retain(|c| c != child);
                }
            }
        }

        if let Some(record) = parent.and_then(|parent| self.people.get_mut(parent)) {
            if !record.children.contains(child) {
                record.children.push(child.clone());
            }
        }

        self.touch(child);
        Ok(())
    }

    /// Adds a symmetric sibling edge between `a` and `b`.
    ///
    /// # Errors
    ///
    /// Returns an error if either id is unknown or `a == b`.
    pub fn add_sibling(&mut self, a: &PersonId, b: &PersonId) -> Result<()> {
        self.add_symmetric(a, b, |p| &mut p.siblings)
    }

    /// Removes the sibling edge between `a` and `b`, both directions.
    pub fn remove_sibling(&mut self, a: &PersonId, b: &PersonId) {
        self.remove_symmetric(a, b, |p| &mut p.siblings);
    }

    /// Adds a symmetric spouse edge between `a` and `b`.
    ///
    /// # Errors
    ///
    /// Returns an error if either id is unknown or `a == b`.
    pub fn add_spouse(&mut self, a: &PersonId, b: &PersonId) -> Result<()> {
        self.add_symmetric(a, b, |p| &mut p.spouse)
    }

    /// Removes the spouse edge between `a` and `b`, both directions.
    pub fn remove_spouse(&mut self, a: &PersonId, b: &PersonId) {
        self.remove_symmetric(a, b, |p| &mut p.spouse);
    }

    /// Normalizes a loaded population: drops edges pointing at unknown ids
    /// and writes the missing half of asymmetric sibling/spouse edges and
    /// parent back-references.
    ///
    /// Returns the number of edges fixed. Children entries whose target
    /// names neither parent are left alone — the role cannot be inferred.
    pub fn repair_symmetry(&mut self) -> usize {
        let ids: Vec<PersonId> = self.people.keys().cloned().collect();
        let mut fixed = 0;

        for id in &ids {
            fixed += self.drop_dangling_edges(id);
        }

        for id in &ids {
            let person = &self.people[id];
            let father = person.father.clone();
            let mother = person.mother.clone();
            let siblings = person.siblings.clone();
            let spouses = person.spouse.clone();

            // Dangling edges were dropped above, so the lookups hit.
            for parent in [father, mother].into_iter().flatten() {
                if let Some(record) = self.people.get_mut(&parent) {
                    if !record.children.contains(id) {
                        record.children.push(id.clone());
                        fixed += 1;
                    }
                }
            }
            for sibling in siblings {
                if let Some(record) = self.people.get_mut(&sibling) {
                    if !record.siblings.contains(id) {
                        record.siblings.push(id.clone());
                        fixed += 1;
                    }
                }
            }
            for spouse in spouses {
                if let Some(record) = self.people.get_mut(&spouse) {
                    if !record.spouse.contains(id) {
                        record.spouse.push(id.clone());
                        fixed += 1;
                    }
                }
            }
        }

        if fixed > 0 {
            tracing::info!(fixed, "repaired asymmetric relation edges");
        }
        fixed
    }

    fn drop_dangling_edges(&mut self, id: &PersonId) -> usize {
        let known: Vec<PersonId> = self.people.keys().cloned().collect();
        let Some(person) = self.people.get_mut(id) else {
            return 0;
        };
        let mut dropped = 0;

        if let Some(f) = &person.father {
            if !known.contains(f) {
                person.father = None;
                dropped += 1;
            }
        }
        if let Some(m) = &person.mother {
            if !known.contains(m) {
                person.mother = None;
                dropped += 1;
            }
        }
        for list in [
            &mut person.children,
            &mut person.siblings,
            &mut person.spouse,
        ] {
            let before = list.len();
            list.retain(|e| known.contains(e));
            dropped += before - list.len();
        }
        dropped
    }

    fn is_parent_of(&self, parent: &PersonId, child: &PersonId) -> bool {
        self.people.get(child).is_some_and(|c| {
            c.father.as_ref() == Some(parent) || c.mother.as_ref() == Some(parent)
        })
    }

    fn add_symmetric(
        &mut self,
        a: &PersonId,
        b: &PersonId,
        list: impl Fn(&mut Person) -> &mut Vec<PersonId>,
    ) -> Result<()> {
        if a == b {
            return Err(Error::InvalidInput(format!(
                "person '{a}' cannot be linked to themselves"
            )));
        }
        if !self.people.contains_key(a) {
            return Err(unknown_person(a));
        }
        if !self.people.contains_key(b) {
            return Err(unknown_person(b));
        }

        for (from, to) in [(a, b), (b, a)] {
            let record = self.people.get_mut(from).expect("checked above");
            let edges = list(record);
            if !edges.contains(to) {
                edges.push(to.clone());
            }
        }
        self.touch(a);
        self.touch(b);
        Ok(())
    }

    fn remove_symmetric(
        &mut self,
        a: &PersonId,
        b: &PersonId,
        list: impl Fn(&mut Person) -> &mut Vec<PersonId>,
    ) {
        for (from, to) in [(a, b), (b, a)] {
            if let Some(record) = self.people.get_mut(from) {
                list(record).retain(|e| e != to);
            }
        }
        self.touch(a);
        self.touch(b);
    }

    fn touch(&mut self, id: &PersonId) {
        if let Some(record) = self.people.get_mut(id) {
            record.touch();
        }
    }
}

fn unknown_person(id: &PersonId) -> Error {
    Error::InvalidInput(format!("unknown person id '{id}'"))
}

/// Replace-with helper for `Option<PersonId>` that returns the old value.
trait ReplaceWith {
    fn replace_with(&mut self, value: Option<&PersonId>) -> Option<PersonId>;
}

impl ReplaceWith for Option<PersonId> {
    fn replace_with(&mut self, value: Option<&PersonId>) -> Option<PersonId> {
        std::mem::replace(self, value.cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(ids: &[&str]) -> RelationGraph {
        RelationGraph::from_people(ids.iter().map(|id| Person::new(*id)).collect())
    }

    #[test]
    fn test_set_parent_maintains_children() {
        let mut graph = graph_with(&["100", "201"]);
        graph
            .set_parent(&PersonId::new("201"), Some(&PersonId::new("100")), ParentRole::Father)
            .unwrap();

        assert_eq!(
            graph.get(&PersonId::new("201")).unwrap().father,
            Some(PersonId::new("100"))
        );
        assert_eq!(
            graph.get(&PersonId::new("100")).unwrap().children,
            vec![PersonId::new("201")]
        );
    }

    #[test]
    fn test_reparenting_unlinks_previous_father() {
        let mut graph = graph_with(&["100", "101", "201"]);
        let child = PersonId::new("201");
        graph
            .set_parent(&child, Some(&PersonId::new("100")), ParentRole::Father)
            .unwrap();
        graph
            .set_parent(&child, Some(&PersonId::new("101")), ParentRole::Father)
            .unwrap();

        assert!(graph.get(&PersonId::new("100")).unwrap().children.is_empty());
        assert_eq!(
            graph.get(&PersonId::new("101")).unwrap().children,
            vec![child]
        );
    }

    #[test]
    fn test_dual_role_parent_keeps_child_entry() {
        // Same person holds father and mother roles; clearing one keeps the
        // child listed under the other.
        let mut graph = graph_with(&["100", "201"]);
        let child = PersonId::new("201");
        let parent = PersonId::new("100");
        graph.set_parent(&child, Some(&parent), ParentRole::Father).unwrap();
        graph.set_parent(&child, Some(&parent), ParentRole::Mother).unwrap();

        graph.set_parent(&child, None, ParentRole::Father).unwrap();
        assert_eq!(graph.get(&parent).unwrap().children, vec![child]);
    }

    #[test]
    fn test_sibling_edges_are_symmetric() {
        let mut graph = graph_with(&["201", "202"]);
        let a = PersonId::new("201");
        let b = PersonId::new("202");
        graph.add_sibling(&a, &b).unwrap();

        assert_eq!(graph.get(&a).unwrap().siblings, vec![b.clone()]);
        assert_eq!(graph.get(&b).unwrap().siblings, vec![a.clone()]);

        graph.remove_sibling(&a, &b);
        assert!(graph.get(&a).unwrap().siblings.is_empty());
        assert!(graph.get(&b).unwrap().siblings.is_empty());
    }

    #[test]
    fn test_spouse_self_edge_rejected() {
        let mut graph = graph_with(&["100"]);
        let id = PersonId::new("100");
        assert!(graph.add_spouse(&id, &id).is_err());
    }

    #[test]
    fn test_remove_person_drops_incoming_edges() {
        let mut graph = graph_with(&["100", "201", "202"]);
        let parent = PersonId::new("100");
        let a = PersonId::new("201");
        let b = PersonId::new("202");
        graph.set_parent(&a, Some(&parent), ParentRole::Father).unwrap();
        graph.set_parent(&b, Some(&parent), ParentRole::Father).unwrap();
        graph.add_sibling(&a, &b).unwrap();

        graph.remove_person(&a);

        assert_eq!(graph.get(&parent).unwrap().children, vec![b.clone()]);
        assert!(graph.get(&b).unwrap().siblings.is_empty());
    }

    #[test]
    fn test_repair_symmetry_adds_missing_half() {
        let mut a = Person::new("201");
        a.siblings.push(PersonId::new("202"));
        let b = Person::new("202");
        let mut child = Person::new("301");
        child.father = Some(PersonId::new("201"));

        let mut graph = RelationGraph::from_people(vec![a, b, child]);
        let fixed = graph.repair_symmetry();

        assert_eq!(fixed, 2);
        assert_eq!(
            graph.get(&PersonId::new("202")).unwrap().siblings,
            vec![PersonId::new("201")]
        );
        assert_eq!(
            graph.get(&PersonId::new("201")).unwrap().children,
            vec![PersonId::new("301")]
        );
    }

    #[test]
    fn test_repair_symmetry_drops_dangling_edges() {
        let mut a = Person::new("201");
        a.spouse.push(PersonId::new("999"));
        a.father = Some(PersonId::new("998"));

        let mut graph = RelationGraph::from_people(vec![a]);
        let fixed = graph.repair_symmetry();

        assert_eq!(fixed, 2);
        let repaired = graph.get(&PersonId::new("201")).unwrap();
        assert!(repaired.spouse.is_empty());
        assert!(repaired.father.is_none());
    }

    #[test]
    fn test_into_people_is_id_ordered() {
        let graph = graph_with(&["300", "100", "200"]);
        let ids: Vec<String> = graph
            .into_people()
            .into_iter()
            .map(|p| p.id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["100", "200", "300"]);
    }
}
