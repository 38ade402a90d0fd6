//! Symmetric relationship edges and their store operations.
//!
//! Each relationship is one undirected edge `{a, b, kind}`. Both people see
//! it in their projected `relationships` list with the same type, so the
//! mirrored side can never drift.

use super::{require_text, EntityKind, EntityStore, StoreError, StoreResult};
use crate::model::person::PersonId;
use crate::model::relationship::{Relationship, DEFAULT_RELATIONSHIP_TYPES};
use crate::storage::Collection;
use log::info;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Edge {
    a: PersonId,
    b: PersonId,
    kind: String,
}

impl Edge {
    fn joins(&self, first: &str, second: &str) -> bool {
        (self.a == first && self.b == second) || (self.a == second && self.b == first)
    }

    fn touches(&self, person_id: &str) -> bool {
        self.a == person_id || self.b == person_id
    }

    fn other(&self, person_id: &str) -> Option<&str> {
        if self.a == person_id {
            Some(self.b.as_str())
        } else if self.b == person_id {
            Some(self.a.as_str())
        } else {
            None
        }
    }
}

/// Unordered-pair edge set in insertion order.
#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    edges: Vec<Edge>,
}

impl RelationshipGraph {
    /// Adds an edge between two distinct people.
    ///
    /// Returns `false` for self-links and for pairs that are already linked.
    pub fn insert(&mut self, first: &str, second: &str, kind: &str) -> bool {
        if first == second || self.contains(first, second) {
            return false;
        }
        self.edges.push(Edge {
            a: first.to_string(),
            b: second.to_string(),
            kind: kind.to_string(),
        });
        true
    }

    pub fn remove(&mut self, first: &str, second: &str) -> bool {
        let before = self.edges.len();
        self.edges.retain(|edge| !edge.joins(first, second));
        before != self.edges.len()
    }

    /// Drops every edge touching `person_id`; returns how many were dropped.
    pub fn remove_person(&mut self, person_id: &str) -> usize {
        let before = self.edges.len();
        self.edges.retain(|edge| !edge.touches(person_id));
        before - self.edges.len()
    }

    pub fn contains(&self, first: &str, second: &str) -> bool {
        self.edges.iter().any(|edge| edge.joins(first, second))
    }

    /// Relationships as seen from `person_id`.
    pub fn for_person(&self, person_id: &str) -> Vec<Relationship> {
        self.edges
            .iter()
            .filter_map(|edge| {
                edge.other(person_id)
                    .map(|other| Relationship::new(other, edge.kind.clone()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl EntityStore {
    /// Links two people symmetrically.
    ///
    /// Returns `Ok(false)` when the pair is already linked; the existing
    /// type is kept.
    ///
    /// # Errors
    /// - `InvalidOperation` for self-relationships or a blank type.
    /// - `NotFound` when either person is unknown.
    pub fn add_relationship(
        &mut self,
        person_id: &str,
        related_person_id: &str,
        kind: &str,
    ) -> StoreResult<bool> {
        if person_id == related_person_id {
            return Err(StoreError::InvalidOperation(
                "a person cannot be related to themselves".to_string(),
            ));
        }
        let kind = require_text(kind, "relationship type")?;
        for id in [person_id, related_person_id] {
            if !self.contains_person(id) {
                return Err(StoreError::not_found(EntityKind::Person, id));
            }
        }

        if !self.relationships.insert(person_id, related_person_id, &kind) {
            info!(
                "event=relationship_add module=store status=skipped person_id={} related_person_id={}",
                person_id, related_person_id
            );
            return Ok(false);
        }

        info!(
            "event=relationship_add module=store status=ok person_id={} related_person_id={}",
            person_id, related_person_id
        );
        self.persist("add_relationship", &[Collection::People]);
        Ok(true)
    }

    /// Removes the link between two people from both sides.
    ///
    /// Returns `Ok(false)` when they were not linked.
    pub fn remove_relationship(
        &mut self,
        person_id: &str,
        related_person_id: &str,
    ) -> StoreResult<bool> {
        if !self.contains_person(person_id) {
            return Err(StoreError::not_found(EntityKind::Person, person_id));
        }
        if !self.relationships.remove(person_id, related_person_id) {
            return Ok(false);
        }

        info!(
            "event=relationship_remove module=store status=ok person_id={} related_person_id={}",
            person_id, related_person_id
        );
        self.persist("remove_relationship", &[Collection::People]);
        Ok(true)
    }

    pub fn relationships_of(&self, person_id: &str) -> Vec<Relationship> {
        self.relationships.for_person(person_id)
    }

    /// Suggested types followed by any other type already in use.
    pub fn relationship_types(&self) -> Vec<String> {
        let mut types: Vec<String> = DEFAULT_RELATIONSHIP_TYPES
            .iter()
            .map(|kind| kind.to_string())
            .collect();
        for edge in &self.relationships.edges {
            if !types.contains(&edge.kind) {
                types.push(edge.kind.clone());
            }
        }
        types
    }
}
