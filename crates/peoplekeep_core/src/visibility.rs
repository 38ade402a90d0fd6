//! Visibility filter over the store's people.
//!
//! Hidden people are only visible to privileged viewers. Id lookups do not
//! go through this filter.

use crate::model::person::Person;

/// Session collaborator supplying the viewer identity and privilege.
pub trait ViewerSession {
    fn viewer_id(&self) -> Option<&str>;
    fn is_privileged(&self) -> bool;
}

/// Plain viewer value for callers without their own session type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Viewer {
    id: Option<String>,
    privileged: bool,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn member(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            privileged: false,
        }
    }

    pub fn privileged(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            privileged: true,
        }
    }
}

impl ViewerSession for Viewer {
    fn viewer_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn is_privileged(&self) -> bool {
        self.privileged
    }
}

pub fn is_visible(person: &Person, is_privileged: bool) -> bool {
    is_privileged || !person.is_hidden
}

/// Returns the people visible under `is_privileged`, preserving order.
pub fn visible<'a, I>(people: I, is_privileged: bool) -> Vec<&'a Person>
where
    I: IntoIterator<Item = &'a Person>,
{
    people
        .into_iter()
        .filter(|person| is_visible(person, is_privileged))
        .collect()
}
