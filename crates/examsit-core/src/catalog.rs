//! Ordered section catalog and the unlock rule.
//!
//! Sections are taken in strict `order_index` order: a section is
//! selectable iff it is first, or its predecessor is completed. Locked
//! sections are still listed so callers can render them disabled rather
//! than hide them.

use crate::model::{Section, SectionStatus};

/// The ordered list of sections for an attempt.
#[derive(Debug, Clone, Default)]
pub struct SectionCatalog {
    sections: Vec<Section>,
}

impl SectionCatalog {
    /// Build a catalog, sorting by `order_index`.
    pub fn new(mut sections: Vec<Section>) -> Self {
        sections.sort_by_key(|s| s.order_index);
        Self { sections }
    }

    /// Replace the catalog contents with a fresh server listing.
    pub fn refresh(&mut self, sections: Vec<Section>) {
        *self = Self::new(sections);
    }

    /// All sections in order, locked ones included.
    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn by_id(&self, section_id: i64) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == section_id)
    }

    /// Whether the section at position `index` is selectable.
    pub fn is_unlocked(&self, index: usize) -> bool {
        if index >= self.sections.len() {
            return false;
        }
        index == 0 || self.sections[index - 1].status == SectionStatus::Completed
    }

    /// The first section the student can actually take: unlocked and not
    /// yet completed. `None` when every section is done.
    pub fn first_open(&self) -> Option<&Section> {
        self.sections
            .iter()
            .enumerate()
            .find(|(i, s)| s.status != SectionStatus::Completed && self.is_unlocked(*i))
            .map(|(_, s)| s)
    }

    /// Whether every section is completed.
    pub fn all_completed(&self) -> bool {
        !self.sections.is_empty()
            && self
                .sections
                .iter()
                .all(|s| s.status == SectionStatus::Completed)
    }
}
