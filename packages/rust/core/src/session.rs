//! Viewer session state: the parsed document, the active section, and
//! fencing of late generation responses.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use annotator_markup::parse_document;
use annotator_shared::{AnnotatorError, Result, Section, SubsectionMode};
use tracing::debug;

/// Generation stamp handed out when a remote request starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

/// Monotonic generation counter. Only the newest ticket is current.
#[derive(Debug, Default)]
pub struct RequestTracker {
    generation: AtomicU64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate every outstanding ticket and return a fresh one.
    pub fn advance(&self) -> Ticket {
        Ticket(self.generation.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.generation.load(Ordering::Acquire) == ticket.0
    }
}

pub struct Session {
    sections: Arc<[Section]>,
    active: Option<usize>,
    tracker: RequestTracker,
}

impl Session {
    /// Start on the first section, if any.
    pub fn new(sections: Vec<Section>) -> Self {
        let active = (!sections.is_empty()).then_some(0);
        Self {
            sections: sections.into(),
            active,
            tracker: RequestTracker::new(),
        }
    }

    pub fn from_document(raw: &str, mode: SubsectionMode) -> Self {
        Self::new(parse_document(raw, mode))
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Cheap handle to the section list for work that outlives a borrow.
    pub fn shared_sections(&self) -> Arc<[Section]> {
        Arc::clone(&self.sections)
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Closest preceding level-1 section of a subsection.
    pub fn parent_of(&self, id: &str) -> Option<&Section> {
        let index = self.sections.iter().position(|s| s.id == id)?;
        if !self.sections[index].is_subsection() {
            return None;
        }
        self.sections[..index].iter().rev().find(|s| !s.is_subsection())
    }

    pub fn active(&self) -> Option<&Section> {
        self.active.map(|i| &self.sections[i])
    }

    /// Make `id` the active section. Switching sections invalidates every
    /// in-flight request.
    pub fn select(&mut self, id: &str) -> Result<&Section> {
        let index = self
            .sections
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| AnnotatorError::validation(format!("unknown section '{id}'")))?;

        if self.active != Some(index) {
            self.active = Some(index);
            self.tracker.advance();
            debug!(section = id, "section selected");
        }
        Ok(&self.sections[index])
    }

    /// Start a remote request; any earlier request becomes stale.
    pub fn begin_request(&self) -> Ticket {
        self.tracker.advance()
    }

    /// Pass `value` through only if `ticket` is still current.
    pub fn accept<T>(&self, ticket: Ticket, value: T) -> Option<T> {
        if self.tracker.is_current(ticket) {
            Some(value)
        } else {
            debug!(?ticket, "discarding stale response");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(id: &str, level: u8) -> Section {
        Section {
            id: id.into(),
            title: id.into(),
            level,
            content: String::new(),
        }
    }

    fn session() -> Session {
        Session::new(vec![
            section("abstract", 1),
            section("intro", 1),
            section("intro-setup", 2),
            section("intro-goal", 2),
            section("method", 1),
        ])
    }

    #[test]
    fn starts_on_first_section() {
        assert_eq!(session().active().unwrap().id, "abstract");
        assert!(Session::new(vec![]).active().is_none());
    }

    #[test]
    fn select_unknown_is_validation_error() {
        let mut s = session();
        assert!(s.select("nope").unwrap_err().is_validation());
        assert_eq!(s.active().unwrap().id, "abstract");
    }

    #[test]
    fn parent_lookup() {
        let s = session();
        assert_eq!(s.parent_of("intro-goal").unwrap().id, "intro");
        assert!(s.parent_of("method").is_none());
        assert!(s.parent_of("missing").is_none());
    }

    #[test]
    fn response_for_previous_section_is_discarded() {
        let mut s = session();
        let ticket = s.begin_request();
        s.select("method").unwrap();
        assert_eq!(s.accept(ticket, "late explanation"), None);

        let fresh = s.begin_request();
        assert_eq!(s.accept(fresh, "current"), Some("current"));
    }

    #[test]
    fn newer_request_supersedes_older() {
        let s = session();
        let first = s.begin_request();
        let second = s.begin_request();
        assert!(first < second);
        assert_eq!(s.accept(first, 1), None);
        assert_eq!(s.accept(second, 2), Some(2));
    }

    #[test]
    fn reselecting_active_section_keeps_ticket() {
        let mut s = session();
        let ticket = s.begin_request();
        s.select("abstract").unwrap();
        assert_eq!(s.accept(ticket, ()), Some(()));
    }

    #[tokio::test]
    async fn late_task_result_is_fenced() {
        let mut s = session();
        let ticket = s.begin_request();
        let task = tokio::spawn(async { "slow answer".to_string() });

        s.select("intro").unwrap();
        let answer = task.await.unwrap();
        assert!(s.accept(ticket, answer).is_none());
    }

    #[test]
    fn shared_sections_are_the_same_allocation() {
        let s = session();
        assert!(Arc::ptr_eq(&s.shared_sections(), &s.shared_sections()));
    }
}
