//! Field identifier sources.
//!
//! Detectors never make up identifiers themselves; the caller hands them an
//! [`IdSource`]. Tests use [`SequentialIds`] for stable output while the shell
//! plugs in random identifiers.

/// Produces identifiers unique within one detection run.
pub trait IdSource {
    fn next_id(&mut self) -> String;
}

impl<T: IdSource + ?Sized> IdSource for &mut T {
    fn next_id(&mut self) -> String {
        (**self).next_id()
    }
}

/// `prefix_1`, `prefix_2`, ...
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("field")
    }
}

impl IdSource for SequentialIds {
    fn next_id(&mut self) -> String {
        let id = format!("{}_{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}
