use heapless::{String, Vec};

use crate::NAME_MAX;

pub const UNKNOWN_VISITOR: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visitor {
    pub name: String<NAME_MAX>,
    /// Seconds since boot when the door was opened
    pub timestamp: u64,
    /// Whether the camera was triggered for this entry
    pub captured: bool,
}

impl Visitor {
    pub fn new(name: Option<&str>, timestamp: u64, captured: bool) -> Self {
        let name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => n,
            _ => UNKNOWN_VISITOR,
        };
        Self {
            name: truncate(name),
            timestamp,
            captured,
        }
    }
}

/// Copy `s` into a bounded string, cutting on a char boundary if needed.
pub fn truncate<const N: usize>(s: &str) -> String<N> {
    let mut end = s.len().min(N);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::new();
    // fits by construction
    let _ = out.push_str(&s[..end]);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitorLogFull;

/// Bounded in-memory visitor log.
///
/// `N` is the storage reserved at compile time, `limit` the configured
/// capacity bound. Once `limit` records are held new ones are refused and
/// counted in `dropped`; existing records are never evicted.
pub struct VisitorLog<const N: usize> {
    entries: Vec<Visitor, N>,
    limit: usize,
    dropped: u32,
}

impl<const N: usize> VisitorLog<N> {
    /// `limit` is clamped to `1..=N`.
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit: limit.clamp(1, N),
            dropped: 0,
        }
    }

    pub fn record(&mut self, visitor: Visitor) -> Result<(), VisitorLogFull> {
        if self.entries.len() >= self.limit {
            self.dropped = self.dropped.saturating_add(1);
            log::warn!(
                "Visitor log full ({} entries), dropping {}",
                self.limit,
                visitor.name
            );
            return Err(VisitorLogFull);
        }
        self.entries.push(visitor).map_err(|_| VisitorLogFull)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.limit
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &Visitor> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&Visitor> {
        self.entries.last()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.dropped = 0;
    }
}
