use crate::store::ObjectRecord;
use std::fmt;

/// What part of the index is being looked at. Also the id of a prefix tree
/// node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Scope {
    /// Flat view of everything loaded.
    #[default]
    All,
    /// Grouping node for top-level directories. Does not filter.
    Root,
    /// A concrete directory prefix such as `a/b`.
    Prefix(String),
}

impl Scope {
    pub fn from_id(id: &str) -> Self {
        match id {
            "" | "all" => Scope::All,
            "root" => Scope::Root,
            other => Scope::Prefix(other.to_string()),
        }
    }

    /// The literal key prefix this scope filters on, if any.
    pub fn key_prefix(&self) -> Option<&str> {
        match self {
            Scope::Prefix(p) if !p.is_empty() => Some(p),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => f.write_str("all"),
            Scope::Root => f.write_str("root"),
            Scope::Prefix(p) => f.write_str(p),
        }
    }
}

/// Rows of the index that are currently visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// The first `len` objects of the index, unfiltered.
    All { len: usize },
    /// Positions into the index, ascending.
    Rows(Vec<usize>),
}

impl Default for Projection {
    fn default() -> Self {
        Projection::All { len: 0 }
    }
}

impl Projection {
    pub fn len(&self) -> usize {
        match self {
            Projection::All { len } => *len,
            Projection::Rows(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maps a visible row to its position in the index.
    pub fn index_of(&self, row: usize) -> Option<usize> {
        match self {
            Projection::All { len } => (row < *len).then_some(row),
            Projection::Rows(rows) => rows.get(row).copied(),
        }
    }

    pub fn resolve<'a>(&self, objects: &'a [ObjectRecord], row: usize) -> Option<&'a ObjectRecord> {
        self.index_of(row).and_then(|idx| objects.get(idx))
    }

    pub fn iter<'a>(&'a self, objects: &'a [ObjectRecord]) -> impl Iterator<Item = &'a ObjectRecord> + 'a {
        (0..self.len()).filter_map(move |row| self.resolve(objects, row))
    }
}

/// Computes the visible subset of `objects` for a search term and scope.
///
/// A record is kept when it is inside the scope and its key contains the
/// term. The `all` and `root` scopes contain everything; the term match is
/// case-insensitive while the scope match is a literal, case-sensitive prefix.
pub fn compute(objects: &[ObjectRecord], search_term: &str, scope: &Scope) -> Projection {
    let prefix = scope.key_prefix();
    if prefix.is_none() && search_term.is_empty() {
        return Projection::All { len: objects.len() };
    }

    let needle = search_term.to_lowercase();
    let rows = objects
        .iter()
        .enumerate()
        .filter(|(_, obj)| prefix.map_or(true, |p| obj.key.starts_with(p)))
        .filter(|(_, obj)| needle.is_empty() || contains_ignore_case(&obj.key, &needle))
        .map(|(idx, _)| idx)
        .collect();
    Projection::Rows(rows)
}

fn contains_ignore_case(haystack: &str, lowered_needle: &str) -> bool {
    if haystack.is_ascii() && lowered_needle.is_ascii() {
        let needle = lowered_needle.as_bytes();
        return haystack
            .as_bytes()
            .windows(needle.len())
            .any(|w| w.eq_ignore_ascii_case(needle));
    }
    haystack.to_lowercase().contains(lowered_needle)
}
