use super::filter::Scope;
use std::collections::{HashMap, HashSet};

pub const ALL_LABEL: &str = "All (Flat view)";
pub const ROOT_LABEL: &str = "Root";

/// Directory tree derived from the flat prefix set.
///
/// Always rebuilt as a whole from the current prefixes; there is no
/// incremental editing.
#[derive(Debug, Clone)]
pub struct PrefixTree {
    children: HashMap<Scope, Vec<Scope>>,
    labels: HashMap<Scope, String>,
}

impl Default for PrefixTree {
    fn default() -> Self {
        Self::build(std::iter::empty::<&str>())
    }
}

impl PrefixTree {
    pub fn build<'a, I>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut children: HashMap<Scope, Vec<Scope>> = HashMap::new();
        let mut labels = HashMap::new();
        let mut seen: HashSet<(Scope, Scope)> = HashSet::new();

        labels.insert(Scope::All, ALL_LABEL.to_string());
        labels.insert(Scope::Root, ROOT_LABEL.to_string());
        children.insert(Scope::Root, Vec::new());

        for prefix in prefixes {
            let mut parent = Scope::Root;
            let mut end = 0;
            for segment in prefix.split('/') {
                let start = end;
                end = start + segment.len();
                let path_end = end;
                // skip the separator for the next segment
                end += 1;
                if segment.is_empty() {
                    continue;
                }
                let node = Scope::Prefix(prefix[..path_end].to_string());
                if seen.insert((parent.clone(), node.clone())) {
                    children.entry(parent.clone()).or_default().push(node.clone());
                    labels.insert(node.clone(), segment.to_string());
                }
                parent = node;
            }
        }

        Self { children, labels }
    }

    /// The two synthetic top-level nodes.
    pub fn roots(&self) -> [Scope; 2] {
        [Scope::All, Scope::Root]
    }

    pub fn children(&self, node: &Scope) -> &[Scope] {
        self.children.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn label(&self, node: &Scope) -> Option<&str> {
        self.labels.get(node).map(String::as_str)
    }

    pub fn contains(&self, node: &Scope) -> bool {
        self.labels.contains_key(node)
    }

    pub fn is_branch(&self, node: &Scope) -> bool {
        !self.children(node).is_empty()
    }

    /// Number of nodes, synthetic roots included.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 2
    }
}
