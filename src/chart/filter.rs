use std::collections::BTreeSet;

use crate::chart::annotate::Annotation;

/// User-chosen filter over signal sources or signal types.
///
/// `All` is the sentinel meaning "no restriction".  An empty member list
/// normalizes to `All`: the UI never allows a state with zero effective
/// selection (unchecking everything re-activates "all").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionSet {
    All,
    Only(BTreeSet<String>),
}

impl SelectionSet {
    /// Build a selection from checkbox-style member values.  The literal
    /// member `"all"` is the front end's sentinel checkbox and collapses the
    /// whole selection to `All`.
    pub fn from_members<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = members.into_iter().map(Into::into).collect();
        if set.is_empty() || set.contains("all") {
            Self::All
        } else {
            Self::Only(set)
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    pub fn allows(&self, value: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(members) => members.contains(value),
        }
    }
}

impl Default for SelectionSet {
    fn default() -> Self {
        Self::All
    }
}

/// Conjunctive two-axis filter: an annotation survives only if its source
/// and its signal type both pass.  Stable — input order is preserved.
pub fn filter_annotations(
    annotations: &[Annotation],
    sources: &SelectionSet,
    types: &SelectionSet,
) -> Vec<Annotation> {
    annotations
        .iter()
        .filter(|a| sources.allows(&a.source) && types.allows(&a.signal_type))
        .cloned()
        .collect()
}

/// Cardinality of the filtered set; drives the live counter in the UI.
pub fn count_annotations(
    annotations: &[Annotation],
    sources: &SelectionSet,
    types: &SelectionSet,
) -> usize {
    annotations
        .iter()
        .filter(|a| sources.allows(&a.source) && types.allows(&a.signal_type))
        .count()
}
