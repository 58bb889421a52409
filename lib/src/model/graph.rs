use crate::model::triple::{Term, Triple};
use crate::model::uri::Uri;
use std::collections::{BTreeMap, BTreeSet};

/// An in-memory RDF graph, keyed by subject then predicate.
///
/// The bulk importer batches parsed triples into a `Graph` before committing
/// them, and [`Store::describe`](crate::store::Store::describe) returns its
/// result as one. Equality is structural: two graphs are equal when they
/// hold the same set of triples.
///
/// ```
/// use terndb::model::{Graph, Triple, Uri};
///
/// let mut graph = Graph::new();
/// let s = Uri::new("http://ex.org/s");
/// let p = Uri::new("http://ex.org/p");
/// let triple = Triple::new(s, p, Uri::new("http://ex.org/o"));
/// assert!(graph.insert(triple.clone()));
/// assert!(!graph.insert(triple.clone()));
/// assert!(graph.contains(&triple));
/// assert_eq!(graph.len(), 1);
/// ```
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Graph {
    nodes: BTreeMap<Uri, BTreeMap<Uri, BTreeSet<Term>>>,
}

impl Graph {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of triples in the graph.
    pub fn len(&self) -> usize {
        self.nodes
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeSet::len)
            .sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a triple. Returns `true` if it was not already present.
    pub fn insert(&mut self, triple: Triple) -> bool {
        self.nodes
            .entry(triple.subject)
            .or_default()
            .entry(triple.predicate)
            .or_default()
            .insert(triple.object)
    }

    /// Removes a triple. Returns `true` if it was present.
    pub fn remove(&mut self, triple: &Triple) -> bool {
        let Some(props) = self.nodes.get_mut(&triple.subject) else {
            return false;
        };
        let Some(objects) = props.get_mut(&triple.predicate) else {
            return false;
        };
        let removed = objects.remove(&triple.object);
        if objects.is_empty() {
            props.remove(&triple.predicate);
            if props.is_empty() {
                self.nodes.remove(&triple.subject);
            }
        }
        removed
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.nodes
            .get(&triple.subject)
            .and_then(|props| props.get(&triple.predicate))
            .is_some_and(|objects| objects.contains(&triple.object))
    }

    /// Iterates over all the triples in the graph, in subject, predicate,
    /// object order.
    pub fn iter(&self) -> impl Iterator<Item = Triple> + '_ {
        self.nodes.iter().flat_map(|(subject, props)| {
            props.iter().flat_map(move |(predicate, objects)| {
                objects.iter().map(move |object| {
                    Triple::new(subject.clone(), predicate.clone(), object.clone())
                })
            })
        })
    }

    /// The graph grouped by subject and predicate, for callers that resolve
    /// each subject and predicate once.
    pub(crate) fn nodes(
        &self,
    ) -> impl Iterator<Item = (&Uri, &BTreeMap<Uri, BTreeSet<Term>>)> {
        self.nodes.iter()
    }

    /// Returns the subgraph of triples where `node` is the subject, and,
    /// if `as_object` is set, also those where it is the object.
    pub fn describe(&self, node: &Uri, as_object: bool) -> Graph {
        let mut result = Graph::new();
        for triple in self.iter() {
            if triple.subject == *node
                || (as_object && triple.object.as_uri() == Some(node))
            {
                result.insert(triple);
            }
        }
        result
    }

    /// Adds every triple of `other` to this graph.
    pub fn merge(&mut self, other: &Graph) {
        for triple in other.iter() {
            self.insert(triple);
        }
    }
}

impl Extend<Triple> for Graph {
    fn extend<T: IntoIterator<Item = Triple>>(&mut self, iter: T) {
        for triple in iter {
            self.insert(triple);
        }
    }
}

impl FromIterator<Triple> for Graph {
    fn from_iter<T: IntoIterator<Item = Triple>>(iter: T) -> Self {
        let mut graph = Self::new();
        graph.extend(iter);
        graph
    }
}
