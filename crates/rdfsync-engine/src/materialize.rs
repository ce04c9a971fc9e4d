//! Subgraph materialization into nested [`Document`]s.
//!
//! The statements reachable from a root are loaded into a petgraph
//! `DiGraph` whose nodes are expanded subjects and whose edges are followed
//! IRI-valued statements. A depth-first search from the root classifies
//! edges; back-edges close cycles and are rendered as reference-only
//! placeholders, so the remaining tree edges form a DAG and the nested
//! document is always finite.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{depth_first_search, DfsEvent};

use rdfsync_core::vocab::{self, rdf};
use rdfsync_core::{Document, Field, Iri, Statement, StatementSet, Term};
use rdfsync_storage::TripleStore;

use crate::error::EngineError;
use crate::reader::StoreReader;

/// Bounds on subgraph traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalPolicy {
    /// Maximum hops from the root; `None` is unbounded.
    pub max_depth: Option<usize>,
    /// Predicates whose objects are never followed.
    pub skip_predicates: BTreeSet<Iri>,
}

impl Default for TraversalPolicy {
    /// Unbounded depth; class IRIs named by `rdf:type` are not expanded.
    fn default() -> Self {
        TraversalPolicy {
            max_depth: None,
            skip_predicates: BTreeSet::from([vocab::rdf_type()]),
        }
    }
}

impl TraversalPolicy {
    /// Returns true if objects of `predicate` are traversed.
    pub fn follows(&self, predicate: &Iri) -> bool {
        !self.skip_predicates.contains(predicate)
    }
}

/// A fetched subgraph with its edges classified.
pub struct Subgraph {
    root: Iri,
    policy: TraversalPolicy,
    graph: DiGraph<Iri, Iri>,
    nodes: HashMap<Iri, NodeIndex>,
    by_subject: BTreeMap<Iri, Vec<Statement>>,
    back_edges: HashSet<(NodeIndex, NodeIndex)>,
}

impl Subgraph {
    /// Builds the graph over `statements` and classifies its edges by a
    /// depth-first search from `root`.
    pub fn new(root: Iri, statements: StatementSet, policy: TraversalPolicy) -> Self {
        let mut by_subject: BTreeMap<Iri, Vec<Statement>> = BTreeMap::new();
        for st in statements {
            by_subject.entry(st.subject.clone()).or_default().push(st);
        }

        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();
        for subject in by_subject.keys() {
            nodes.insert(subject.clone(), graph.add_node(subject.clone()));
        }
        for (subject, statements) in &by_subject {
            let from = nodes[subject];
            for st in statements {
                let Term::Iri(object) = &st.object else { continue };
                if !policy.follows(&st.predicate) {
                    continue;
                }
                if let Some(&to) = nodes.get(object) {
                    graph.add_edge(from, to, st.predicate.clone());
                }
            }
        }

        let mut back_edges = HashSet::new();
        if let Some(&start) = nodes.get(&root) {
            depth_first_search(&graph, Some(start), |event| {
                if let DfsEvent::BackEdge(from, to) = event {
                    back_edges.insert((from, to));
                }
            });
        }

        Subgraph {
            root,
            policy,
            graph,
            nodes,
            by_subject,
            back_edges,
        }
    }

    /// Number of expanded subjects.
    pub fn subject_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges that close a cycle.
    pub fn back_edge_count(&self) -> usize {
        self.back_edges.len()
    }

    /// Shapes the subgraph into a nested document, or `None` when the root
    /// has no statements.
    pub fn document(&self) -> Option<Document> {
        let &start = self.nodes.get(&self.root)?;
        Some(self.build(start))
    }

    fn build(&self, node: NodeIndex) -> Document {
        let subject = &self.graph[node];
        let mut doc = Document::new(subject.clone());
        let Some(statements) = self.by_subject.get(subject) else {
            return doc;
        };
        for st in statements {
            match &st.object {
                Term::Iri(class) if st.predicate.as_str() == rdf::TYPE => {
                    doc.types.insert(class.clone());
                }
                Term::Literal(lit) => doc.push(st.predicate.clone(), Field::Literal(lit.clone())),
                Term::Iri(object) => {
                    let field = match self.inline_target(node, &st.predicate, object) {
                        Some(target) => Field::Node(self.build(target)),
                        None => Field::Reference(object.clone()),
                    };
                    doc.push(st.predicate.clone(), field);
                }
            }
        }
        doc
    }

    /// The node to inline for an IRI object, unless it is unexpanded, not
    /// followed, or reached through a back-edge.
    fn inline_target(&self, from: NodeIndex, predicate: &Iri, object: &Iri) -> Option<NodeIndex> {
        if !self.policy.follows(predicate) {
            return None;
        }
        let &to = self.nodes.get(object)?;
        if self.back_edges.contains(&(from, to)) {
            return None;
        }
        Some(to)
    }
}

/// Loads `root` into a document.
///
/// With `deep` unset only the root's own statements are fetched and every
/// IRI object is a reference. Returns `Ok(None)` when the root has no
/// statements, which is distinct from an entity with no attributes.
pub async fn materialize<S: TripleStore + ?Sized>(
    reader: &StoreReader<'_, S>,
    root: &Iri,
    deep: bool,
    policy: &TraversalPolicy,
) -> Result<Option<Document>, EngineError> {
    let statements: StatementSet = if deep {
        let mut visited = HashSet::new();
        reader.subgraph(root, &mut visited, policy).await?
    } else {
        reader.outgoing(root).await?.into_iter().collect()
    };
    if statements.is_empty() {
        tracing::debug!(root = %root, "materialize: not found");
        return Ok(None);
    }

    let subgraph = Subgraph::new(root.clone(), statements, policy.clone());
    tracing::debug!(
        root = %root,
        deep,
        subjects = subgraph.subject_count(),
        back_edges = subgraph.back_edge_count(),
        "materialized subgraph"
    );
    Ok(subgraph.document())
}
