//! The labeled property graph and its named projections.
//!
//! [`Lpg`] lays the relationship elements of a [`Model`] out as a petgraph
//! `DiGraph`: one node per non-relationship element, one edge per
//! `(source, target, kind)` triple. Node weights borrow the model's
//! elements, so nothing is copied and later phases read the same data the
//! loader produced.
//!
//! A [`Projection`] is the same node set with only the edges of a fixed set
//! of relationship kinds. Node indices are identical between the full graph
//! and every projection.

use std::{collections::HashMap, collections::HashSet, fmt, str::FromStr};

use log::{debug, info, trace};
use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};
use serde::Serialize;

use instaweave_core::{
    Model,
    element::{Element, RelationshipKind},
    error::ModelError,
    identifier::ElementId,
};

/// Payload of one LPG edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LpgEdge {
    /// The relationship element the edge was derived from.
    relationship: ElementId,
    kind: RelationshipKind,
}

impl LpgEdge {
    pub fn relationship(&self) -> ElementId {
        self.relationship
    }

    pub fn kind(&self) -> &RelationshipKind {
        &self.kind
    }
}

/// The recognized projection names.
///
/// # Examples
///
/// ```
/// use instaweave::lpg::ProjectionName;
/// use instaweave_core::element::RelationshipKind;
///
/// let name: ProjectionName = "Part Typing Graph".parse().unwrap();
/// assert_eq!(name, ProjectionName::PartTyping);
/// assert!(name.includes(&RelationshipKind::FeatureTyping));
/// assert!(!name.includes(&RelationshipKind::Subclassification));
/// assert!("Nonsense Graph".parse::<ProjectionName>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectionName {
    PartTyping,
    PartDefinition,
    Generalization,
    RedefinitionAndSubsetting,
}

impl ProjectionName {
    pub const ALL: [ProjectionName; 4] = [
        ProjectionName::PartTyping,
        ProjectionName::PartDefinition,
        ProjectionName::Generalization,
        ProjectionName::RedefinitionAndSubsetting,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectionName::PartTyping => "Part Typing Graph",
            ProjectionName::PartDefinition => "Part Definition Graph",
            ProjectionName::Generalization => "Generalization Graph",
            ProjectionName::RedefinitionAndSubsetting => "Redefinition and Subsetting Graph",
        }
    }

    /// Returns `true` if edges of `kind` belong to this projection.
    pub fn includes(self, kind: &RelationshipKind) -> bool {
        use RelationshipKind as K;
        match self {
            ProjectionName::PartTyping => matches!(kind, K::FeatureTyping | K::Redefinition),
            ProjectionName::PartDefinition => matches!(
                kind,
                K::Subclassification | K::Superclassing | K::Generalization
            ),
            ProjectionName::Generalization => kind.is_specialization(),
            ProjectionName::RedefinitionAndSubsetting => matches!(
                kind,
                K::Redefinition | K::Subsetting | K::ReferenceSubsetting
            ),
        }
    }
}

impl fmt::Display for ProjectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectionName {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|name| name.as_str()).collect();
                ModelError::configuration(format!(
                    "unknown projection `{s}` (expected one of: {})",
                    known.join(", ")
                ))
            })
    }
}

/// The full relationship graph of a model.
#[derive(Debug)]
pub struct Lpg<'m> {
    model: &'m Model,
    graph: DiGraph<&'m Element, LpgEdge>,
    node_map: HashMap<ElementId, NodeIndex>,
    dangling: Vec<ElementId>,
}

impl<'m> Lpg<'m> {
    /// Builds the graph from the model's relationships.
    pub fn new(model: &'m Model) -> Self {
        let mut graph = DiGraph::new();
        let mut node_map = HashMap::new();
        for element in model.non_relationships() {
            let idx = graph.add_node(element);
            node_map.insert(element.id(), idx);
        }

        let mut seen: HashSet<(ElementId, ElementId, RelationshipKind)> = HashSet::new();
        let mut dangling = Vec::new();
        for relationship in model.relationships() {
            if relationship.sources().is_empty() || relationship.targets().is_empty() {
                debug!(relationship = relationship.id().to_string(); "Relationship has no usable endpoints");
                dangling.push(relationship.id());
                continue;
            }
            let kind = RelationshipKind::from_metatype(relationship.metatype());
            for source in relationship.sources() {
                for target in relationship.targets() {
                    let (Some(&s), Some(&t)) = (node_map.get(source), node_map.get(target)) else {
                        trace!(
                            relationship = relationship.id().to_string();
                            "Skipping endpoint that is itself a relationship"
                        );
                        continue;
                    };
                    if !seen.insert((*source, *target, kind.clone())) {
                        continue;
                    }
                    graph.add_edge(
                        s,
                        t,
                        LpgEdge {
                            relationship: relationship.id(),
                            kind: kind.clone(),
                        },
                    );
                }
            }
        }

        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            dangling = dangling.len();
            "Labeled property graph built"
        );
        Self {
            model,
            graph,
            node_map,
            dangling,
        }
    }

    pub fn model(&self) -> &'m Model {
        self.model
    }

    pub fn graph(&self) -> &DiGraph<&'m Element, LpgEdge> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// The node index of an element, `None` for relationships and unknown ids.
    pub fn node(&self, id: ElementId) -> Option<NodeIndex> {
        self.node_map.get(&id).copied()
    }

    /// Node elements in load order.
    pub fn elements(&self) -> impl Iterator<Item = &'m Element> + '_ {
        self.graph.node_weights().copied()
    }

    /// Every edge as `(source, target, payload)`.
    pub fn edges(&self) -> impl Iterator<Item = (ElementId, ElementId, &LpgEdge)> + '_ {
        edges_of(&self.graph)
    }

    /// Relationships with an empty source or target list after loading.
    pub fn dangling_relationships(&self) -> &[ElementId] {
        &self.dangling
    }

    /// Edges whose source and target are the same element.
    pub fn self_loops(&self) -> Vec<(ElementId, &LpgEdge)> {
        self.graph
            .edge_references()
            .filter(|edge| edge.source() == edge.target())
            .map(|edge| (self.graph[edge.source()].id(), edge.weight()))
            .collect()
    }

    /// Looks a projection up by display name.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Configuration`] when `name` is not a recognized
    /// projection.
    pub fn get_projection(&self, name: &str) -> Result<Projection<'m>, ModelError> {
        let name = name.parse::<ProjectionName>()?;
        Ok(self.projection(name))
    }

    /// Builds the projection for a recognized name.
    pub fn projection(&self, name: ProjectionName) -> Projection<'m> {
        let graph = self.graph.filter_map(
            |_, element| Some(*element),
            |_, edge| name.includes(&edge.kind).then(|| edge.clone()),
        );
        debug!(
            projection = name.as_str(),
            edges = graph.edge_count();
            "Projection materialized"
        );
        Projection {
            name,
            graph,
            node_map: self.node_map.clone(),
        }
    }
}

/// A filtered view of the LPG restricted to one [`ProjectionName`].
#[derive(Debug, Clone)]
pub struct Projection<'m> {
    name: ProjectionName,
    graph: DiGraph<&'m Element, LpgEdge>,
    node_map: HashMap<ElementId, NodeIndex>,
}

impl<'m> Projection<'m> {
    pub fn name(&self) -> ProjectionName {
        self.name
    }

    pub fn graph(&self) -> &DiGraph<&'m Element, LpgEdge> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, id: ElementId) -> Option<NodeIndex> {
        self.node_map.get(&id).copied()
    }

    pub fn element(&self, idx: NodeIndex) -> &'m Element {
        self.graph[idx]
    }

    /// Node elements in load order.
    pub fn elements(&self) -> impl Iterator<Item = &'m Element> + '_ {
        self.graph.node_weights().copied()
    }

    pub fn edges(&self) -> impl Iterator<Item = (ElementId, ElementId, &LpgEdge)> + '_ {
        edges_of(&self.graph)
    }

    /// Targets of `id`'s outgoing edges, self-loops excluded, without repeats.
    pub fn successors(&self, id: ElementId) -> Vec<ElementId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Sources of `id`'s incoming edges, self-loops excluded, without repeats.
    pub fn predecessors(&self, id: ElementId) -> Vec<ElementId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Returns `true` if some other element points at `id`.
    pub fn has_incoming(&self, id: ElementId) -> bool {
        !self.predecessors(id).is_empty()
    }

    fn neighbors(&self, id: ElementId, direction: Direction) -> Vec<ElementId> {
        let Some(idx) = self.node(id) else {
            return Vec::new();
        };
        // petgraph yields neighbors newest edge first; restore insertion order.
        let mut found: Vec<ElementId> = Vec::new();
        let mut edges: Vec<_> = self.graph.edges_directed(idx, direction).collect();
        edges.sort_by_key(|edge| edge.id());
        for edge in edges {
            let other = match direction {
                Direction::Outgoing => edge.target(),
                Direction::Incoming => edge.source(),
            };
            if other == idx {
                continue;
            }
            let other = self.graph[other].id();
            if !found.contains(&other) {
                found.push(other);
            }
        }
        found
    }
}

fn edges_of<'g, 'm: 'g>(
    graph: &'g DiGraph<&'m Element, LpgEdge>,
) -> impl Iterator<Item = (ElementId, ElementId, &'g LpgEdge)> + 'g {
    graph.edge_references().map(move |edge| {
        (
            graph[edge.source()].id(),
            graph[edge.target()].id(),
            edge.weight(),
        )
    })
}
