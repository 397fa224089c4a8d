//! Assembly and ordering of the bootstrap project graph.
//!
//! Descriptors are built into [`ProjectModel`]s, checked for identity
//! collisions and sorted so that every project follows the projects it
//! depends on. Projects with no ordering constraint between them keep the
//! order their descriptors were discovered in.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use indexmap::IndexMap;
use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use reactor_boot_participation::{BuildSession, ProjectCoordinate, ProjectModel, SessionId};

use crate::collaborators::{DescriptorBuildRequest, DescriptorBuilder};
use crate::error::{BootstrapError, ProjectCollision};
use crate::policy::{BootstrapPolicy, DescriptorSet};
use crate::reporter::BootReporter;

/// Sorted bootstrap projects plus the descriptors left out.
#[derive(Debug, Clone, Default)]
pub struct ProjectGraph {
    projects: Vec<ProjectModel>,
    skipped: Vec<PathBuf>,
}

impl ProjectGraph {
    /// Projects in build order.
    #[must_use]
    pub fn projects(&self) -> &[ProjectModel] {
        &self.projects
    }

    /// Descriptors excluded by the skip set.
    #[must_use]
    pub fn skipped(&self) -> &[PathBuf] {
        &self.skipped
    }

    /// Identities in build order.
    #[must_use]
    pub fn build_order(&self) -> Vec<ProjectCoordinate> {
        self.projects
            .iter()
            .map(|project| project.coordinate().clone())
            .collect()
    }

    /// Consumes the graph, yielding the sorted projects.
    #[must_use]
    pub fn into_projects(self) -> Vec<ProjectModel> {
        self.projects
    }
}

/// Host sessions that currently own a project graph.
#[derive(Debug, Default)]
pub struct GraphRegistry {
    graphs: Mutex<HashMap<SessionId, Vec<ProjectCoordinate>>>,
}

impl GraphRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the graph built for `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::AlreadyRegistered`] when `owner` already
    /// holds a graph.
    pub fn register(
        &self,
        owner: SessionId,
        projects: Vec<ProjectCoordinate>,
    ) -> Result<(), BootstrapError> {
        let mut graphs = self.graphs.lock().unwrap_or_else(PoisonError::into_inner);
        if graphs.contains_key(&owner) {
            return Err(BootstrapError::AlreadyRegistered { session: owner });
        }
        graphs.insert(owner, projects);
        Ok(())
    }

    /// Forgets the graph of `owner`, returning whether one was held.
    pub fn release(&self, owner: SessionId) -> bool {
        self.graphs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&owner)
            .is_some()
    }

    /// Build order registered for `owner`.
    #[must_use]
    pub fn registered(&self, owner: SessionId) -> Option<Vec<ProjectCoordinate>> {
        self.graphs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&owner)
            .cloned()
    }
}

/// Builds the project graph of a boot session.
pub struct ProjectGraphBuilder {
    builder: Arc<dyn DescriptorBuilder>,
    registry: Arc<GraphRegistry>,
    reporter: Arc<dyn BootReporter>,
}

impl ProjectGraphBuilder {
    /// Wires the builder to its collaborators.
    #[must_use]
    pub fn new(
        builder: Arc<dyn DescriptorBuilder>,
        registry: Arc<GraphRegistry>,
        reporter: Arc<dyn BootReporter>,
    ) -> Self {
        Self {
            builder,
            registry,
            reporter,
        }
    }

    /// Builds, validates, sorts and registers the graph for the host session
    /// `owner`.
    ///
    /// Repositories handed to the descriptor builder and stored on each
    /// project are filtered through `policy` first.
    ///
    /// # Errors
    ///
    /// Fails on descriptor build errors, identity collisions, dependency
    /// cycles and when `owner` already holds a graph.
    pub fn build(
        &self,
        owner: SessionId,
        boot: &BuildSession,
        descriptors: &DescriptorSet,
        policy: &dyn BootstrapPolicy,
    ) -> Result<ProjectGraph, BootstrapError> {
        let skipped: Vec<PathBuf> = descriptors
            .descriptors()
            .filter(|descriptor| descriptors.is_skipped(descriptor))
            .map(PathBuf::from)
            .collect();
        for descriptor in &skipped {
            self.reporter.descriptor_skipped(descriptor);
        }

        let request = DescriptorBuildRequest::from_session(
            boot,
            policy.filter_repositories(boot.request().remote_repositories()),
        );
        let mut projects = self
            .builder
            .build(&descriptors.selected(), &request)
            .map_err(|error| BootstrapError::DescriptorBuild {
                file: error.file,
                message: error.message,
            })?;
        for project in &mut projects {
            let remote = policy.filter_repositories(project.remote_repositories());
            project.set_remote_repositories(remote);
            let plugin = policy.filter_repositories(project.plugin_repositories());
            project.set_plugin_repositories(plugin);
        }

        let graph = ProjectGraph {
            projects: sort_projects(projects)?,
            skipped,
        };
        self.registry.register(owner, graph.build_order())?;
        Ok(graph)
    }
}

/// Sorts `projects` so that dependencies precede their dependents.
///
/// Dependencies, the parent and build plugins all count as edges when they
/// name another project in the set. Ties keep input order.
///
/// # Errors
///
/// Returns [`BootstrapError::DuplicateProject`] listing every colliding
/// identity, or [`BootstrapError::ProjectCycle`] naming the projects on a
/// cycle.
pub fn sort_projects(projects: Vec<ProjectModel>) -> Result<Vec<ProjectModel>, BootstrapError> {
    let mut by_identity: IndexMap<String, Vec<usize>> = IndexMap::new();
    for (index, project) in projects.iter().enumerate() {
        by_identity
            .entry(project.coordinate().key())
            .or_default()
            .push(index);
    }
    let collisions: Vec<ProjectCollision> = by_identity
        .iter()
        .filter(|(_, indices)| indices.len() > 1)
        .map(|(identity, indices)| ProjectCollision {
            identity: identity.clone(),
            files: indices
                .iter()
                .filter_map(|index| projects.get(*index))
                .map(|project| project.descriptor().to_path_buf())
                .collect(),
        })
        .collect();
    if !collisions.is_empty() {
        return Err(BootstrapError::DuplicateProject { collisions });
    }

    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(projects.len(), 0);
    for index in 0..projects.len() {
        graph.add_node(index);
    }
    for (dependent, project) in projects.iter().enumerate() {
        for (dependency, candidate) in projects.iter().enumerate() {
            if dependency != dependent && depends_on(project, candidate.coordinate()) {
                graph.update_edge(NodeIndex::new(dependency), NodeIndex::new(dependent), ());
            }
        }
    }

    let order = stable_topological_order(&graph).ok_or_else(|| cycle_error(&graph, &projects))?;
    let mut slots: Vec<Option<ProjectModel>> = projects.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|index| slots.get_mut(index).and_then(Option::take))
        .collect())
}

fn depends_on(project: &ProjectModel, candidate: &ProjectCoordinate) -> bool {
    project.parent() == Some(candidate)
        || project
            .dependencies()
            .iter()
            .any(|dependency| dependency.refers_to(candidate))
        || project.plugins().iter().any(|plugin| plugin.refers_to(candidate))
}

fn stable_topological_order(graph: &DiGraph<usize, ()>) -> Option<Vec<usize>> {
    let mut remaining: Vec<usize> = graph
        .node_indices()
        .map(|node| graph.neighbors_directed(node, Direction::Incoming).count())
        .collect();
    let mut ready: BinaryHeap<Reverse<usize>> = remaining
        .iter()
        .enumerate()
        .filter(|(_, count)| **count == 0)
        .map(|(index, _)| Reverse(index))
        .collect();
    let mut order = Vec::with_capacity(remaining.len());
    while let Some(Reverse(index)) = ready.pop() {
        order.push(index);
        for next in graph.neighbors_directed(NodeIndex::new(index), Direction::Outgoing) {
            if let Some(count) = remaining.get_mut(next.index()) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    ready.push(Reverse(next.index()));
                }
            }
        }
    }
    (order.len() == graph.node_count()).then_some(order)
}

fn cycle_error(graph: &DiGraph<usize, ()>, projects: &[ProjectModel]) -> BootstrapError {
    let mut component: Vec<usize> = tarjan_scc(graph)
        .into_iter()
        .find(|component| component.len() > 1)
        .unwrap_or_default()
        .into_iter()
        .map(NodeIndex::index)
        .collect();
    component.sort_unstable();
    let (members, files) = component
        .into_iter()
        .filter_map(|index| projects.get(index))
        .map(|project| (project.coordinate().key(), project.descriptor().to_path_buf()))
        .unzip();
    BootstrapError::ProjectCycle { members, files }
}
