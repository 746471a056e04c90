//! Resource graph
//!
//! A [`ResourceGraph`] maps canonical relative paths to [`Resource`] nodes.
//! The map owns every node; a directory's `children` lists the keys of the
//! nodes directly below it, in walk order. Parents are never linked
//! directly: [`ResourceGraph::parent`] looks up the path's directory in the
//! same map, and a resource whose directory is not in the map is a root
//! relative to the remote destination.
//!
//! ## Skip state
//!
//! `skipped` is terminal. [`Resource::mark_skipped`] keeps the first reason
//! it sees, and [`ResourceGraph::skip_cascade`] stamps a node and its entire
//! subtree with the same reason before any child would be dispatched.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{RemoteId, ResourcePath};

// ============================================================================
// Kinds
// ============================================================================

/// Local filesystem entry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    File,
    Directory,
}

/// Remote object type a resource was mirrored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteKind {
    Folder,
    Item,
}

impl fmt::Display for RemoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteKind::Folder => write!(f, "folder"),
            RemoteKind::Item => write!(f, "item"),
        }
    }
}

// ============================================================================
// Resource
// ============================================================================

/// One filesystem entry tracked for sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    path: ResourcePath,
    size: u64,
    kind: ResourceKind,
    children: Vec<ResourcePath>,
    remote_parent_id: Option<RemoteId>,
    remote_id: Option<RemoteId>,
    remote_kind: Option<RemoteKind>,
    skip_reason: Option<String>,
    unsupported: bool,
    transferred: bool,
}

impl Resource {
    /// Create a resource that has not been mirrored yet
    pub fn new(path: ResourcePath, kind: ResourceKind, size: u64) -> Self {
        Self {
            path,
            size,
            kind,
            children: Vec::new(),
            remote_parent_id: None,
            remote_id: None,
            remote_kind: None,
            skip_reason: None,
            unsupported: false,
            transferred: false,
        }
    }

    pub fn file(path: ResourcePath, size: u64) -> Self {
        Self::new(path, ResourceKind::File, size)
    }

    pub fn directory(path: ResourcePath) -> Self {
        Self::new(path, ResourceKind::Directory, 0)
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind == ResourceKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == ResourceKind::File
    }

    /// Keys of the direct children, in insertion order
    pub fn children(&self) -> &[ResourcePath] {
        &self.children
    }

    pub fn remote_parent_id(&self) -> Option<&RemoteId> {
        self.remote_parent_id.as_ref()
    }

    pub fn remote_id(&self) -> Option<&RemoteId> {
        self.remote_id.as_ref()
    }

    pub fn remote_kind(&self) -> Option<RemoteKind> {
        self.remote_kind
    }

    pub fn is_skipped(&self) -> bool {
        self.skip_reason.is_some()
    }

    pub fn skip_reason(&self) -> Option<&str> {
        self.skip_reason.as_deref()
    }

    /// Whether the remote shape could not be mirrored (neither success nor failure)
    pub fn is_unsupported(&self) -> bool {
        self.unsupported
    }

    /// Whether blob bytes were moved for this resource during the run
    pub fn is_transferred(&self) -> bool {
        self.transferred
    }

    /// Record the blob size once it is known (download direction)
    pub fn set_size(&mut self, size: u64) {
        self.size = size;
    }

    /// Record the container this resource is about to be created under
    pub fn set_remote_parent_id(&mut self, parent: RemoteId) {
        self.remote_parent_id = Some(parent);
    }

    /// Record the remote object this resource was created as (or matched to)
    ///
    /// The first assignment wins. Re-assigning the same id is a no-op.
    ///
    /// # Errors
    /// Returns [`DomainError::RemoteIdAlreadyAssigned`] if a different id is
    /// already recorded
    pub fn assign_remote(&mut self, id: RemoteId, kind: RemoteKind) -> Result<(), DomainError> {
        match &self.remote_id {
            Some(existing) if *existing == id => Ok(()),
            Some(_) => Err(DomainError::RemoteIdAlreadyAssigned {
                path: self.path.to_string(),
            }),
            None => {
                self.remote_id = Some(id);
                self.remote_kind = Some(kind);
                Ok(())
            }
        }
    }

    /// Mark the resource skipped
    ///
    /// Returns `false` if it was already skipped, in which case the original
    /// reason is kept.
    pub fn mark_skipped(&mut self, reason: impl Into<String>) -> bool {
        if self.skip_reason.is_some() {
            return false;
        }
        self.skip_reason = Some(reason.into());
        true
    }

    pub fn mark_unsupported(&mut self) {
        self.unsupported = true;
    }

    pub fn mark_transferred(&mut self) {
        self.transferred = true;
    }
}

// ============================================================================
// ResourceGraph
// ============================================================================

/// Mapping from relative path to resource for one run
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    nodes: HashMap<ResourcePath, Resource>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a resource, linking it under its parent when the parent is present
    ///
    /// Re-inserting an existing path replaces the node but keeps its place in
    /// the parent's children list.
    pub fn insert(&mut self, resource: Resource) {
        let path = resource.path.clone();
        let existed = self.nodes.insert(path.clone(), resource).is_some();
        if existed {
            return;
        }
        if let Some(parent_path) = path.parent() {
            if let Some(parent) = self.nodes.get_mut(&parent_path) {
                parent.children.push(path);
            }
        }
    }

    pub fn get(&self, path: &ResourcePath) -> Option<&Resource> {
        self.nodes.get(path)
    }

    pub fn get_mut(&mut self, path: &ResourcePath) -> Option<&mut Resource> {
        self.nodes.get_mut(path)
    }

    pub fn contains(&self, path: &ResourcePath) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.nodes.values()
    }

    /// Parent of `resource`, found by looking up its path directory
    pub fn parent(&self, resource: &Resource) -> Option<&Resource> {
        resource
            .path
            .parent()
            .and_then(|parent| self.nodes.get(&parent))
    }

    /// Number of resources of the given kind
    pub fn count(&self, kind: ResourceKind) -> usize {
        self.nodes.values().filter(|r| r.kind == kind).count()
    }

    /// Sorted paths of every resource of `kind`
    pub fn paths_of_kind(&self, kind: ResourceKind) -> Vec<ResourcePath> {
        let mut paths: Vec<_> = self
            .nodes
            .values()
            .filter(|r| r.kind == kind)
            .map(|r| r.path.clone())
            .collect();
        paths.sort();
        paths
    }

    /// Sorted paths of resources of `kind` that have no parent in the graph
    pub fn roots(&self, kind: ResourceKind) -> Vec<ResourcePath> {
        let mut roots: Vec<_> = self
            .nodes
            .values()
            .filter(|r| r.kind == kind && self.parent(r).is_none())
            .map(|r| r.path.clone())
            .collect();
        roots.sort();
        roots
    }

    /// Every node below `path`, depth-first, not including `path` itself
    pub fn descendants(&self, path: &ResourcePath) -> Vec<ResourcePath> {
        let mut out = Vec::new();
        let mut stack: Vec<ResourcePath> = match self.nodes.get(path) {
            Some(node) => node.children.iter().rev().cloned().collect(),
            None => return out,
        };
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get(&next) {
                stack.extend(node.children.iter().rev().cloned());
            }
            out.push(next);
        }
        out
    }

    /// Mark `path` and its whole subtree skipped with the same reason
    ///
    /// Returns the paths that were newly marked. Nodes already skipped keep
    /// their earlier reason.
    pub fn skip_cascade(&mut self, path: &ResourcePath, reason: &str) -> Vec<ResourcePath> {
        let mut marked = Vec::new();
        let mut targets = vec![path.clone()];
        targets.extend(self.descendants(path));
        for target in targets {
            if let Some(node) = self.nodes.get_mut(&target) {
                if node.mark_skipped(reason) {
                    marked.push(target);
                }
            }
        }
        marked
    }
}

// ============================================================================
// SharedGraph
// ============================================================================

/// A [`ResourceGraph`] shared between worker tasks
///
/// A single exclusive lock guards every mutation. Workers touch disjoint
/// nodes almost always, and no lock is held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct SharedGraph(Arc<Mutex<ResourceGraph>>);

impl SharedGraph {
    pub fn new(graph: ResourceGraph) -> Self {
        Self(Arc::new(Mutex::new(graph)))
    }

    /// Run `f` with shared access to the graph
    pub fn read<R>(&self, f: impl FnOnce(&ResourceGraph) -> R) -> R {
        let guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Run `f` with exclusive access to the graph
    pub fn write<R>(&self, f: impl FnOnce(&mut ResourceGraph) -> R) -> R {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Clone of a single node
    pub fn resource(&self, path: &ResourcePath) -> Option<Resource> {
        self.read(|g| g.get(path).cloned())
    }

    /// Mutate a single node if it exists
    pub fn update<R>(&self, path: &ResourcePath, f: impl FnOnce(&mut Resource) -> R) -> Option<R> {
        self.write(|g| g.get_mut(path).map(f))
    }
}
