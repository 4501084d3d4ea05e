//! Test unit registry.
//!
//! Test units live in an arena owned by [`TestTree`] and are addressed by
//! [`UnitId`]. Parents own their children through id lists; the parent link
//! of a child is a plain id, so there are no owning cycles.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::checks::{CaseResult, Checks};
use crate::error::{SetupError, SetupResult};
use crate::log::UnitInfo;

/// Stable identifier of a test unit within a [`TestTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct UnitId(u32);

impl UnitId {
    /// Sentinel for events emitted outside any test unit, such as global
    /// fixture setup and teardown.
    pub const INVALID: Self = Self(u32::MAX);

    /// Builds an id from its raw index.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns false for [`UnitId::INVALID`].
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            f.write_str("INVALID")
        }
    }
}

/// Whether a unit is a leaf case or an interior suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// Runnable leaf.
    Case,
    /// Ordered collection of units.
    Suite,
}

impl UnitKind {
    /// Returns "case" or "suite".
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Case => "case",
            Self::Suite => "suite",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run status requested for a unit before finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    /// Run the unit if its ancestors run.
    Enabled,
    /// Never run the unit.
    Disabled,
    /// Take the parent's status.
    #[default]
    Inherit,
}

/// Run status after finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveStatus {
    /// The unit runs.
    Enabled,
    /// The unit was disabled explicitly.
    Disabled,
    /// An ancestor is disabled.
    AutoDisabled,
}

impl EffectiveStatus {
    /// Returns true if the unit runs.
    #[must_use]
    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// Body of a test case.
pub type CaseBody = Arc<dyn Fn(&mut Checks<'_>) -> CaseResult + Send + Sync>;

enum Node {
    Case(CaseBody),
    Suite(Vec<UnitId>),
}

/// A case or a suite.
pub struct TestUnit {
    id: UnitId,
    name: String,
    parent: Option<UnitId>,
    node: Node,
    default_status: RunStatus,
    effective: EffectiveStatus,
}

impl TestUnit {
    /// The unit's id.
    #[must_use]
    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent suite, `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<UnitId> {
        self.parent
    }

    /// Case or suite.
    #[must_use]
    pub fn kind(&self) -> UnitKind {
        match self.node {
            Node::Case(_) => UnitKind::Case,
            Node::Suite(_) => UnitKind::Suite,
        }
    }

    /// Children in registration order; empty for cases.
    #[must_use]
    pub fn children(&self) -> &[UnitId] {
        match &self.node {
            Node::Suite(children) => children,
            Node::Case(_) => &[],
        }
    }

    /// The case body, `None` for suites.
    #[must_use]
    pub fn body(&self) -> Option<&CaseBody> {
        match &self.node {
            Node::Case(body) => Some(body),
            Node::Suite(_) => None,
        }
    }

    /// Status requested before finalization.
    #[must_use]
    pub fn default_status(&self) -> RunStatus {
        self.default_status
    }

    /// Status computed by [`TestTree::finalize`].
    #[must_use]
    pub fn effective_status(&self) -> EffectiveStatus {
        self.effective
    }
}

impl fmt::Debug for TestUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestUnit")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("parent", &self.parent)
            .field("default_status", &self.default_status)
            .field("effective", &self.effective)
            .finish()
    }
}

/// Arena of test units rooted at a single suite.
///
/// # Example
///
/// ```rust
/// use unitkit::{TestTree, RunStatus};
///
/// let mut tree = TestTree::new("root");
/// let math = tree.add_suite(tree.root(), "math").unwrap();
/// tree.add_case(math, "addition", |t| {
///     t.check(1 + 1 == 2, "1 + 1 == 2");
///     Ok(())
/// })
/// .unwrap();
/// let slow = tree.add_case(math, "slow", |_| Ok(())).unwrap();
/// tree.set_default_status(slow, RunStatus::Disabled).unwrap();
/// tree.finalize().unwrap();
///
/// assert_eq!(tree.case_count(tree.root()), 1);
/// assert_eq!(tree.path(slow).unwrap(), "root/math/slow");
/// ```
#[derive(Debug)]
pub struct TestTree {
    units: Vec<TestUnit>,
    finalized: bool,
}

impl TestTree {
    /// Creates a tree holding only a root suite.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            units: vec![TestUnit {
                id: UnitId(0),
                name: root_name.into(),
                parent: None,
                node: Node::Suite(Vec::new()),
                default_status: RunStatus::Inherit,
                effective: EffectiveStatus::Enabled,
            }],
            finalized: false,
        }
    }

    /// Id of the root suite.
    #[must_use]
    pub fn root(&self) -> UnitId {
        UnitId(0)
    }

    /// Number of units, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// A tree always holds its root, so it is never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Returns true once [`TestTree::finalize`] succeeded.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Adds an empty suite under `parent`.
    pub fn add_suite(&mut self, parent: UnitId, name: impl Into<String>) -> SetupResult<UnitId> {
        self.insert(parent, name.into(), Node::Suite(Vec::new()))
    }

    /// Adds a case under `parent`.
    pub fn add_case<F>(&mut self, parent: UnitId, name: impl Into<String>, body: F) -> SetupResult<UnitId>
    where
        F: Fn(&mut Checks<'_>) -> CaseResult + Send + Sync + 'static,
    {
        self.insert(parent, name.into(), Node::Case(Arc::new(body)))
    }

    /// Adds a data-driven case: a suite named `name` holding one case per
    /// sample, named `_0`, `_1`, ...
    pub fn add_data_case<T, F>(
        &mut self,
        parent: UnitId,
        name: impl Into<String>,
        samples: Vec<T>,
        body: F,
    ) -> SetupResult<UnitId>
    where
        T: Send + Sync + 'static,
        F: Fn(&mut Checks<'_>, &T) -> CaseResult + Send + Sync + 'static,
    {
        let suite = self.add_suite(parent, name)?;
        let samples = Arc::new(samples);
        let body = Arc::new(body);
        for index in 0..samples.len() {
            let samples = Arc::clone(&samples);
            let body = Arc::clone(&body);
            self.add_case(suite, format!("_{index}"), move |t| body(t, &samples[index]))?;
        }
        Ok(suite)
    }

    fn insert(&mut self, parent: UnitId, name: String, node: Node) -> SetupResult<UnitId> {
        if self.finalized {
            return Err(SetupError::Finalized);
        }
        let id = UnitId(u32::try_from(self.units.len()).map_err(|_| SetupError::NotFound(parent))?);
        match &mut self.get_mut(parent)?.node {
            Node::Suite(children) => children.push(id),
            Node::Case(_) => return Err(SetupError::NotASuite(parent)),
        }
        self.units.push(TestUnit {
            id,
            name,
            parent: Some(parent),
            node,
            default_status: RunStatus::Inherit,
            effective: EffectiveStatus::Enabled,
        });
        Ok(id)
    }

    /// Requests a run status for a unit. Only allowed before finalization.
    pub fn set_default_status(&mut self, id: UnitId, status: RunStatus) -> SetupResult<()> {
        if self.finalized {
            return Err(SetupError::Finalized);
        }
        self.get_mut(id)?.default_status = status;
        Ok(())
    }

    /// Looks a unit up by id.
    pub fn resolve(&self, id: UnitId) -> SetupResult<&TestUnit> {
        self.units.get(id.index()).ok_or(SetupError::NotFound(id))
    }

    fn get_mut(&mut self, id: UnitId) -> SetupResult<&mut TestUnit> {
        self.units.get_mut(id.index()).ok_or(SetupError::NotFound(id))
    }

    /// Freezes the tree and computes effective statuses.
    ///
    /// A unit runs only if it and all of its ancestors are enabled.
    pub fn finalize(&mut self) -> SetupResult<()> {
        if self.finalized {
            return Err(SetupError::Finalized);
        }
        // Parents always precede their children in the arena.
        for index in 0..self.units.len() {
            let parent_status = self.units[index]
                .parent
                .map_or(EffectiveStatus::Enabled, |p| self.units[p.index()].effective);
            let unit = &mut self.units[index];
            unit.effective = match (unit.default_status, parent_status) {
                (RunStatus::Disabled, _) => EffectiveStatus::Disabled,
                (_, EffectiveStatus::Enabled) => EffectiveStatus::Enabled,
                _ => EffectiveStatus::AutoDisabled,
            };
        }
        self.finalized = true;
        Ok(())
    }

    /// Number of enabled cases in the subtree rooted at `root`.
    #[must_use]
    pub fn case_count(&self, root: UnitId) -> usize {
        let Ok(unit) = self.resolve(root) else {
            return 0;
        };
        if !unit.effective.is_enabled() {
            return 0;
        }
        match &unit.node {
            Node::Case(_) => 1,
            Node::Suite(children) => children.iter().map(|&c| self.case_count(c)).sum(),
        }
    }

    /// Names from the tree root down to `id`, joined with `/`.
    pub fn path(&self, id: UnitId) -> SetupResult<String> {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            let unit = self.resolve(cur)?;
            names.push(unit.name.as_str());
            current = unit.parent;
        }
        names.reverse();
        Ok(names.join("/"))
    }

    /// Describes a unit for log events.
    pub fn unit_info(&self, id: UnitId) -> SetupResult<UnitInfo> {
        let unit = self.resolve(id)?;
        Ok(UnitInfo {
            id,
            kind: unit.kind(),
            name: unit.name.clone(),
            path: self.path(id)?,
        })
    }
}
