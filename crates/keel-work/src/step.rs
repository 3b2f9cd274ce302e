//! Steps and step chains
//!
//! A [`Step`] is one node of a singly-linked chain: an action plus an
//! optional next step. Chains are immutable once built, so concatenation
//! rebuilds the links and can never introduce a cycle. Cloning a step is
//! cheap (reference counted).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;

use keel_common::Error;

use crate::packet::Packet;

/// Name reported for terminal steps
pub const TERMINAL_STEP_NAME: &str = "terminal";

/// What the engine does after an action returns
pub enum NextAction {
    /// Proceed with the linked next step
    Continue,
    /// Run the given chain, then resume with the linked next step
    Insert(Step),
    /// Run the given chain instead of the rest of the current chain
    Branch(Step),
    /// Skip everything that remains in the attempt, without error
    Terminate,
    /// Run this same step again after (at least) the given delay
    RetryAfter(Duration),
}

impl fmt::Debug for NextAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => f.write_str("Continue"),
            Self::Insert(step) => f.debug_tuple("Insert").field(&step.name()).finish(),
            Self::Branch(step) => f.debug_tuple("Branch").field(&step.name()).finish(),
            Self::Terminate => f.write_str("Terminate"),
            Self::RetryAfter(delay) => f.debug_tuple("RetryAfter").field(delay).finish(),
        }
    }
}

/// The work a step performs
#[async_trait]
pub trait Action: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Run against the attempt's packet and say how to continue
    async fn apply(&self, packet: &mut Packet) -> Result<NextAction, Error>;
}

#[derive(Clone)]
enum Kind {
    Action(Arc<dyn Action>),
    Terminal,
}

struct Node {
    kind: Kind,
    critical: bool,
    next: Option<Step>,
}

/// Head of an executable chain of actions
#[derive(Clone)]
pub struct Step {
    node: Arc<Node>,
}

impl Step {
    /// Wrap an action in a single-node chain
    pub fn new(action: impl Action + 'static) -> Self {
        Self::from_action(Arc::new(action))
    }

    /// Wrap a shared action in a single-node chain
    pub fn from_action(action: Arc<dyn Action>) -> Self {
        Self::node(Kind::Action(action), false, None)
    }

    /// Build a step from an async closure
    ///
    /// ```ignore
    /// let step = Step::from_fn("load-config", |packet| Box::pin(async move {
    ///     packet.insert("loaded", &true)?;
    ///     Ok(NextAction::Continue)
    /// }));
    /// ```
    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: for<'a> Fn(&'a mut Packet) -> BoxFuture<'a, Result<NextAction, Error>>
            + Send
            + Sync
            + 'static,
    {
        Self::new(FnAction {
            name: name.into(),
            f,
        })
    }

    /// Build a step from a synchronous closure
    pub fn sync_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut Packet) -> Result<NextAction, Error> + Send + Sync + 'static,
    {
        Self::new(SyncFnAction {
            name: name.into(),
            f,
        })
    }

    /// A step that ends its chain without touching the packet
    pub fn terminal() -> Self {
        Self::node(Kind::Terminal, false, None)
    }

    /// Concatenate chains in order and return the head
    ///
    /// Terminal steps that are not at the very end are dropped, so a chain
    /// ending in a terminal can be extended. An empty input yields a
    /// terminal step.
    pub fn chain<I>(steps: I) -> Self
    where
        I: IntoIterator<Item = Step>,
    {
        let mut flat: Vec<(Kind, bool)> = Vec::new();
        for step in steps {
            for node in step.nodes() {
                flat.push((node.kind.clone(), node.critical));
            }
        }

        let last = flat.len().saturating_sub(1);
        let kept = flat
            .into_iter()
            .enumerate()
            .filter(|(i, (kind, _))| *i == last || !matches!(kind, Kind::Terminal))
            .map(|(_, node)| node)
            .collect();
        Self::link(kept)
    }

    /// Append `next` after the end of this chain
    pub fn then(self, next: Step) -> Self {
        Self::chain([self, next])
    }

    /// Run `then` if `predicate` holds for the packet, otherwise `otherwise`,
    /// then continue with whatever follows this step
    pub fn conditional<P>(name: impl Into<String>, predicate: P, then: Step, otherwise: Step) -> Self
    where
        P: Fn(&Packet) -> bool + Send + Sync + 'static,
    {
        Self::new(ConditionalAction {
            name: name.into(),
            predicate: Box::new(predicate),
            then,
            otherwise,
        })
    }

    /// Mark every step of this chain as critical
    ///
    /// Critical steps still run after the attempt is cancelled.
    pub fn critical(self) -> Self {
        let nodes = self.nodes().map(|n| (n.kind.clone(), true)).collect();
        Self::link(nodes)
    }

    /// Name of the head step
    pub fn name(&self) -> &str {
        match &self.node.kind {
            Kind::Action(action) => action.name(),
            Kind::Terminal => TERMINAL_STEP_NAME,
        }
    }

    /// Whether the head step is a terminal step
    pub fn is_terminal(&self) -> bool {
        matches!(self.node.kind, Kind::Terminal)
    }

    /// Whether the head step survives cancellation
    pub fn is_critical(&self) -> bool {
        self.node.critical
    }

    /// The linked next step
    pub fn next(&self) -> Option<&Step> {
        self.node.next.as_ref()
    }

    /// Names of all steps in the chain, head first
    pub fn names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut current = Some(self);
        while let Some(step) = current {
            names.push(step.name().to_string());
            current = step.next();
        }
        names
    }

    /// Number of steps in the chain
    pub fn len(&self) -> usize {
        self.nodes().count()
    }

    /// A chain always holds at least one step
    pub fn is_empty(&self) -> bool {
        false
    }

    pub(crate) fn action(&self) -> Option<&Arc<dyn Action>> {
        match &self.node.kind {
            Kind::Action(action) => Some(action),
            Kind::Terminal => None,
        }
    }

    fn node(kind: Kind, critical: bool, next: Option<Step>) -> Self {
        Self {
            node: Arc::new(Node {
                kind,
                critical,
                next,
            }),
        }
    }

    fn link(nodes: Vec<(Kind, bool)>) -> Self {
        let mut next: Option<Step> = None;
        for (kind, critical) in nodes.into_iter().rev() {
            next = Some(Self::node(kind, critical, next));
        }
        next.unwrap_or_else(Self::terminal)
    }

    fn nodes(&self) -> impl Iterator<Item = &Node> {
        std::iter::successors(Some(self), |step| step.next()).map(|step| step.node.as_ref())
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step").field("chain", &self.names()).finish()
    }
}

struct FnAction<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F> Action for FnAction<F>
where
    F: for<'a> Fn(&'a mut Packet) -> BoxFuture<'a, Result<NextAction, Error>> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, packet: &mut Packet) -> Result<NextAction, Error> {
        (self.f)(packet).await
    }
}

struct SyncFnAction<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F> Action for SyncFnAction<F>
where
    F: Fn(&mut Packet) -> Result<NextAction, Error> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, packet: &mut Packet) -> Result<NextAction, Error> {
        (self.f)(packet)
    }
}

struct ConditionalAction {
    name: String,
    predicate: Box<dyn Fn(&Packet) -> bool + Send + Sync>,
    then: Step,
    otherwise: Step,
}

#[async_trait]
impl Action for ConditionalAction {
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, packet: &mut Packet) -> Result<NextAction, Error> {
        let branch = if (self.predicate)(packet) {
            &self.then
        } else {
            &self.otherwise
        };
        Ok(NextAction::Insert(branch.clone()))
    }
}
