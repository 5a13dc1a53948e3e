use thiserror::Error;

use crate::{HookResult, Phase};

/// Name of the anchor phase that always runs first.
pub const INITIAL_PHASE: &str = "initial";

/// Name of the anchor phase that always runs last.
pub const FINAL_PHASE: &str = "final";

/// Phase-list construction error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhaseError {
    #[error("phase name must not be empty")]
    EmptyName,

    #[error("phase name `{0}` collides with an anchor phase")]
    ReservedName(String),

    #[error("duplicate phase name `{0}`")]
    DuplicateName(String),
}

/// An ordered sequence of named phases.
///
/// The anchors [`INITIAL_PHASE`] and [`FINAL_PHASE`] are always present and
/// always first and last. Custom phase names are interleaved between them at
/// construction time only; after that the shape is fixed and only handler
/// content changes (via registration).
pub struct PhaseList<C> {
    phases: Vec<Phase<C>>,
}

impl<C> PhaseList<C> {
    /// A list containing only the two anchor phases.
    pub fn new() -> Self {
        Self {
            phases: vec![Phase::new(INITIAL_PHASE), Phase::new(FINAL_PHASE)],
        }
    }

    /// A list with `names` inserted between the anchors, preserving the
    /// caller-given order.
    ///
    /// Empty, duplicate, or anchor-colliding names are rejected.
    pub fn with_phases<I, S>(names: I) -> Result<Self, PhaseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new();
        for name in names {
            let name = name.as_ref();
            if name.trim().is_empty() {
                return Err(PhaseError::EmptyName);
            }
            if name == INITIAL_PHASE || name == FINAL_PHASE {
                return Err(PhaseError::ReservedName(name.to_string()));
            }
            if list.find(name).is_some() {
                return Err(PhaseError::DuplicateName(name.to_string()));
            }
            // insert just ahead of the trailing `final` anchor
            let at = list.phases.len() - 1;
            list.phases.insert(at, Phase::new(name));
        }
        Ok(list)
    }

    /// Look up a phase by name.
    ///
    /// A `None` here is a configuration error on the caller's side, not a
    /// runtime condition.
    pub fn find(&self, name: &str) -> Option<&Phase<C>> {
        self.phases.iter().find(|phase| phase.name() == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Phase<C>> {
        self.phases.iter_mut().find(|phase| phase.name() == name)
    }

    /// Phase names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.phases.iter().map(Phase::name).collect()
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        // anchors are always present
        false
    }

    /// Run every phase in list order against `ctx`.
    ///
    /// Stops at the first phase whose run reports an error; handlers of a
    /// later phase never start before all handlers of an earlier phase have
    /// completed.
    pub async fn run(&self, ctx: &mut C) -> HookResult {
        for phase in &self.phases {
            phase.run(ctx).await?;
        }
        Ok(())
    }
}

impl<C> Default for PhaseList<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for PhaseList<C> {
    fn clone(&self) -> Self {
        Self {
            phases: self.phases.clone(),
        }
    }
}

impl<C> std::fmt::Debug for PhaseList<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseList")
            .field("phases", &self.names())
            .finish()
    }
}
