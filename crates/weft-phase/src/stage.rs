/// Sub-stage of a phase.
///
/// Every phase keeps one FIFO handler queue per sub-stage and always runs
/// them in `Before` → `Use` → `After` order. Registrations carry the
/// sub-stage structurally; there is no string suffix to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SubStage {
    /// Runs ahead of the phase's main work.
    Before,
    /// The phase's main queue. This is the default sub-stage.
    #[default]
    Use,
    /// Runs after the phase's main work.
    After,
}

impl SubStage {
    /// All sub-stages in execution order.
    pub const ORDER: [SubStage; 3] = [SubStage::Before, SubStage::Use, SubStage::After];
}

impl std::fmt::Display for SubStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubStage::Before => write!(f, "before"),
            SubStage::Use => write!(f, "use"),
            SubStage::After => write!(f, "after"),
        }
    }
}
