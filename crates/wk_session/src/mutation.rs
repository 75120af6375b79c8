/// Two-phase mutation: a local speculative change that the remote either
/// confirms or forces us to undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationPhase {
    #[default]
    Idle,
    Pending { id: i64 },
    Committed { id: i64 },
    RolledBack { id: i64 },
}

impl MutationPhase {
    pub fn is_pending(&self) -> bool {
        matches!(self, MutationPhase::Pending { .. })
    }

    /// Id of the article the last mutation targeted.
    pub fn target(&self) -> Option<i64> {
        match self {
            MutationPhase::Idle => None,
            MutationPhase::Pending { id }
            | MutationPhase::Committed { id }
            | MutationPhase::RolledBack { id } => Some(*id),
        }
    }
}
