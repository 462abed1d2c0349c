//! Approval hand-off between a proposed command and its execution.
//!
//! The presenter shows the raw command text to the user and answers with an
//! [`ApprovalDecision`]. A rejected command never reaches translation.

/// What the user decided about a proposed command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ApprovalDecision {
    /// Run the proposed command unchanged.
    Approve,
    /// Run this replacement instead.
    Modify(String),
    /// Skip execution.
    Reject,
}

impl ApprovalDecision {
    /// The command to translate, or `None` when nothing should run.
    ///
    /// A modification that is empty after trimming counts as a rejection.
    pub fn resolve(&self, raw_command: &str) -> Option<String> {
        match self {
            Self::Approve => Some(raw_command.to_string()),
            Self::Modify(replacement) => {
                let trimmed = replacement.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Self::Reject => None,
        }
    }
}

/// One keystroke-level answer to the approval prompt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ApprovalChoice {
    Yes,
    No,
    Edit,
}

impl ApprovalChoice {
    /// Parse `y`/`yes`, `n`/`no` (or empty) and `e`/`edit`, case-insensitively.
    ///
    /// Empty input means no: running a command needs an explicit yes.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Some(Self::Yes),
            "" | "n" | "no" => Some(Self::No),
            "e" | "edit" => Some(Self::Edit),
            _ => None,
        }
    }
}
