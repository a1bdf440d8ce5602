//! Stages of the two-step comparison workflow

use std::fmt;

/// Position in the compare-then-format workflow
///
/// ```text
/// Start → Compare → Format → Done
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Nothing has run yet
    Start,
    /// Asking the model to evaluate the condition in prose
    Compare,
    /// Forcing the prose into a `ComparisonResult`
    Format,
    /// A validated result is available
    Done,
}

impl Stage {
    /// The stage that follows this one
    pub fn next(self) -> Stage {
        match self {
            Stage::Start => Stage::Compare,
            Stage::Compare => Stage::Format,
            Stage::Format | Stage::Done => Stage::Done,
        }
    }

    /// Whether the workflow has finished
    pub fn is_terminal(self) -> bool {
        self == Stage::Done
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::Compare => "compare",
            Stage::Format => "format",
            Stage::Done => "done",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        let mut stage = Stage::Start;
        let mut seen = vec![stage];
        while !stage.is_terminal() {
            stage = stage.next();
            seen.push(stage);
        }
        assert_eq!(
            seen,
            vec![Stage::Start, Stage::Compare, Stage::Format, Stage::Done]
        );
        assert_eq!(Stage::Done.next(), Stage::Done);
        assert_eq!(Stage::Format.to_string(), "format");
    }
}
