use std::fmt;

/// Work unit of the pipeline; the name under which failures are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Parsing the delivery body into a job id.
    Receive,
    Retrieve,
    Normalize,
    Classify,
    MapLabels,
    Tag,
    /// Acknowledging the delivery.
    Acknowledge,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Receive => "receive",
            Stage::Retrieve => "retrieve",
            Stage::Normalize => "normalize",
            Stage::Classify => "classify",
            Stage::MapLabels => "map_labels",
            Stage::Tag => "tag",
            Stage::Acknowledge => "acknowledge",
        }
    }

    /// State reached when this stage succeeds.
    pub fn reached(&self) -> JobState {
        match self {
            Stage::Receive => JobState::Received,
            Stage::Retrieve => JobState::Retrieved,
            Stage::Normalize => JobState::Normalized,
            Stage::Classify => JobState::Classified,
            Stage::MapLabels => JobState::LabelMapped,
            Stage::Tag => JobState::Tagged,
            Stage::Acknowledge => JobState::Complete,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of one job.
///
/// `Received -> Retrieved -> Normalized -> Classified -> LabelMapped -> Tagged -> Complete`,
/// with `Failed` reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Received,
    Retrieved,
    Normalized,
    Classified,
    LabelMapped,
    Tagged,
    Complete,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Complete | JobState::Failed)
    }

    /// The only state that may follow `self` on success.
    pub fn successor(&self) -> Option<JobState> {
        match self {
            JobState::Received => Some(JobState::Retrieved),
            JobState::Retrieved => Some(JobState::Normalized),
            JobState::Normalized => Some(JobState::Classified),
            JobState::Classified => Some(JobState::LabelMapped),
            JobState::LabelMapped => Some(JobState::Tagged),
            JobState::Tagged => Some(JobState::Complete),
            JobState::Complete | JobState::Failed => None,
        }
    }

    pub fn can_transition_to(&self, next: JobState) -> bool {
        match next {
            JobState::Failed => !self.is_terminal(),
            other => self.successor() == Some(other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Received => "received",
            JobState::Retrieved => "retrieved",
            JobState::Normalized => "normalized",
            JobState::Classified => "classified",
            JobState::LabelMapped => "label_mapped",
            JobState::Tagged => "tagged",
            JobState::Complete => "complete",
            JobState::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
