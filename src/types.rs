//! Core types for the relay.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Position of an event in the log. Strictly increasing, never reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Sequence(pub u64);

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seq({})", self.0)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Sequence {
    /// Tail of an empty log.
    pub const ZERO: Sequence = Sequence(0);

    pub fn next(self) -> Self {
        Sequence(self.0 + 1)
    }

    pub fn prev(self) -> Option<Self> {
        if self.0 > 0 {
            Some(Sequence(self.0 - 1))
        } else {
            None
        }
    }
}

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time. Clocks set before the epoch read as zero.
    pub fn now() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or(0);
        Timestamp(micros)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// GitHub repository id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryId(pub i64);

impl fmt::Debug for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RepositoryId({})", self.0)
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// GitHub Actions job id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl fmt::Debug for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JobId({})", self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of lifecycle event.
///
/// There is no `step-end`: steps finish too quickly for a second
/// notification to be worth the noise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum EventKind {
    /// A CI job started running tests.
    Begin,
    /// A CI job finished.
    End,
    /// A single test started.
    TestBegin,
    /// A single test finished.
    TestEnd,
    /// A step inside a test started.
    StepBegin,
}

impl EventKind {
    /// Wire name, as used for SSE `event:` lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Begin => "begin",
            EventKind::End => "end",
            EventKind::TestBegin => "test-begin",
            EventKind::TestEnd => "test-end",
            EventKind::StepBegin => "step-begin",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a test by location. Compared by value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestIdentifier {
    /// Spec file the test lives in.
    pub file_path: String,
    /// Enclosing `describe` blocks, outermost first.
    pub path: Vec<String>,
    pub title: String,
}

impl TestIdentifier {
    pub fn new(
        file_path: impl Into<String>,
        path: impl IntoIterator<Item = impl Into<String>>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            path: path.into_iter().map(Into::into).collect(),
            title: title.into(),
        }
    }
}

/// Identifies one step of one attempt of a test.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepIdentifier {
    pub test: TestIdentifier,
    pub index: u32,
    pub retry: u32,
}

/// Kind-dependent event data.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Payload {
    #[default]
    None,
    Test(TestIdentifier),
    Step(StepIdentifier),
}

impl Payload {
    /// The test this payload refers to, directly or through a step.
    pub fn test(&self) -> Option<&TestIdentifier> {
        match self {
            Payload::None => None,
            Payload::Test(test) => Some(test),
            Payload::Step(step) => Some(&step.test),
        }
    }
}

/// One immutable lifecycle notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub sequence: Sequence,
    pub kind: EventKind,
    pub repository_id: RepositoryId,
    pub job_id: Option<JobId>,
    pub payload: Payload,
    pub published_at: Timestamp,
}
