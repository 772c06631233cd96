//! Topic naming.
//!
//! `<command_prefix>/<environment>/<exhibit>/<name>` carries commands to an
//! exhibit; `<state_prefix>/<environment>/<exhibit>/<name>` carries the
//! exhibit's reports.

pub const GOTO_BEAT: &str = "goto-beat";
pub const SET_VOLUME: &str = "set-volume";
pub const AVAILABILITY: &str = "availability";

pub const DEFAULT_COMMAND_PREFIX: &str = "cmd";
pub const DEFAULT_STATE_PREFIX: &str = "state";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    Command,
    State,
}

/// A topic split back into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicParts {
    pub kind: TopicKind,
    pub exhibit: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    command_prefix: String,
    state_prefix: String,
    environment: String,
}

impl Topics {
    pub fn new(environment: impl Into<String>) -> Self {
        Self::with_prefixes(DEFAULT_COMMAND_PREFIX, DEFAULT_STATE_PREFIX, environment)
    }

    pub fn with_prefixes(
        command_prefix: impl Into<String>,
        state_prefix: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            command_prefix: command_prefix.into(),
            state_prefix: state_prefix.into(),
            environment: environment.into(),
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn command(&self, exhibit: &str, name: &str) -> String {
        format!("{}/{}/{exhibit}/{name}", self.command_prefix, self.environment)
    }

    pub fn state(&self, exhibit: &str, name: &str) -> String {
        format!("{}/{}/{exhibit}/{name}", self.state_prefix, self.environment)
    }

    /// Split a topic of this environment. Returns `None` for foreign
    /// prefixes, other environments and the wrong number of segments.
    pub fn parse(&self, topic: &str) -> Option<TopicParts> {
        let mut segments = topic.split('/');
        let prefix = segments.next()?;
        let environment = segments.next()?;
        let exhibit = segments.next()?;
        let name = segments.next()?;

        if segments.next().is_some()
            || environment != self.environment
            || exhibit.is_empty()
            || name.is_empty()
        {
            return None;
        }

        let kind = if prefix == self.command_prefix {
            TopicKind::Command
        } else if prefix == self.state_prefix {
            TopicKind::State
        } else {
            return None;
        };

        Some(TopicParts {
            kind,
            exhibit: exhibit.to_string(),
            name: name.to_string(),
        })
    }
}
