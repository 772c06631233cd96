use crate::protocol::topics::{GOTO_BEAT, SET_VOLUME, TopicKind, TopicParts, Topics};

/// **VALUE**: Verifies the `cmd/<env>/<exhibit>/<name>` and `state/...` layouts.
///
/// **WHY THIS MATTERS**: Topics are exact-match. One stray segment and commands go nowhere.
#[test]
fn given_default_prefixes_when_building_topics_then_matches_wire_layout() {
    let topics = Topics::new("prod");

    assert_eq!(topics.command("basecamp", GOTO_BEAT), "cmd/prod/basecamp/goto-beat");
    assert_eq!(topics.state("summit", SET_VOLUME), "state/prod/summit/set-volume");
}

/// **VALUE**: Verifies topics split back into kind, exhibit and name.
#[test]
fn given_command_topic_when_parsed_then_returns_parts() {
    let topics = Topics::with_prefixes("c", "s", "dev");

    let parts = topics.parse("s/dev/overlook/goto-beat");

    assert_eq!(
        parts,
        Some(TopicParts {
            kind: TopicKind::State,
            exhibit: String::from("overlook"),
            name: String::from("goto-beat"),
        })
    );
}

/// **VALUE**: Verifies foreign environments, prefixes and shapes are not claimed.
///
/// **BUG THIS CATCHES**: Would catch a staging docent driving production displays because
/// the environment segment was ignored.
#[test]
fn given_foreign_topics_when_parsed_then_returns_none() {
    let topics = Topics::new("prod");

    assert_eq!(topics.parse("cmd/staging/basecamp/goto-beat"), None);
    assert_eq!(topics.parse("other/prod/basecamp/goto-beat"), None);
    assert_eq!(topics.parse("cmd/prod/basecamp"), None);
    assert_eq!(topics.parse("cmd/prod/basecamp/goto-beat/extra"), None);
    assert_eq!(topics.parse("cmd/prod//goto-beat"), None);
}
