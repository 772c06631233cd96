mod broker;
mod config;
mod navigation;
mod protocol;
mod sync;

use models::{Sequence, SequenceBuilder};

use std::sync::Arc;

/// `welcome` (3 beats) followed by `problem` (2 beats).
pub(crate) fn welcome_problem() -> Arc<Sequence> {
    Arc::new(
        SequenceBuilder::default()
            .with_moment("welcome", "Welcome", 3)
            .with_moment("problem", "The Problem", 2)
            .build()
            .unwrap(),
    )
}
