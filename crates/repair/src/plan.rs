//! Lazy rewrite plans.
//!
//! Each stage records what it would emit as a list of steps that either
//! point back at an input message or carry a newly built one. Nothing is
//! cloned until the plan turns out to differ from the input, so an
//! untouched transcript comes back as the very slice it was given.

use std::borrow::Cow;

use mender_core::Message;

enum Step {
    Keep(usize),
    Insert(Message),
}

pub(crate) struct Plan<'a> {
    source: &'a [Message],
    steps: Vec<Step>,
}

impl<'a> Plan<'a> {
    pub(crate) fn new(source: &'a [Message]) -> Self {
        Self {
            source,
            steps: Vec::with_capacity(source.len()),
        }
    }

    /// Emit the input message at `index` as-is.
    pub(crate) fn keep(&mut self, index: usize) {
        self.steps.push(Step::Keep(index));
    }

    /// Emit a newly constructed message.
    pub(crate) fn insert(&mut self, message: Message) {
        self.steps.push(Step::Insert(message));
    }

    pub(crate) fn finish(self) -> Cow<'a, [Message]> {
        let source = self.source;
        let unchanged = self.steps.len() == source.len()
            && self
                .steps
                .iter()
                .enumerate()
                .all(|(pos, step)| matches!(step, Step::Keep(index) if *index == pos));
        if unchanged {
            return Cow::Borrowed(source);
        }

        Cow::Owned(
            self.steps
                .into_iter()
                .map(|step| match step {
                    Step::Keep(index) => source[index].clone(),
                    Step::Insert(message) => message,
                })
                .collect(),
        )
    }
}
