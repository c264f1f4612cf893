use std::collections::HashSet;

use ga_broker::commands::{Invocation, Middleware, Next};
use ga_core::CommandError;

use super::RUN_ONE_GEN;
use crate::state::GaState;

/// Marks the session as working while selected commands run.
///
/// Other commands on the same session, such as `info` from another
/// connection, then report `status: "working"`.
#[derive(Clone, Debug)]
pub struct WorkingStatus {
    commands: HashSet<String>,
}

impl WorkingStatus {
    /// Mark work for the named commands.
    pub fn new<I, T>(commands: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for WorkingStatus {
    fn default() -> Self {
        Self::new([RUN_ONE_GEN])
    }
}

impl Middleware<GaState> for WorkingStatus {
    fn call(&self, cx: &Invocation<'_, GaState>, next: Next<'_, GaState>) -> Result<(), CommandError> {
        if !self.commands.contains(cx.command) {
            return next.run(cx);
        }
        let _work = cx.state.begin_work();
        next.run(cx)
    }
}
