//! Child-run spawning.

use async_trait::async_trait;
use ensemble_protocol::Message;
use ensemble_tools::AgentSpawner;
use ensemble_tools::SpawnOutcome;
use ensemble_tools::SpawnRequest;
use futures::future;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::outcome::RunInput;
use crate::runner::AgentRunner;
use crate::runner::RunSeed;

/// Launches child runs on behalf of one parent run.
///
/// Built fresh for each dispatch batch, carrying a snapshot of the
/// parent's state at the moment the model requested the spawn. Whether
/// a child actually receives that snapshot is decided by the child's
/// own definition flags when the runner seeds it.
pub(crate) struct RunSpawner {
    runner: AgentRunner,
    parent_history: Vec<Message>,
    parent_system_prompt: Option<String>,
    parent_run_id: String,
    depth: u32,
    cancel_token: CancellationToken,
}

impl RunSpawner {
    pub(crate) fn new(
        runner: AgentRunner,
        parent_history: Vec<Message>,
        parent_system_prompt: Option<String>,
        parent_run_id: String,
        depth: u32,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            runner,
            parent_history,
            parent_system_prompt,
            parent_run_id,
            depth,
            cancel_token,
        }
    }

    /// Run one child to its terminal state, folding any failure into the
    /// outcome.
    async fn spawn_one(&self, request: SpawnRequest) -> SpawnOutcome {
        let agent_id = request.agent_id.clone();
        debug!(agent_id = %agent_id, depth = self.depth + 1, "spawning child run");

        let input = RunInput {
            prompt: request.prompt,
            params: request.params,
        };
        let seed = RunSeed {
            messages: Some(self.parent_history.clone()),
            system_prompt: self.parent_system_prompt.clone(),
            parent_run_id: Some(self.parent_run_id.clone()),
        };

        // Indirect recursion through spawn_agents needs a boxed future
        let run = Box::pin(self.runner.run_at_depth(
            &agent_id,
            input,
            seed,
            self.depth + 1,
            self.cancel_token.child_token(),
        ));
        match run.await {
            Ok(outcome) => SpawnOutcome::Completed {
                agent_id,
                output: outcome.output,
            },
            Err(e) => SpawnOutcome::Failed {
                agent_id,
                error: e.to_string(),
            },
        }
    }
}

#[async_trait]
impl AgentSpawner for RunSpawner {
    async fn spawn_many(&self, requests: Vec<SpawnRequest>) -> Vec<SpawnOutcome> {
        let futures: Vec<_> = requests.into_iter().map(|r| self.spawn_one(r)).collect();
        future::join_all(futures).await
    }
}
