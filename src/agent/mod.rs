//! Assistant that answers chat messages, optionally by writing and running
//! a Python script.
//!
//! ## Pipeline
//!
//! ```text
//! message ──> router::classify ──Clarify──> reply::clarification
//!                   │
//!                Trigger
//!                   v
//!     generator.rs  ScriptGenerator::generate()   (chat-completion API)
//!                   │ source text
//!                   v
//!     workspace.rs  Workspace::persist()          (script_XXXXXXXX.py)
//!                   │ path
//!                   v
//!     executor.rs   ScriptExecutor::execute()     (interpreter, timeout)
//!                   │ ExecutionResult
//!                   v
//!     reply.rs      render(PipelineOutcome) ──> reply text
//! ```
//!
//! Each stage returns a typed value; `Assistant::route` turns the final
//! `PipelineOutcome` into text, so it never fails.

pub mod executor;
pub mod generator;
pub mod reply;
pub mod router;
pub mod workspace;

use std::sync::Arc;

use self::executor::ScriptExecutor;
use self::generator::ScriptGenerator;
use self::reply::PipelineOutcome;
use self::router::{Intent, TriggerKeywords};
use self::workspace::Workspace;

pub struct Assistant {
    generator: Arc<dyn ScriptGenerator>,
    workspace: Workspace,
    executor: ScriptExecutor,
    keywords: TriggerKeywords,
}

impl Assistant {
    pub fn new(
        generator: Arc<dyn ScriptGenerator>,
        workspace: Workspace,
        executor: ScriptExecutor,
        keywords: TriggerKeywords,
    ) -> Self {
        Self {
            generator,
            workspace,
            executor,
            keywords,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Answer one chat message. Every failure is rendered into the reply.
    pub async fn route(&self, message: &str) -> String {
        reply::render(&self.handle(message).await)
    }

    /// Classify and, when triggered, run the pipeline, without formatting.
    pub async fn handle(&self, message: &str) -> PipelineOutcome {
        match router::classify(message, &self.keywords) {
            Intent::Clarify => {
                tracing::debug!("message did not match trigger keywords");
                PipelineOutcome::Clarification {
                    message: message.to_string(),
                }
            }
            Intent::Trigger => self.run_pipeline(message).await,
        }
    }

    async fn run_pipeline(&self, instruction: &str) -> PipelineOutcome {
        tracing::info!("generating script");
        let source = match self.generator.generate(instruction).await {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(error = %e, "script generation failed");
                return PipelineOutcome::GenerationFailed(e);
            }
        };

        let script = match self.workspace.persist(&source).await {
            Ok(script) => script,
            Err(e) => {
                tracing::warn!(error = %e, "failed to persist script");
                return PipelineOutcome::PersistFailed(e);
            }
        };

        tracing::info!(file = %script.file_name, "executing script");
        let result = self.executor.execute(&script.path).await;

        PipelineOutcome::Executed {
            instruction: instruction.to_string(),
            file_name: script.file_name,
            result,
        }
    }
}
