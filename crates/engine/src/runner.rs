// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine loop.
//!
//! One iteration: rebuild state from the journal, compose context, call the
//! LLM, journal the thought, execute each requested tool (audit first,
//! event second), re-evaluate the stopping conditions. The iteration
//! counter, the conversation, and the waiting-for-input state are all
//! derived from events; the loop itself holds nothing it could not
//! recompute after a crash.

use crate::builtins::builtin_tool_schemas;
use crate::compose::Composer;
use crate::error::EngineError;
use crate::hooks::run_hooks;
use crate::interaction::{self, AskHumanArgs, InteractionRequest};
use crate::rebuild::{
    iteration_count, pending_interaction, pending_requests, terminal_status, INTERRUPTED_RESULT,
};
use crate::tools::{ToolExecutor, ToolInvocation, ToolOutcome};
use delta_adapters::{ChatRequest, LlmAdapter, ToolSchema, ToolSchemaParam};
use delta_config::LoadedAgent;
use delta_core::{CallId, Event, LifecyclePoint, RunStatus, ToolCallRequest};
use delta_journal::{
    AuditLog, Journal, JournalRecord, RunHandle, ToolExecutionRecord, WorkspaceLayout,
};
use delta_sessions::SessionManager;
use serde_json::json;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// Per-invocation options from the CLI.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Initial task; journaled as the first `USER_MESSAGE` of a new run.
    pub task: Option<String>,
    /// Synchronous ask-human (prompt on the terminal) instead of parking.
    pub interactive: bool,
    /// Auto-answer confirmations in synchronous mode.
    pub assume_yes: bool,
    /// Override of the agent's iteration cap.
    pub max_iterations: Option<u32>,
}

/// How the loop ended, mapped to the CLI exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    /// Terminal LLM reply without tool calls.
    Completed,
    /// `RUN_END(failed)` was journaled; the reason is in the payload.
    Failed(String),
    /// An async `ask_human` parked the run; exit 101.
    WaitingForInput,
}

enum AskFlow {
    Answered,
    Parked,
}

/// The stateless engine for one run.
pub struct Engine<L> {
    agent: LoadedAgent,
    layout: WorkspaceLayout,
    run: RunHandle,
    journal: Journal,
    audit: AuditLog,
    llm: L,
    sessions: SessionManager,
    options: EngineOptions,
}

impl<L: LlmAdapter> Engine<L> {
    pub fn new(
        agent: LoadedAgent,
        layout: WorkspaceLayout,
        run: RunHandle,
        llm: L,
        options: EngineOptions,
    ) -> Result<Self, EngineError> {
        let journal = run.open_journal()?;
        let audit = AuditLog::open(run.paths())?;
        let sessions = SessionManager::new(layout.sessions_dir());

        Ok(Self {
            agent,
            layout,
            run,
            journal,
            audit,
            llm,
            sessions,
            options,
        })
    }

    pub fn run_handle(&self) -> &RunHandle {
        &self.run
    }

    /// Drive the loop to a terminal outcome.
    pub async fn run(&mut self) -> Result<LoopOutcome, EngineError> {
        let result = self.run_inner().await;

        if let Err(e) = &result {
            let payload = json!({
                "point": "on_error",
                "run_id": self.run.run_id().as_str(),
                "error": e.to_string(),
            });
            let hooks = run_hooks(
                &self.agent.config.hooks,
                LifecyclePoint::OnError,
                &payload,
                self.layout.root(),
            )
            .await;
            for outcome in &hooks.outcomes {
                let _ = self.append_hook_event(outcome);
            }
            let _ = self.journal.append(&Event::RunEnd {
                status: RunStatus::Failed,
                error: Some(e.to_string()),
            });
            let _ = self.run.set_status(RunStatus::Failed);
        }

        result
    }

    async fn run_inner(&mut self) -> Result<LoopOutcome, EngineError> {
        let records = self.journal.read_all_ordered()?;

        if records.is_empty() {
            self.journal.append(&Event::RunStart {
                run_id: self.run.run_id().to_string(),
                agent_path: self.agent.agent_dir.clone(),
                task: self.options.task.clone(),
                config_hash: self.agent.config_hash.clone(),
            })?;
            if let Some(task) = self.options.task.clone() {
                self.journal.append(&Event::UserMessage { content: task })?;
            }
        } else {
            match terminal_status(&records) {
                Some(RunStatus::Completed) => {
                    // Clean completion; resume is a no-op.
                    if self.options.task.is_some() {
                        warn!("run already completed; ignoring new task (start a fresh run)");
                    }
                    return Ok(LoopOutcome::Completed);
                }
                Some(RunStatus::Failed) => {
                    return Ok(LoopOutcome::Failed(
                        "previous run already ended as failed".to_string(),
                    ));
                }
                _ => {}
            }

            self.close_orphaned_requests(&records)?;

            if pending_interaction(&records).is_some() {
                match self.resolve_interaction(&records).await? {
                    AskFlow::Parked => return Ok(LoopOutcome::WaitingForInput),
                    AskFlow::Answered => {}
                }
            } else if let Some(task) = self.options.task.clone() {
                self.journal.append(&Event::UserMessage { content: task })?;
            }
        }

        self.iterate().await
    }

    /// The T-A-O loop proper.
    async fn iterate(&mut self) -> Result<LoopOutcome, EngineError> {
        loop {
            let records = self.journal.read_all_ordered()?;
            let iterations = iteration_count(&records);
            let cap = self
                .options
                .max_iterations
                .unwrap_or(self.agent.config.max_iterations);

            if iterations >= cap {
                info!(iterations, cap, "iteration cap reached");
                self.journal.append(&Event::RunEnd {
                    status: RunStatus::Failed,
                    error: Some("max_iterations".to_string()),
                })?;
                self.run.set_status(RunStatus::Failed)?;
                return Ok(LoopOutcome::Failed("max_iterations".to_string()));
            }

            self.hook_point(
                LifecyclePoint::PreLlmRequest,
                json!({
                    "point": "pre_llm_request",
                    "run_id": self.run.run_id().as_str(),
                    "iteration": iterations,
                }),
            )
            .await?;

            let composer = Composer::new(
                &self.agent.config.context,
                &self.agent.agent_dir,
                &self.layout,
            );
            let composed = composer.compose(&records).await?;
            for warning in &composed.warnings {
                warn!(warning = %warning, "context source degraded");
                self.journal.append(&Event::SystemMessage {
                    content: warning.clone(),
                })?;
            }

            let request = ChatRequest {
                system: composed.system,
                messages: composed.messages,
                tools: self.tool_schemas(),
                iteration: iterations,
            };

            let response = match self.llm.complete(&request).await {
                Ok(response) => response,
                Err(e) => {
                    let reason = format!("llm transport: {}", e);
                    self.hook_point_best_effort(
                        LifecyclePoint::OnError,
                        json!({
                            "point": "on_error",
                            "run_id": self.run.run_id().as_str(),
                            "error": reason.clone(),
                        }),
                    )
                    .await;
                    self.journal.append(&Event::RunEnd {
                        status: RunStatus::Failed,
                        error: Some(reason.clone()),
                    })?;
                    self.run.set_status(RunStatus::Failed)?;
                    return Ok(LoopOutcome::Failed(reason));
                }
            };

            self.audit.record_invocation(
                &serde_json::to_value(&request).map_err(std::io::Error::other)?,
                &serde_json::to_value(&response).map_err(std::io::Error::other)?,
            )?;

            self.hook_point(
                LifecyclePoint::PostLlmResponse,
                json!({
                    "point": "post_llm_response",
                    "run_id": self.run.run_id().as_str(),
                    "iteration": iterations,
                    "tool_calls": response.tool_calls.len(),
                }),
            )
            .await?;

            let tool_calls = self.normalize_calls(response.tool_calls);
            self.journal.append(&Event::Thought {
                content: response.content.clone(),
                tool_calls: tool_calls.clone(),
            })?;

            if tool_calls.is_empty() {
                self.journal.append(&Event::RunEnd {
                    status: RunStatus::Completed,
                    error: None,
                })?;
                self.run.set_status(RunStatus::Completed)?;
                return Ok(LoopOutcome::Completed);
            }

            for call in tool_calls {
                self.journal.append(&Event::ActionRequest {
                    call_id: call.call_id.clone(),
                    tool: call.name.clone(),
                    args: call.arguments.clone(),
                })?;

                self.hook_point(
                    LifecyclePoint::PreToolExec,
                    json!({
                        "point": "pre_tool_exec",
                        "run_id": self.run.run_id().as_str(),
                        "call_id": call.call_id.as_str(),
                        "tool": call.name.clone(),
                        "args": call.arguments.clone(),
                    }),
                )
                .await?;

                if call.name == "ask_human" {
                    match self.ask_human(&call).await? {
                        AskFlow::Parked => return Ok(LoopOutcome::WaitingForInput),
                        AskFlow::Answered => {}
                    }
                } else {
                    let invocation = self.dispatch(&call).await;
                    self.record_result(&call, invocation)?;
                }

                self.hook_point(
                    LifecyclePoint::PostToolExec,
                    json!({
                        "point": "post_tool_exec",
                        "run_id": self.run.run_id().as_str(),
                        "call_id": call.call_id.as_str(),
                        "tool": call.name.clone(),
                    }),
                )
                .await?;
            }
        }
    }

    /// Journal error results for requests the previous process never
    /// finished, so a run that later completes keeps the 1:1 pairing. A
    /// parked interaction is excluded; its answer arrives separately.
    fn close_orphaned_requests(
        &mut self,
        records: &[JournalRecord],
    ) -> Result<(), EngineError> {
        let waiting: Option<CallId> = pending_interaction(records).and_then(|r| match &r.event {
            Event::InteractionRequested { call_id, .. } => Some(call_id.clone()),
            _ => None,
        });

        for (call_id, tool) in pending_requests(records) {
            if waiting.as_ref() == Some(&call_id) {
                continue;
            }
            warn!(call_id = %call_id, tool = %tool, "closing action orphaned by restart");
            let call = ToolCallRequest {
                call_id,
                name: tool,
                arguments: Default::default(),
            };
            self.record_result(
                &call,
                invocation(
                    vec![call.name.clone()],
                    ToolOutcome::rejected(INTERRUPTED_RESULT),
                ),
            )?;
        }
        Ok(())
    }

    /// Audit, then journal, one tool result. Order is load-bearing: the
    /// audit file must exist before the event that references it.
    fn record_result(
        &mut self,
        call: &ToolCallRequest,
        invocation: ToolInvocation,
    ) -> Result<(), EngineError> {
        let outcome = invocation.outcome;
        self.audit.record_tool_execution(&ToolExecutionRecord {
            tool: call.name.clone(),
            call_id: call.call_id.to_string(),
            argv: invocation.argv,
            stdin: invocation.stdin,
            stdout: outcome.stdout.clone(),
            stderr: outcome.stderr.clone(),
            exit_code: outcome.exit_code,
            duration_ms: outcome.duration_ms,
            truncated: outcome.truncated,
            error: outcome.error.clone(),
        })?;

        self.journal.append(&Event::ActionResult {
            call_id: call.call_id.clone(),
            exit_code: outcome.exit_code,
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            duration_ms: outcome.duration_ms,
            truncated: outcome.truncated,
            error: outcome.error,
        })?;
        Ok(())
    }

    /// Route one call to a built-in or the configured tool set.
    async fn dispatch(&self, call: &ToolCallRequest) -> ToolInvocation {
        match call.name.as_str() {
            "session_start" => self.session_start(call).await,
            "session_exec" => self.session_exec(call).await,
            "session_end" => self.session_end(call).await,
            _ => match self.agent.config.tool(&call.name) {
                Some(tool) => {
                    let executor = ToolExecutor::new(
                        &self.agent.config,
                        self.layout.root(),
                        &self.agent.agent_dir,
                    );
                    executor.invoke(tool, &call.arguments).await
                }
                None => ToolInvocation {
                    argv: vec![call.name.clone()],
                    stdin: None,
                    outcome: ToolOutcome::rejected(format!(
                        "unknown tool '{}'; available tools are listed in the request",
                        call.name
                    )),
                },
            },
        }
    }

    async fn session_start(&self, call: &ToolCallRequest) -> ToolInvocation {
        let started = Instant::now();
        let argv = vec!["session_start".to_string()];

        let Some(command) = call.arguments.get("command").filter(|c| !c.is_empty()) else {
            return invocation(argv, ToolOutcome::rejected("session_start requires 'command'"));
        };
        let cwd = call
            .arguments
            .get("cwd")
            .map(PathBuf::from)
            .unwrap_or_else(|| self.layout.root().to_path_buf());
        let parts: Vec<String> = command.split_whitespace().map(String::from).collect();

        match self.sessions.start(&parts, &cwd).await {
            Ok(meta) => invocation(
                argv,
                ToolOutcome {
                    exit_code: Some(0),
                    stdout: format!("{}\n", meta.session_id),
                    duration_ms: started.elapsed().as_millis() as u64,
                    ..ToolOutcome::default()
                },
            ),
            Err(e) => invocation(argv, ToolOutcome::rejected(e.to_string())),
        }
    }

    async fn session_exec(&self, call: &ToolCallRequest) -> ToolInvocation {
        let argv = vec!["session_exec".to_string()];

        let Some(session_id) = call.arguments.get("session_id") else {
            return invocation(argv, ToolOutcome::rejected("session_exec requires 'session_id'"));
        };
        let Some(command) = call.arguments.get("command") else {
            return invocation(argv, ToolOutcome::rejected("session_exec requires 'command'"));
        };
        let timeout_ms = match call.arguments.get("timeout_ms") {
            None => None,
            Some(raw) => match raw.parse::<u64>() {
                Ok(ms) => Some(ms),
                Err(_) => {
                    return invocation(
                        argv,
                        ToolOutcome::rejected(format!("invalid timeout_ms '{}'", raw)),
                    )
                }
            },
        };

        match self
            .sessions
            .exec(&session_id.as_str().into(), command, timeout_ms)
            .await
        {
            Ok(reply) => invocation(
                argv,
                ToolOutcome {
                    exit_code: Some(reply.exit_code),
                    stdout: reply.stdout,
                    stderr: reply.stderr,
                    duration_ms: reply.duration_ms,
                    ..ToolOutcome::default()
                },
            ),
            Err(e) => invocation(argv, ToolOutcome::rejected(e.to_string())),
        }
    }

    async fn session_end(&self, call: &ToolCallRequest) -> ToolInvocation {
        let started = Instant::now();
        let argv = vec!["session_end".to_string()];

        let Some(session_id) = call.arguments.get("session_id") else {
            return invocation(argv, ToolOutcome::rejected("session_end requires 'session_id'"));
        };

        match self.sessions.end(&session_id.as_str().into()).await {
            Ok(()) => invocation(
                argv,
                ToolOutcome {
                    exit_code: Some(0),
                    stdout: format!("session {} ended\n", session_id),
                    duration_ms: started.elapsed().as_millis() as u64,
                    ..ToolOutcome::default()
                },
            ),
            Err(e) => invocation(argv, ToolOutcome::rejected(e.to_string())),
        }
    }

    /// Handle one `ask_human` call in the configured mode.
    async fn ask_human(&mut self, call: &ToolCallRequest) -> Result<AskFlow, EngineError> {
        let args = match AskHumanArgs::parse(&call.arguments) {
            Ok(args) => args,
            Err(message) => {
                self.record_result(
                    call,
                    invocation(
                        vec!["ask_human".to_string()],
                        ToolOutcome::rejected(message),
                    ),
                )?;
                return Ok(AskFlow::Answered);
            }
        };

        if self.options.interactive {
            let outcome = match interaction::prompt_terminal(&args, self.options.assume_yes) {
                Ok(answer) => ToolOutcome {
                    exit_code: Some(0),
                    stdout: answer,
                    ..ToolOutcome::default()
                },
                Err(e) => ToolOutcome::rejected(format!("terminal read failed: {}", e)),
            };
            self.record_result(call, invocation(vec!["ask_human".to_string()], outcome))?;
            return Ok(AskFlow::Answered);
        }

        let request = InteractionRequest {
            call_id: call.call_id.clone(),
            prompt: args.prompt.clone(),
            input_type: args.input_type,
            sensitive: args.sensitive,
            requested_at: delta_journal::now_iso8601(),
        };
        request.write(self.run.paths())?;

        self.journal.append(&Event::InteractionRequested {
            call_id: call.call_id.clone(),
            prompt: args.prompt,
            input_type: args.input_type,
            sensitive: args.sensitive,
        })?;
        self.run.set_status(RunStatus::WaitingForInput)?;
        info!(
            response_file = %self.run.paths().interaction_response_path().display(),
            "run is waiting for input"
        );
        Ok(AskFlow::Parked)
    }

    /// Pick up the answer for a parked interaction, if it has been written.
    async fn resolve_interaction(
        &mut self,
        records: &[JournalRecord],
    ) -> Result<AskFlow, EngineError> {
        let Some(record) = pending_interaction(records) else {
            return Ok(AskFlow::Answered);
        };
        let Event::InteractionRequested { call_id, .. } = &record.event else {
            return Ok(AskFlow::Answered);
        };

        let Some(answer) = interaction::read_response(self.run.paths())? else {
            info!(
                response_file = %self.run.paths().interaction_response_path().display(),
                "still waiting for input; write the response file and re-run"
            );
            return Ok(AskFlow::Parked);
        };

        let call = ToolCallRequest {
            call_id: call_id.clone(),
            name: "ask_human".to_string(),
            arguments: Default::default(),
        };

        self.journal.append(&Event::InteractionResolved {
            call_id: call_id.clone(),
        })?;
        self.record_result(
            &call,
            invocation(
                vec!["ask_human".to_string()],
                ToolOutcome {
                    exit_code: Some(0),
                    stdout: answer,
                    ..ToolOutcome::default()
                },
            ),
        )?;
        interaction::clear(self.run.paths())?;
        self.run.set_status(RunStatus::Running)?;

        Ok(AskFlow::Answered)
    }

    /// Hook point that journals outcomes and honors `abort`.
    async fn hook_point(
        &mut self,
        point: LifecyclePoint,
        payload: serde_json::Value,
    ) -> Result<(), EngineError> {
        if self.agent.config.hooks.for_point(point).is_empty() {
            return Ok(());
        }

        let run = run_hooks(&self.agent.config.hooks, point, &payload, self.layout.root()).await;
        for outcome in &run.outcomes {
            self.append_hook_event(outcome)?;
        }
        match run.abort {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Hook point for paths that are already failing; abort is ignored.
    async fn hook_point_best_effort(&mut self, point: LifecyclePoint, payload: serde_json::Value) {
        if self.agent.config.hooks.for_point(point).is_empty() {
            return;
        }
        let run = run_hooks(&self.agent.config.hooks, point, &payload, self.layout.root()).await;
        for outcome in &run.outcomes {
            let _ = self.append_hook_event(outcome);
        }
    }

    fn append_hook_event(&mut self, outcome: &crate::hooks::HookOutcome) -> Result<(), EngineError> {
        self.journal.append(&Event::HookExecuted {
            point: outcome.point,
            exit_code: outcome.exit_code,
            duration_ms: outcome.duration_ms,
            output: outcome.output.clone(),
            timed_out: outcome.timed_out,
        })?;
        Ok(())
    }

    /// Configured tools plus built-ins, as presented to the LLM.
    fn tool_schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .agent
            .config
            .tools
            .iter()
            .map(|tool| ToolSchema {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool
                    .parameters
                    .iter()
                    .map(|p| ToolSchemaParam {
                        name: p.name.clone(),
                        required: p.required,
                        description: p.description.clone(),
                    })
                    .collect(),
            })
            .collect();
        schemas.extend(builtin_tool_schemas());
        schemas
    }

    /// Ensure every tool call has a usable call id.
    fn normalize_calls(&self, calls: Vec<ToolCallRequest>) -> Vec<ToolCallRequest> {
        calls
            .into_iter()
            .map(|mut call| {
                if call.call_id.as_str().is_empty() {
                    call.call_id = CallId::generate();
                }
                call
            })
            .collect()
    }
}

fn invocation(argv: Vec<String>, outcome: ToolOutcome) -> ToolInvocation {
    ToolInvocation {
        argv,
        stdin: None,
        outcome,
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
