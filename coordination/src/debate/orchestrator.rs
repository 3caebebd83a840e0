//! Debate orchestrator — drives one task through proposal, critique,
//! bounded revision, judgment and the gate.
//!
//! The whole run sits under the total task budget; each round additionally
//! gets `round_timeout_fraction` of it. Progress is written straight into the
//! [`DebateResult`], so a run cut short by the total budget still returns
//! everything it gathered, with `allowed = false`.

use std::sync::Arc;

use serde_json::json;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::ConfigError;
use crate::gate;
use crate::gateway::{ExecutionRequest, ExecutionResult, ModelGateway};
use crate::memory::{ContextItem, ContextProvider};
use crate::normalizer::{normalize, NormalizedRecord, SchemaKind};
use crate::roles::Role;

use super::config::DebateConfig;
use super::prompts;
use super::records::{CritiqueRecord, JudgmentRecord, Proposal};
use super::result::DebateResult;
use super::state::{DebatePhase, TransitionError};

/// Output of a round that expects structured output: the raw text plus the
/// record normalized against the round's schema.
struct StructuredReply {
    content: String,
    record: NormalizedRecord,
}

/// Runs debates. Holds an injected gateway and an optional memory provider;
/// no state is shared between runs.
#[derive(Clone)]
pub struct DebateOrchestrator {
    gateway: ModelGateway,
    memory: Option<Arc<dyn ContextProvider>>,
}

impl DebateOrchestrator {
    pub fn new(gateway: ModelGateway) -> Self {
        Self {
            gateway,
            memory: None,
        }
    }

    pub fn with_memory(mut self, memory: Arc<dyn ContextProvider>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }

    /// Run one debate.
    ///
    /// Only configuration problems return `Err`, and they do so before any
    /// model call. Every runtime failure is recorded in the returned result.
    pub async fn run_debate(&self, task: &str, config: &DebateConfig) -> Result<DebateResult, ConfigError> {
        config.validate()?;
        if task.trim().is_empty() {
            return Err(ConfigError::Invalid("task must not be empty".to_string()));
        }

        let started = Instant::now();
        let mut result = DebateResult::new(task, config.team_id.clone(), config.session_id.clone());
        info!(
            debate_id = %result.debate_id,
            pool = %config.pool,
            generators = config.max_generators,
            fast_mode = config.fast_mode,
            "debate started"
        );

        let outcome = tokio::time::timeout(config.total_timeout(), self.run_phases(task, config, &mut result)).await;

        let clean = match outcome {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!(debate_id = %result.debate_id, error = %e, "debate aborted");
                result.errors.push(format!("internal error: {}", e));
                false
            }
            Err(_) => {
                let phase = result.phases.phase;
                warn!(debate_id = %result.debate_id, phase = %phase, "debate timed out");
                result.errors.push(format!(
                    "debate timed out after {}s during {}",
                    config.timeout_seconds, phase
                ));
                false
            }
        };

        result.phases.finish(if clean { "incomplete debate" } else { "aborted" });
        if !clean || result.gate.is_none() {
            // Abort errors are pushed last; an early exit records its cause first.
            let cause = if clean { result.errors.first() } else { result.errors.last() };
            let reason = cause.cloned().unwrap_or_else(|| "incomplete debate".to_string());
            result.gate = Some(gate::GateDecision::unresolved(reason));
        }
        result.allowed = clean && result.gate.as_ref().is_some_and(|g| g.allowed);
        result.revision_rounds = result.phases.revision_rounds;
        result.execution_time_ms = started.elapsed().as_millis() as u64;

        info!(
            debate_id = %result.debate_id,
            allowed = result.allowed,
            reason = %result.reason(),
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            execution_time_ms = result.execution_time_ms,
            "debate finished"
        );
        Ok(result)
    }

    async fn run_phases(
        &self,
        task: &str,
        config: &DebateConfig,
        result: &mut DebateResult,
    ) -> Result<(), TransitionError> {
        let context = self.fetch_context(task, config, result).await?;

        enter(result, DebatePhase::Proposal, "context ready")?;
        self.propose(task, config, &context, result).await;
        if result.proposals.is_empty() {
            return Ok(());
        }

        if config.fast_mode {
            enter(result, DebatePhase::Judgment, "fast mode")?;
            self.combined_review(task, config, result).await;
        } else {
            enter(result, DebatePhase::Critique, "proposals ready")?;
            self.critique(task, config, None, result).await;
            let revised = self.revise(task, config, result).await?;
            enter(
                result,
                DebatePhase::Judgment,
                if revised { "revision critiqued" } else { "critique done" },
            )?;
            self.judge(task, config, result).await;
        }

        enter(result, DebatePhase::Gate, "judgment done")?;
        let accuracy = result.judgment.as_ref().map_or(0.0, |j| j.accuracy_score);
        let decision = gate::evaluate(
            result.critique.as_ref(),
            result.judgment.as_ref(),
            accuracy,
            result.reliability_passed(),
            &config.gate(),
        );
        info!(
            debate_id = %result.debate_id,
            allowed = decision.allowed,
            reason = %decision.reason,
            accuracy,
            risk = %decision.risk_level,
            "gate decided"
        );
        result.gate = Some(decision);

        self.remember(config, result).await;
        enter(result, DebatePhase::Done, "gate decided")
    }

    /// Best-effort memory lookup. Failures downgrade to "no extra context".
    async fn fetch_context(
        &self,
        task: &str,
        config: &DebateConfig,
        result: &mut DebateResult,
    ) -> Result<Vec<ContextItem>, TransitionError> {
        let Some(memory) = self.memory.as_ref().filter(|_| config.use_memory) else {
            return Ok(Vec::new());
        };
        enter(result, DebatePhase::ContextFetch, "memory enabled")?;

        let search = memory.search(task, config.memory_search_limit);
        match tokio::time::timeout(config.round_timeout(), search).await {
            Ok(Ok(items)) => {
                debug!(debate_id = %result.debate_id, items = items.len(), "context fetched");
                Ok(items)
            }
            Ok(Err(e)) => {
                warn!(debate_id = %result.debate_id, error = %e, "context fetch failed");
                result.warnings.push(format!("context fetch failed: {}", e));
                Ok(Vec::new())
            }
            Err(_) => {
                warn!(debate_id = %result.debate_id, "context fetch timed out");
                result.warnings.push("context fetch timed out".to_string());
                Ok(Vec::new())
            }
        }
    }

    fn request(&self, prompt: String, role: Role, config: &DebateConfig, result: &DebateResult) -> ExecutionRequest {
        ExecutionRequest::new(prompt, config.pool)
            .with_role(role)
            .with_context("debate_id", json!(result.debate_id))
            .with_context("phase", json!(result.phases.phase.to_string()))
            .with_trace(Some(result.debate_id.clone()), result.session_id.clone())
    }

    /// Fan out one gateway call per generator; keep whatever finishes before
    /// the round deadline.
    async fn propose(&self, task: &str, config: &DebateConfig, context: &[ContextItem], result: &mut DebateResult) {
        let count = if config.fast_mode { 1 } else { config.max_generators };
        let deadline = Instant::now() + config.round_timeout();

        let mut set = JoinSet::new();
        for index in 1..=count {
            let agent_id = format!("generator-{}", index);
            let request = self
                .request(
                    prompts::proposal_prompt(task, &agent_id, context),
                    Role::Generator,
                    config,
                    result,
                )
                .with_agent(agent_id.clone());
            let gateway = self.gateway.clone();
            set.spawn(async move { (index, agent_id, gateway.execute(request).await) });
        }

        let mut finished: Vec<(usize, String, ExecutionResult)> = Vec::with_capacity(count);
        let mut timed_out = false;
        loop {
            match tokio::time::timeout_at(deadline, set.join_next()).await {
                Ok(Some(Ok(item))) => finished.push(item),
                Ok(Some(Err(e))) => {
                    warn!(debate_id = %result.debate_id, error = %e, "generator task failed");
                    result.warnings.push(format!("generator task failed: {}", e));
                }
                Ok(None) => break,
                Err(_) => {
                    timed_out = true;
                    set.abort_all();
                    warn!(
                        debate_id = %result.debate_id,
                        finished = finished.len(),
                        generators = count,
                        "proposal round timed out"
                    );
                    result.warnings.push(format!(
                        "proposal round timed out after {}s: {} of {} generators finished",
                        config.round_timeout().as_secs(),
                        finished.len(),
                        count
                    ));
                    break;
                }
            }
        }

        // Results are keyed by agent identity, not completion order.
        finished.sort_by_key(|(index, _, _)| *index);
        for (_, agent_id, execution) in finished {
            if !execution.success {
                warn!(
                    debate_id = %result.debate_id,
                    agent = %agent_id,
                    error_code = ?execution.error_code,
                    "generator failed"
                );
                result.warnings.push(format!(
                    "{} failed: {}",
                    agent_id,
                    execution.error_message.as_deref().unwrap_or("unknown error")
                ));
                continue;
            }
            let proposal = Proposal::from_record(&agent_id, &normalize(&execution.content, SchemaKind::Generator));
            if !proposal.is_substantive() {
                result.warnings.push(format!("{} returned an empty proposal", agent_id));
                continue;
            }
            debug!(debate_id = %result.debate_id, agent = %agent_id, model = %execution.model_used, "proposal recovered");
            result.proposals.push(proposal);
        }

        result.validation.has_proposals = !result.proposals.is_empty();
        if result.proposals.is_empty() {
            let error = if timed_out {
                format!(
                    "proposal round timed out after {}s with no usable proposals",
                    config.round_timeout().as_secs()
                )
            } else {
                format!("no usable proposals from {} generators", count)
            };
            error!(debate_id = %result.debate_id, "{}", error);
            result.errors.push(error);
        } else {
            info!(
                debate_id = %result.debate_id,
                proposals = result.proposals.len(),
                generators = count,
                "proposal round complete"
            );
        }
    }

    /// One gateway call whose output must parse against `kind`, retried once
    /// with a strict-output instruction. Both attempts share the round deadline.
    async fn structured_call(
        &self,
        role: Role,
        kind: SchemaKind,
        prompt: String,
        config: &DebateConfig,
        result: &DebateResult,
    ) -> Result<StructuredReply, String> {
        let attempt = self.parse_with_retry(role, kind, &prompt, config, result);
        match tokio::time::timeout(config.round_timeout(), attempt).await {
            Ok(reply) => reply,
            Err(_) => Err(format!(
                "{} round timed out after {}s",
                kind,
                config.round_timeout().as_secs()
            )),
        }
    }

    async fn parse_with_retry(
        &self,
        role: Role,
        kind: SchemaKind,
        prompt: &str,
        config: &DebateConfig,
        result: &DebateResult,
    ) -> Result<StructuredReply, String> {
        let first = self
            .gateway
            .execute(self.request(prompt.to_string(), role, config, result))
            .await;
        let first = checked(first, kind)?;
        let record = normalize(&first, kind);
        if record.parsed() {
            return Ok(StructuredReply { content: first, record });
        }

        warn!(debate_id = %result.debate_id, schema = %kind, "unstructured reply, retrying with strict instruction");
        let retry = self
            .gateway
            .execute(self.request(prompts::strict(prompt), role, config, result))
            .await;
        let retry = checked(retry, kind)?;
        let record = normalize(&retry, kind);
        if !record.parsed() {
            return Err(format!("{} output unparseable after retry", kind));
        }
        Ok(StructuredReply { content: retry, record })
    }

    async fn critique(&self, task: &str, config: &DebateConfig, revision_notes: Option<&str>, result: &mut DebateResult) {
        let prompt = prompts::critique_prompt(task, &result.proposals, revision_notes);
        match self.structured_call(Role::Critic, SchemaKind::Critic, prompt, config, result).await {
            Ok(reply) => {
                let critique = CritiqueRecord::from_record(&reply.record);
                info!(
                    debate_id = %result.debate_id,
                    verdict = %critique.verdict,
                    must_fix = critique.must_fix.len(),
                    "critique recorded"
                );
                result.critique = Some(critique);
                result.validation.critique_parsed = true;
            }
            Err(e) => {
                error!(debate_id = %result.debate_id, error = %e, "critique failed");
                result.errors.push(format!("critique failed: {}", e));
                // A stale critique must not outlive a failed re-critique.
                result.critique = None;
                result.validation.critique_parsed = false;
            }
        }
    }

    /// Bounded revise → re-critique loop. Returns whether any revision ran.
    async fn revise(&self, task: &str, config: &DebateConfig, result: &mut DebateResult) -> Result<bool, TransitionError> {
        let mut revised = false;
        while result.phases.revision_rounds < config.max_revision_rounds {
            let Some(critique) = result.critique.clone().filter(CritiqueRecord::wants_revision) else {
                break;
            };
            enter(result, DebatePhase::Revision, "critic requested fixes")?;
            info!(
                debate_id = %result.debate_id,
                round = result.phases.revision_rounds,
                fixes = critique.must_fix.len(),
                "revision round"
            );

            let prompt = prompts::revision_prompt(task, &result.proposals, &critique);
            let request = self.request(prompt, Role::Generator, config, result);
            let execution = tokio::time::timeout(config.round_timeout(), self.gateway.execute(request)).await;
            let notes = match execution {
                Ok(execution) if execution.success => execution.content,
                Ok(execution) => {
                    result.warnings.push(format!(
                        "revision failed: {}",
                        execution.error_message.as_deref().unwrap_or("unknown error")
                    ));
                    return Ok(revised);
                }
                Err(_) => {
                    result.warnings.push(format!(
                        "revision round timed out after {}s",
                        config.round_timeout().as_secs()
                    ));
                    return Ok(revised);
                }
            };

            revised = true;
            enter(result, DebatePhase::Critique, "revision applied")?;
            self.critique(task, config, Some(&notes), result).await;
        }
        Ok(revised)
    }

    async fn judge(&self, task: &str, config: &DebateConfig, result: &mut DebateResult) {
        let prompt = prompts::judgment_prompt(task, &result.proposals, result.critique.as_ref());
        match self.structured_call(Role::Judge, SchemaKind::Judge, prompt, config, result).await {
            Ok(reply) => record_judgment(result, &reply.record),
            Err(e) => {
                error!(debate_id = %result.debate_id, error = %e, "judgment failed");
                result.errors.push(format!("judgment failed: {}", e));
            }
        }
    }

    /// Fast mode: one reply normalized against both the critic and judge schemas.
    async fn combined_review(&self, task: &str, config: &DebateConfig, result: &mut DebateResult) {
        result.validation.fast_mode = true;
        let prompt = prompts::combined_review_prompt(task, &result.proposals);
        match self.structured_call(Role::Judge, SchemaKind::Judge, prompt, config, result).await {
            Ok(reply) => {
                let critic = normalize(&reply.content, SchemaKind::Critic);
                if critic.parsed() {
                    result.critique = Some(CritiqueRecord::from_record(&critic));
                    result.validation.critique_parsed = true;
                }
                record_judgment(result, &reply.record);
            }
            Err(e) => {
                error!(debate_id = %result.debate_id, error = %e, "combined review failed");
                result.errors.push(format!("judgment failed: {}", e));
            }
        }
    }

    /// Store a debate summary. Failures are warnings.
    async fn remember(&self, config: &DebateConfig, result: &mut DebateResult) {
        let Some(memory) = self.memory.as_ref().filter(|_| config.use_memory) else {
            return;
        };
        let summary = json!({
            "debate_id": result.debate_id,
            "task": result.task,
            "allowed": result.gate.as_ref().is_some_and(|g| g.allowed),
            "reason": result.reason(),
            "proposals": result.proposals.len(),
            "decision": result.judgment.as_ref().map(|j| j.decision.to_string()),
        })
        .to_string();
        let tags = vec!["debate".to_string(), result.debate_id.clone()];

        match tokio::time::timeout(config.round_timeout(), memory.store(&summary, &tags)).await {
            Ok(Ok(Some(id))) => {
                debug!(debate_id = %result.debate_id, entry = %id, "debate summary stored");
                result.memory_entries.push(id);
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => result.warnings.push(format!("memory store failed: {}", e)),
            Err(_) => result.warnings.push("memory store timed out".to_string()),
        }
    }
}

fn enter(result: &mut DebateResult, to: DebatePhase, reason: &str) -> Result<(), TransitionError> {
    let from = result.phases.phase;
    result.phases.transition(to, reason)?;
    debug!(debate_id = %result.debate_id, from = %from, to = %to, reason, "phase transition");
    Ok(())
}

/// Content of a successful execution, or the failure as a round error.
fn checked(execution: ExecutionResult, kind: SchemaKind) -> Result<String, String> {
    if execution.success {
        Ok(execution.content)
    } else {
        Err(format!(
            "{} call failed: {}",
            kind,
            execution.error_message.as_deref().unwrap_or("unknown error")
        ))
    }
}

fn record_judgment(result: &mut DebateResult, record: &NormalizedRecord) {
    let judgment = JudgmentRecord::from_record(record);
    info!(
        debate_id = %result.debate_id,
        decision = %judgment.decision,
        accuracy = judgment.accuracy_score,
        risk = %judgment.risk_assessment,
        "judgment recorded"
    );
    result.judgment = Some(judgment);
    result.validation.judgment_parsed = true;
}
