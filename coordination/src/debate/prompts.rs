//! Prompt builders for each debate round.
//!
//! Every prompt that expects structured output ends with the JSON shape the
//! normalizer's template for that role uses, so a cooperative model lands on
//! the direct-parse rung.

use crate::memory::ContextItem;

use super::records::{CritiqueRecord, Proposal};

const GENERATOR_SHAPE: &str = r#"{
  "agent_id": "<your id>",
  "approach": "<how you solve it>",
  "code": "<the change>",
  "tests": "<tests, or null>",
  "risk_level": "low | medium | high",
  "confidence": 0.0,
  "tools_used": []
}"#;

const CRITIC_SHAPE: &str = r#"{
  "verdict": "pass | revise | reject",
  "findings": {"<category>": ["<issue>"]},
  "must_fix": ["<blocking fix>"],
  "nice_to_have": ["<optional improvement>"],
  "confidence": 0.0
}"#;

const JUDGE_SHAPE: &str = r#"{
  "decision": "accept | merge | reject",
  "runner_instructions": ["<ordered step>"],
  "rationale": "<why>",
  "confidence": 0.0,
  "risk_assessment": "low | medium | high",
  "accuracy_score": 0.0
}"#;

/// Appended on the single retry after an unparseable critique/judgment.
pub const STRICT_OUTPUT_INSTRUCTION: &str = "Your previous answer could not be parsed. \
Respond with ONLY the JSON object below. No prose, no markdown fences, no commentary.";

fn context_section(context: &[ContextItem]) -> String {
    if context.is_empty() {
        return String::new();
    }
    let mut section = String::from("\n## Relevant context\n");
    for item in context {
        section.push_str("- ");
        section.push_str(item.content.trim());
        section.push('\n');
    }
    section
}

fn proposals_section(proposals: &[Proposal]) -> String {
    let mut section = String::new();
    for proposal in proposals {
        section.push_str(&format!(
            "\n### Proposal from {} (risk: {}, confidence: {:.2})\n{}\n",
            proposal.agent_id, proposal.risk_level, proposal.confidence, proposal.approach
        ));
        if !proposal.code.is_empty() {
            section.push_str(&format!("```\n{}\n```\n", proposal.code));
        }
        if let Some(tests) = &proposal.tests {
            section.push_str(&format!("Tests:\n```\n{}\n```\n", tests));
        }
    }
    section
}

pub fn proposal_prompt(task: &str, agent_id: &str, context: &[ContextItem]) -> String {
    format!(
        "You are {agent_id}, one of several independent generators.\n\
         Propose a solution for the task below.\n\n\
         ## Task\n{task}\n{context}\n\
         Respond with a JSON object:\n{GENERATOR_SHAPE}",
        context = context_section(context),
    )
}

pub fn critique_prompt(task: &str, proposals: &[Proposal], revision_notes: Option<&str>) -> String {
    let mut prompt = format!(
        "You are the critic. Review the proposals for the task below. \
         Use \"reject\" only when no proposal is salvageable; list blocking \
         problems under must_fix.\n\n## Task\n{task}\n\n## Proposals{}",
        proposals_section(proposals)
    );
    if let Some(notes) = revision_notes {
        prompt.push_str(&format!("\n## Revision applied by the team\n{}\n", notes));
    }
    prompt.push_str(&format!("\nRespond with a JSON object:\n{CRITIC_SHAPE}"));
    prompt
}

pub fn revision_prompt(task: &str, proposals: &[Proposal], critique: &CritiqueRecord) -> String {
    let fixes: String = critique
        .must_fix
        .iter()
        .enumerate()
        .map(|(i, fix)| format!("{}. {}\n", i + 1, fix))
        .collect();
    format!(
        "The critic asked for a revision. Apply every fix below to the best \
         proposal and return the revised approach and code.\n\n\
         ## Task\n{task}\n\n## Proposals{}\n## Must fix\n{fixes}",
        proposals_section(proposals)
    )
}

pub fn judgment_prompt(task: &str, proposals: &[Proposal], critique: Option<&CritiqueRecord>) -> String {
    let critique_section = match critique {
        Some(c) => format!(
            "\n## Critique\nverdict: {}\nmust fix: {}\nnice to have: {}\n",
            c.verdict,
            if c.must_fix.is_empty() { "none".to_string() } else { c.must_fix.join("; ") },
            if c.nice_to_have.is_empty() { "none".to_string() } else { c.nice_to_have.join("; ") },
        ),
        None => "\n## Critique\nnot available\n".to_string(),
    };
    format!(
        "You are the judge. Decide whether the work is ready. \
         Score accuracy from 0 to 10 and give ordered runner instructions \
         for whoever executes the accepted change.\n\n\
         ## Task\n{task}\n\n## Proposals{}{critique_section}\n\
         Respond with a JSON object:\n{JUDGE_SHAPE}",
        proposals_section(proposals)
    )
}

/// Fast mode: critique and judgment in one response.
pub fn combined_review_prompt(task: &str, proposals: &[Proposal]) -> String {
    format!(
        "You are both critic and judge. Review the proposal and decide in a \
         single pass.\n\n## Task\n{task}\n\n## Proposals{}\n\
         Respond with ONE JSON object containing all critic fields:\n{CRITIC_SHAPE}\n\
         and all judge fields:\n{JUDGE_SHAPE}",
        proposals_section(proposals)
    )
}

/// Prefix `prompt` with the strict-output instruction for a retry.
pub fn strict(prompt: &str) -> String {
    format!("{STRICT_OUTPUT_INSTRUCTION}\n\n{prompt}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::records::{RiskLevel, Verdict};
    use std::collections::BTreeMap;

    fn proposal() -> Proposal {
        Proposal {
            agent_id: "generator-1".to_string(),
            approach: "use a semaphore".to_string(),
            code: "let permit = sem.acquire().await?;".to_string(),
            tests: None,
            risk_level: RiskLevel::Low,
            confidence: 0.8,
            tools_used: vec![],
        }
    }

    #[test]
    fn test_proposal_prompt_includes_context() {
        let prompt = proposal_prompt("limit concurrency", "generator-2", &[ContextItem::new("we use tokio")]);
        assert!(prompt.contains("generator-2"));
        assert!(prompt.contains("- we use tokio"));
        assert!(prompt.contains("\"risk_level\""));
    }

    #[test]
    fn test_revision_prompt_numbers_fixes() {
        let critique = CritiqueRecord {
            verdict: Verdict::Revise,
            findings: BTreeMap::new(),
            must_fix: vec!["handle closed semaphore".to_string(), "add a test".to_string()],
            nice_to_have: vec![],
            confidence: 0.6,
        };
        let prompt = revision_prompt("limit concurrency", &[proposal()], &critique);
        assert!(prompt.contains("1. handle closed semaphore"));
        assert!(prompt.contains("2. add a test"));
        assert!(prompt.contains("Proposal from generator-1"));
    }

    #[test]
    fn test_judgment_prompt_without_critique() {
        let prompt = judgment_prompt("task", &[proposal()], None);
        assert!(prompt.contains("not available"));
        assert!(prompt.contains("\"accuracy_score\""));
    }

    #[test]
    fn test_strict_prefix() {
        assert!(strict("body").starts_with(STRICT_OUTPUT_INSTRUCTION));
    }
}
