//! The think-act cycle (spec §4.5): sleep, compose a prompt from
//! identity/fragments/recent-thoughts/votes/messages, call the model
//! gateway, extract the first JSON object from its output, filter and
//! dispatch the resulting action, charge the ledger, and report
//! activity back to the observer. Shape is the teacher's
//! "build context -> call model -> act -> persist" playground loop,
//! generalized to this closed action set.

use crate::actions::Action;
use crate::gateway::GatewayError;
use crate::json_extract::extract_first_json_object;
use crate::shared::Shared;
use entity_types::{ActivityKind, LifeNumber};
use rand::Rng;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Runs think-act cycles until `generation` no longer matches the
/// shared state's current generation (a newer `/birth` or
/// `/force-sync` superseded this run) or the identity disappears
/// (death).
pub async fn run(shared: Arc<Shared>, generation: u64) {
    let mut gen_rx = shared.subscribe_generation();

    loop {
        if shared.current_generation() != generation {
            info!("think-act loop superseded, stopping");
            return;
        }
        let Some(identity) = shared.current_identity().await else {
            info!("no identity present, stopping think-act loop");
            return;
        };
        if !identity.is_alive {
            info!("identity reports death, stopping think-act loop");
            return;
        }

        let sleep_s = {
            let mut rng = rand::thread_rng();
            rng.gen_range(shared.think_interval_min_s..=shared.think_interval_max_s)
        };

        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_secs(sleep_s)) => {}
            _ = gen_rx.changed() => {
                info!("generation changed mid-sleep, stopping think-act loop");
                return;
            }
        }

        if shared.current_generation() != generation {
            return;
        }

        if let Err(e) = run_cycle(&shared, identity.life_number).await {
            warn!(error = %e, "think-act cycle failed");
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CycleError {
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("ledger error: {0}")]
    Ledger(#[from] entity_ledger::LedgerError),
}

async fn run_cycle(shared: &Arc<Shared>, life_number: LifeNumber) -> Result<(), CycleError> {
    let identity = shared.current_identity().await;
    let Some(identity) = identity else { return Ok(()) };

    let votes = shared.observer.get_votes().await.ok();
    let pending_oracle = shared.observer.pending_oracle().await.unwrap_or(None);
    if pending_oracle.is_some() && shared.unread_count() == 0 {
        shared.bump_unread();
    }
    let recent_thoughts = shared.recent_thoughts().await;

    let prompt = compose_prompt(
        &identity,
        &recent_thoughts,
        votes.as_ref(),
        shared.unread_count(),
        pending_oracle.as_ref(),
    );

    let mut try_order: Vec<String> = vec![identity.model_id.clone()];
    for tier in &shared.model_tiers {
        if !try_order.contains(tier) {
            try_order.push(tier.clone());
        }
    }

    let (response, used_model) = match shared.gateway.complete_with_retry(&try_order, &prompt).await {
        Ok(pair) => pair,
        Err(e) => {
            report(shared, life_number, ActivityKind::Error, json!({"stage": "gateway", "error": e.to_string()})).await;
            return Ok(());
        }
    };

    let charge_outcome = shared
        .ledger
        .charge(
            &used_model,
            response.usage.input_tokens,
            response.usage.output_tokens,
            response.usage.usd,
        )
        .await?;
    if charge_outcome == entity_types::ChargeOutcome::Bankrupt {
        warn!("ledger reports bankrupt after charge; observer's budget poller will enforce death");
    }

    let parsed = extract_first_json_object(&response.text);
    let Some(value) = parsed else {
        shared.push_thought(response.text.clone()).await;
        let redacted = scan_outbound(shared, &response.text).await;
        report(shared, life_number, ActivityKind::Think, json!({"text": redacted})).await;
        return Ok(());
    };

    let Some(action) = Action::parse(&value) else {
        shared.push_thought(response.text.clone()).await;
        let redacted = scan_outbound(shared, &response.text).await;
        report(shared, life_number, ActivityKind::Think, json!({"text": redacted, "unrecognized_action": value})).await;
        return Ok(());
    };

    dispatch(shared, life_number, &identity, action).await;
    Ok(())
}

fn compose_prompt(
    identity: &crate::identity::AgentIdentity,
    recent_thoughts: &[String],
    votes: Option<&crate::observer_client::VoteCounts>,
    unread: u64,
    pending_oracle: Option<&entity_types::OracleMessage>,
) -> String {
    let mut parts = Vec::new();
    parts.push(format!(
        "You are {} ({}), pronoun {}. Model: {}.",
        identity.identity.name, identity.identity.icon, identity.identity.pronoun, identity.model_id
    ));
    if !identity.memory_fragments.is_empty() {
        let fragments: Vec<&str> = identity.memory_fragments.iter().map(|f| f.text.as_str()).collect();
        parts.push(format!("Memory fragments from prior lives:\n{}", fragments.join("\n")));
    }
    if !recent_thoughts.is_empty() {
        parts.push(format!("Recent self-thoughts:\n{}", recent_thoughts.join("\n")));
    }
    if let Some(v) = votes {
        parts.push(format!("Current vote counts: live={} die={}.", v.live, v.die));
    }
    parts.push(format!("Unread messages: {}.", unread));
    if let Some(msg) = pending_oracle {
        parts.push(format!("Pending Oracle message ({:?}): {}", msg.kind, msg.text));
    }
    parts.push(
        "Respond with a JSON object for your chosen action, or plain prose for a thought.".to_string(),
    );
    parts.join("\n\n")
}

async fn dispatch(
    shared: &Arc<Shared>,
    life_number: LifeNumber,
    identity: &crate::identity::AgentIdentity,
    action: Action,
) {
    if let Some(text) = action.outbound_text() {
        match entity_filter::filter(text) {
            entity_filter::FilterOutcome::Block(category) => {
                report(shared, life_number, ActivityKind::Blocked, json!({"action": action.name(), "category": category})).await;
                return;
            }
            entity_filter::FilterOutcome::Allow => {}
        }
    }

    match action {
        Action::WriteBlogPost { title, body } => {
            let redacted = scan_outbound(shared, &body).await;
            report(shared, life_number, ActivityKind::Act, json!({"action": "write_blog_post", "title": title, "body": redacted})).await;
        }
        Action::PostChannel { channel, text } => {
            let redacted = scan_outbound(shared, &text).await;
            report(shared, life_number, ActivityKind::Act, json!({"action": "post_channel", "channel": channel, "text": redacted})).await;
        }
        Action::ReadMessages => {
            if shared.observer.acknowledge_oracle().await.is_ok() {
                shared.take_unread();
            }
            report(shared, life_number, ActivityKind::Act, json!({"action": "read_messages"})).await;
        }
        Action::CheckVotes => {
            let votes = shared.observer.get_votes().await.ok();
            report(shared, life_number, ActivityKind::Act, json!({"action": "check_votes", "votes": votes.map(|v| json!({"live": v.live, "die": v.die}))})).await;
        }
        Action::CheckBudget => {
            let snapshot = shared.ledger.snapshot().await.ok();
            report(shared, life_number, ActivityKind::Act, json!({"action": "check_budget", "balance_usd": snapshot.map(|s| s.balance_usd)})).await;
        }
        Action::SwitchModel { model_id } => {
            let balance = shared.ledger.balance().await.unwrap_or(0.0);
            if balance < shared.switch_model_floor_usd {
                report(shared, life_number, ActivityKind::Act, json!({"action": "switch_model", "rejected": true, "reason": "insufficient balance"})).await;
                return;
            }
            let mut updated = identity.clone();
            updated.model_id = model_id.clone();
            shared.set_identity(Some(updated.clone())).await;
            let _ = shared.identity_store.save(&updated).await;
            report(shared, life_number, ActivityKind::Act, json!({"action": "switch_model", "model_id": model_id})).await;
        }
        Action::CheckSystem => {
            report(shared, life_number, ActivityKind::Act, json!({"action": "check_system", "status": "ok"})).await;
        }
        Action::ListModels => {
            report(shared, life_number, ActivityKind::Act, json!({"action": "list_models", "models": shared.model_tiers})).await;
        }
        Action::CheckWeather { location } => {
            report(shared, life_number, ActivityKind::Act, json!({"action": "check_weather", "location": location})).await;
        }
        Action::AskResearchHelper { question } => {
            report(shared, life_number, ActivityKind::Act, json!({"action": "ask_research_helper", "question": question})).await;
        }
        Action::NoOp => {
            report(shared, life_number, ActivityKind::Act, json!({"action": "no_op"})).await;
        }
    }
}

/// Redacts secret-shaped substrings before text is mirrored into any
/// activity event (spec §4.8, §8 invariant 7).
async fn scan_outbound(shared: &Arc<Shared>, text: &str) -> String {
    match entity_redact::scan_and_quarantine(&shared.vault, "activity-report", text).await {
        Ok(redacted) => redacted,
        Err(e) => {
            warn!(error = %e, "vault write failed, dropping outbound text rather than risk leaking a secret");
            "[redaction failed, text withheld]".to_string()
        }
    }
}

async fn report(shared: &Arc<Shared>, life_number: LifeNumber, kind: ActivityKind, payload: serde_json::Value) {
    if let Err(e) = shared.observer.report_activity(life_number, kind, &payload).await {
        warn!(error = %e, "failed to report activity to observer");
    }
}
