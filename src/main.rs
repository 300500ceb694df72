use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use stepsim::audio::build_sink;
use stepsim::services::llm::{GenerativeTransport, HttpTransport};
use stepsim::services::{ConversationClient, SpeechClient};
use stepsim::simulation::{scenarios, SimulationState, SCENARIOS};
use stepsim::{CompletedTurn, Notice, PendingTurn, ServiceConfig, Session, TurnOutcome};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let scenario_id = std::env::args().nth(1);
    let scenario = match scenario_id.as_deref().and_then(scenarios::find) {
        Some(s) => s,
        None => {
            if let Some(id) = scenario_id {
                println!("Unknown scenario '{}'.", id);
            }
            println!("Usage: stepsim <scenario>\n\nScenarios:");
            for s in SCENARIOS {
                println!("  {:<10} {} {} / {} ({:?})", s.id, s.icon, s.title, s.hebrew_title, s.difficulty);
            }
            return Ok(());
        }
    };

    let config = ServiceConfig::from_env()?;
    if !config.credential.is_set() {
        tracing::warn!("No API key set (GEMINI_API_KEY). Use /key <KEY> to connect one.");
    }
    tracing::info!("stepsim booting: scenario={} audio={:?}", scenario.id, config.audio);

    let transport: Arc<dyn GenerativeTransport> = Arc::new(HttpTransport::new(&config));
    let conversation = ConversationClient::new(transport.clone(), &config);
    let speech = SpeechClient::new(transport, build_sink(&config.audio), &config);
    let mut session = Session::new(scenario, conversation, speech);

    println!("{} {} / {}", scenario.icon, scenario.title, scenario.hebrew_title);
    println!("Commands: /hint  /goals  /retry  /key <KEY>  /quit\n");

    // Requests run as their own tasks; results come back here in arrival order
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<CompletedTurn>();
    let spawn_turn = |pending: PendingTurn| {
        let tx = done_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(pending.run().await);
        });
    };

    spawn_turn(session.issue_start());

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    loop {
        tokio::select! {
            Some(done) = done_rx.recv() => {
                let outcome = session.apply(done);
                report(&session, outcome);
                if session.is_complete() {
                    println!("\n🎉 All goals completed! ({})", session.progress());
                    break;
                }
            }
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let issued = match line.split_once(' ').map_or((line, ""), |(c, rest)| (c, rest.trim())) {
                    ("/quit", _) | ("/exit", _) => break,
                    ("/goals", _) => {
                        print_goals(session.state());
                        continue;
                    }
                    ("/key", key) => {
                        if key.is_empty() {
                            println!("Usage: /key <KEY>");
                        } else {
                            config.credential.replace(key);
                            println!("Personal key connected.");
                        }
                        continue;
                    }
                    ("/retry", _) => match session.issue_retry() {
                        Some(issued) => issued.map(Some),
                        None if session.state().is_none() => Ok(Some(session.issue_start())),
                        None => {
                            println!("Nothing to retry.");
                            continue;
                        }
                    },
                    ("/hint", _) => session.issue_hint().map(Some),
                    _ => session.issue_say(line),
                };

                match issued {
                    Ok(Some(pending)) => spawn_turn(pending),
                    Ok(None) => {}
                    Err(notice) => println!("⚠️  {}", notice.message()),
                }
            }
        }
    }

    session.drain_speech();
    let snap = session.telemetry.snapshot();
    tracing::info!(
        "Session {} ended: {} turns, {} failed, avg latency {:.0}ms",
        session.id,
        snap.request_stats.completed,
        snap.request_stats.failed,
        snap.request_stats.avg_latency_ms
    );
    Ok(())
}

fn report(session: &Session, outcome: Result<TurnOutcome, Notice>) {
    match outcome {
        Ok(TurnOutcome::Applied) => {
            if let Some(state) = session.state() {
                print_turn(state);
                println!("   [{}]", session.progress());
            }
        }
        Ok(TurnOutcome::Stale) | Ok(TurnOutcome::Skipped) => {}
        Err(notice) => println!("⚠️  {}", notice.message()),
    }
}

fn print_turn(state: &SimulationState) {
    println!("\n🗣  {}", state.screen_text);
    if let Some(correction) = state.correction() {
        println!("✏️  {}", correction);
    }
    if let Some(hint) = state.hint() {
        println!("💡 {}", hint);
    }
}

fn print_goals(state: Option<&SimulationState>) {
    let Some(state) = state else {
        println!("No goals yet.");
        return;
    };
    for goal in &state.goal_status {
        let mark = if goal.is_completed() { "✔" } else { " " };
        println!("  [{}] {} {}", mark, goal.emoji, goal.label);
    }
    println!("  {} ({}%)", state.progress(), state.progress().percent());
}
