use crate::{
    handlers::AppState,
    services::TrustOracle,
    terminal::{OracleBackend, TerminalInput, TerminalState, VerificationTerminal},
};
use axum::{
    extract::{
        ws::{Message, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Independent sources polled per terminal run.
const TERMINAL_SOURCES: usize = 5;

pub async fn terminal_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| {
        let (sender, receiver) = socket.split();
        run_session(sender, receiver, state)
    })
}

/// The oracle stage timer already covers the confirmation wait, so the
/// terminal tallies through an oracle with no delay of its own.
pub fn build_terminal(state: &AppState) -> VerificationTerminal<OracleBackend> {
    VerificationTerminal::new(
        OracleBackend::new(Arc::new(TrustOracle::new(Duration::ZERO)), TERMINAL_SOURCES),
        state.stage_delays(),
    )
}

/// Reads one input, streams every state the terminal enters, then closes.
pub async fn run_session<S, R, E>(mut sender: S, mut receiver: R, state: AppState)
where
    S: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, E>> + Unpin,
{
    let input = loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<TerminalInput>(&text) {
                Ok(input) => break input,
                Err(e) => {
                    let rejected = TerminalState::Upload {
                        error: Some(format!("invalid input: {}", e)),
                    };
                    if send_state(&mut sender, &rejected).await.is_err() {
                        return;
                    }
                }
            },
            Some(Ok(Message::Ping(data))) => {
                if sender.send(Message::Pong(data)).await.is_err() {
                    return;
                }
            }
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
            Some(Ok(_)) => {}
        }
    };

    let terminal = build_terminal(&state);

    let (tx, mut rx) = mpsc::unbounded_channel::<TerminalState>();
    let run = terminal.run(&input, move |s| {
        let _ = tx.send(s.clone());
    });
    let forward = async {
        while let Some(s) = rx.recv().await {
            if send_state(&mut sender, &s).await.is_err() {
                break;
            }
        }
    };

    let (final_state, ()) = tokio::join!(run, forward);
    tracing::debug!(?final_state, "Terminal run finished");

    let _ = sender.send(Message::Close(None)).await;
}

async fn send_state<S>(sender: &mut S, state: &TerminalState) -> Result<(), S::Error>
where
    S: Sink<Message> + Unpin,
{
    match serde_json::to_string(state) {
        Ok(msg) => sender.send(Message::Text(msg)).await,
        Err(e) => {
            tracing::error!("Could not encode terminal state: {}", e);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Timings, services::Store};
    use futures::{channel::mpsc as channel, stream};
    use serde_json::Value;
    use tokio::time::Instant;

    fn state(timings: Timings) -> AppState {
        AppState::new(Arc::new(Store::in_memory()), timings)
    }

    async fn session(inputs: Vec<Message>) -> Vec<Message> {
        let (sender, outbox) = channel::unbounded::<Message>();
        let receiver = stream::iter(inputs.into_iter().map(Ok::<_, axum::Error>));
        run_session(sender, receiver, state(Timings::instant())).await;
        outbox.collect().await
    }

    fn as_json(message: &Message) -> Value {
        match message {
            Message::Text(text) => serde_json::from_str(text).unwrap(),
            other => panic!("expected a text frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn streams_states_in_order_then_closes() {
        let sent = session(vec![Message::Text(
            r#"{"kind":"file","name":"r.png","text":"Paid $3.00 TX-77"}"#.to_string(),
        )])
        .await;

        assert_eq!(sent.len(), 5);
        let states: Vec<Value> = sent[..4].iter().map(as_json).collect();
        let stages: Vec<&str> = states[..3]
            .iter()
            .map(|s| {
                assert_eq!(s["state"], "processing");
                s["stage"].as_str().unwrap()
            })
            .collect();
        assert_eq!(
            stages,
            vec!["ocr_analysis", "multi_source_check", "oracle_submission"]
        );
        assert_eq!(states[3]["state"], "verified");
        assert_eq!(states[3]["result"]["tx_id"], "TX-77");
        assert_eq!(states[3]["result"]["vote_count"], 5);
        assert!(matches!(sent[4], Message::Close(None)));
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_and_session_keeps_waiting() {
        let sent = session(vec![
            Message::Text("{\"kind\":\"fax\"}".to_string()),
            Message::Ping(vec![1, 2]),
            Message::Text(r#"{"kind":"manual","id":"UPI-1"}"#.to_string()),
        ])
        .await;

        let rejected = as_json(&sent[0]);
        assert_eq!(rejected["state"], "upload");
        assert!(rejected["error"]
            .as_str()
            .unwrap()
            .starts_with("invalid input:"));
        assert!(matches!(&sent[1], Message::Pong(data) if data == &vec![1, 2]));
        assert_eq!(as_json(&sent[2])["stage"], "ocr_analysis");
        assert_eq!(as_json(&sent[5])["state"], "verified");
        assert!(matches!(sent.last(), Some(Message::Close(None))));
    }

    #[tokio::test]
    async fn closed_before_input_sends_nothing() {
        assert!(session(vec![Message::Close(None)]).await.is_empty());
        assert!(session(Vec::new()).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn default_run_waits_only_on_stage_timers() {
        let terminal = build_terminal(&state(Timings::default()));
        let input = TerminalInput::Manual {
            id: "TX-DEFAULT".into(),
        };

        let started = Instant::now();
        let final_state = terminal.run(&input, |_| {}).await;
        let elapsed = started.elapsed();

        assert!(matches!(final_state, TerminalState::Verified { .. }));
        assert!(elapsed >= Duration::from_millis(3500));
        assert!(elapsed < Duration::from_millis(3600));
    }
}
