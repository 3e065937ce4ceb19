use super::ports::{self, ActorPort, ActorRequestError};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[tokio::test]
async fn test_request_response() {
    let (request, receiver) = ports::Request::<&str, f64, ()>::new("eDP-1");
    assert_eq!(request.payload, "eDP-1");
    request
        .response_sender
        .send(Ok(0.5))
        .expect("Channel failure when sending response");
    let response = receiver
        .await
        .expect("Channel failure when receiving response");
    assert_eq!(response, Ok(0.5));
}

enum DimmerMessage {
    Dim,
    // Actors must not stop on a message in real code, this only exists to
    // exercise the error paths of ActorPort.
    Vanish,
}

/// Spawns an actor that can dim twice before refusing.
fn spawn_two_step_dimmer(
    termination_flag: Arc<AtomicBool>,
) -> ActorPort<DimmerMessage, usize, std::io::Error> {
    let (port, mut rx) = ActorPort::make();
    tokio::spawn(async move {
        let mut steps = 0;
        while let Some(req) = rx.recv().await {
            match req.payload {
                DimmerMessage::Dim if steps < 2 => {
                    req.response_sender
                        .send(Ok(steps))
                        .expect("Couldn't respond to request");
                    steps += 1;
                }
                DimmerMessage::Dim => {
                    req.response_sender
                        .send(Err(std::io::Error::new(
                            std::io::ErrorKind::Other,
                            "Already at minimum",
                        )))
                        .expect("Couldn't respond to request");
                }
                DimmerMessage::Vanish => return,
            }
        }
        termination_flag.store(true, Ordering::Release);
    });
    port
}

#[tokio::test]
async fn test_actor_port() {
    let termination_flag = Arc::new(AtomicBool::new(false));
    let port = spawn_two_step_dimmer(termination_flag.clone());
    assert_eq!(port.request(DimmerMessage::Dim).await.unwrap(), 0);
    assert_eq!(port.request(DimmerMessage::Dim).await.unwrap(), 1);
    match port.request(DimmerMessage::Dim).await {
        Err(ActorRequestError::Actor(e)) => assert_eq!(e.to_string(), "Already at minimum"),
        other => panic!("Actor error not translated correctly: {:?}", other),
    }
    assert!(!termination_flag.load(Ordering::Acquire));
    port.await_shutdown().await;
    assert!(termination_flag.load(Ordering::Acquire));
}

#[tokio::test]
async fn test_request_errors() {
    let termination_flag = Arc::new(AtomicBool::new(false));
    let port = spawn_two_step_dimmer(termination_flag.clone());
    let recv_error = port
        .request(DimmerMessage::Vanish)
        .await
        .expect_err("Actor should drop the response channel when vanishing");
    assert!(matches!(recv_error, ActorRequestError::Recv));
    let send_error = port
        .request(DimmerMessage::Dim)
        .await
        .expect_err("Request channel still open after actor termination");
    assert!(matches!(send_error, ActorRequestError::Send));

    // Hangs forever if the shutdown notifier isn't dropped with the receiver
    port.await_shutdown().await;
    assert!(!termination_flag.load(Ordering::Acquire));
}
