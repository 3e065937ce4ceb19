use super::server::{spawn_server, Server};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Accepts slider positions in percent, refuses anything above 100.
///
/// Initialization waits until `ready` fires, like a panel waiting for its
/// backend to list outputs. Dropping the sender instead fails initialization.
struct SliderServer {
    ready: Option<oneshot::Receiver<()>>,
    accepted: Vec<u32>,
    teardown_notifier: mpsc::Sender<Vec<u32>>,
}

impl SliderServer {
    fn new() -> (SliderServer, oneshot::Sender<()>, mpsc::Receiver<Vec<u32>>) {
        let (ready_sender, ready) = oneshot::channel();
        let (teardown_notifier, teardown_receiver) = mpsc::channel(1);
        (
            SliderServer {
                ready: Some(ready),
                accepted: vec![],
                teardown_notifier,
            },
            ready_sender,
            teardown_receiver,
        )
    }
}

#[async_trait]
impl Server<u32, usize> for SliderServer {
    fn get_name(&self) -> String {
        "SliderServer".to_owned()
    }

    async fn initialize(&mut self) -> Result<()> {
        match self.ready.take() {
            Some(ready) => ready
                .await
                .map_err(|_| anyhow!("Backend went away before listing outputs")),
            None => Ok(()),
        }
    }

    async fn handle_message(&mut self, percent: u32) -> Result<usize> {
        if percent > 100 {
            bail!("{}% is out of range", percent);
        }
        self.accepted.push(percent);
        Ok(self.accepted.len())
    }

    async fn tear_down(&mut self) -> Result<()> {
        Ok(self.teardown_notifier.send(self.accepted.clone()).await?)
    }
}

#[tokio::test(start_paused = true)]
async fn test_port_withheld_until_initialized() {
    let (server, ready, _) = SliderServer::new();
    let spawning = spawn_server(server);
    tokio::pin!(spawning);
    assert!(
        tokio::time::timeout(Duration::from_secs(10), &mut spawning)
            .await
            .is_err(),
        "Port handed out before initialization finished"
    );
    ready.send(()).unwrap();
    let port = spawning.await.expect("Initialization failed");
    assert_eq!(port.request(40).await.unwrap(), 1);
}

#[tokio::test]
async fn test_initialization_failure() {
    let (server, ready, _) = SliderServer::new();
    drop(ready);
    assert!(spawn_server(server).await.is_err());
}

#[tokio::test]
async fn test_rejections_keep_server_running() {
    let (server, ready, mut teardown) = SliderServer::new();
    ready.send(()).unwrap();
    let port = spawn_server(server).await.expect("No port returned");
    assert_eq!(port.request(30).await.unwrap(), 1);
    let error = port
        .request(250)
        .await
        .expect_err("Out of range position accepted");
    assert!(error.to_string().contains("250% is out of range"));
    assert_eq!(port.request(45).await.unwrap(), 2);
    drop(port);
    assert_eq!(
        teardown.recv().await.expect("tear_down not called on server"),
        vec![30, 45]
    );
}

#[tokio::test]
async fn test_requests_from_clones_are_serialized() {
    let (server, ready, mut teardown) = SliderServer::new();
    ready.send(()).unwrap();
    let port = spawn_server(server).await.expect("No port returned");
    let other = port.clone();
    let (a, b) = tokio::join!(port.request(10), other.request(20));
    let mut counts = vec![a.unwrap(), b.unwrap()];
    counts.sort_unstable();
    assert_eq!(counts, vec![1, 2]);
    drop(other);
    port.await_shutdown().await;
    let mut accepted = teardown.try_recv().expect("tear_down didn't finish");
    accepted.sort_unstable();
    assert_eq!(accepted, vec![10, 20]);
}
