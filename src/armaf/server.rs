//! Request-handling actors built on [super::ports].

use super::ActorPort;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::oneshot;

/// An actor that answers the requests sent to its [ActorPort].
///
/// A server goes through three phases:
///
/// 1. `initialize` runs first. [spawn_server] does not hand out the port
///    until it has finished, so no request can observe a half-initialized
///    server. An error here makes [spawn_server] fail.
/// 2. `handle_message` is then called for every request, strictly one at a
///    time and in arrival order. A returned error goes back to the requester
///    and the server keeps running.
/// 3. Once all ports are dropped, `tear_down` runs. Its errors are only
///    logged since nobody is left to receive them.
#[async_trait]
pub trait Server<P, R>: Send + 'static {
    /// Name used in log messages
    fn get_name(&self) -> String;

    async fn handle_message(&mut self, payload: P) -> Result<R>;

    async fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    async fn tear_down(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Run `server` in its own task and return a port for talking to it, after
/// its initialization succeeded.
pub async fn spawn_server<P, R>(
    mut server: impl Server<P, R>,
) -> Result<ActorPort<P, R, anyhow::Error>>
where
    P: Send + 'static,
    R: Send + 'static,
{
    let name = server.get_name();
    log::debug!("{} spawning", name);
    let (port, mut rx) = ActorPort::make();
    let (initialization_sender, initialization_receiver) = oneshot::channel::<Result<()>>();
    tokio::spawn(async move {
        let name = server.get_name();
        let init_result = server.initialize().await;
        let had_init_error = init_result.is_err();
        if initialization_sender.send(init_result).is_err() {
            log::warn!("{} finished initializing but its spawner went away", name);
            return;
        }
        if had_init_error {
            return;
        }
        log::info!("{} initialized successfully", name);
        while let Some(req) = rx.recv().await {
            let res = server.handle_message(req.payload).await;
            if let Err(e) = &res {
                log::debug!("{} message handler returned error: {}", name, e);
            }
            if req.response_sender.send(res).is_err() {
                log::error!(
                    "{} failed to respond to request (requester went away?)",
                    name
                );
            }
        }
        log::debug!("{} stopping", name);
        if let Err(e) = server.tear_down().await {
            log::error!("{} failed to tear down: {}", name, e);
        }
        log::debug!("{} stopped", name);
    });

    match initialization_receiver.await {
        Ok(Ok(())) => Ok(port),
        Ok(Err(e)) => {
            log::error!("Error initializing {}: {}", name, e);
            Err(e)
        }
        Err(e) => Err(anyhow!(e)),
    }
}
