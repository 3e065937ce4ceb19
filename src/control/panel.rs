use super::apply_queue::{ApplyQueue, ApplyRequest};
use crate::{
    armaf::Server,
    external::display::{Brightness, BrightnessError, DisplayBackend, Output},
};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

/// Lifecycle of the panel.
///
/// While [Phase::Initializing], the output list and the current brightness
/// are being fetched and nothing is ever sent to the backend. Afterwards the
/// panel is [Phase::Ready] for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Ready,
}

/// Something the user did to the panel.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelIntent {
    /// Picked an output in the output selector
    SelectOutput(Output),
    /// Moved the brightness slider to a raw, not yet clamped position
    SetBrightness(f64),
    /// Moved the slider by the given amount from its current position
    Nudge(f64),
    /// Pressed the apply button
    Apply,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PanelError {
    #[error("the panel is still initializing")]
    Initializing,
    #[error("no output named {0}")]
    UnknownOutput(Output),
    #[error("brightness control is disabled, no output is selected")]
    ControlDisabled,
    #[error(transparent)]
    InvalidBrightness(#[from] BrightnessError),
}

/// Everything the panel shows.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelState {
    pub phase: Phase,
    pub outputs: Vec<Output>,
    pub selected: Option<Output>,
    pub brightness: Option<Brightness>,
}

impl PanelState {
    pub fn initializing() -> PanelState {
        PanelState {
            phase: Phase::Initializing,
            outputs: vec![],
            selected: None,
            brightness: None,
        }
    }

    /// Whether the brightness slider accepts input.
    pub fn control_enabled(&self) -> bool {
        self.phase == Phase::Ready && self.selected.is_some()
    }

    /// Leave the initialization phase with the results of output discovery.
    ///
    /// The first output becomes the selected one. This never asks for a
    /// brightness change, the values just came from the backend.
    pub fn finish_initialization(&mut self, outputs: Vec<Output>, brightness: Option<Brightness>) {
        self.selected = outputs.first().cloned();
        self.brightness = self.selected.as_ref().and(brightness);
        self.outputs = outputs;
        self.phase = Phase::Ready;
    }

    /// Apply `intent` to the state.
    ///
    /// Returns the brightness change the backend has to make as a result, if
    /// any. Intents that don't change anything produce no request, except for
    /// [PanelIntent::Apply] which always re-sends the current values when
    /// there are any.
    pub fn transition(&mut self, intent: PanelIntent) -> Result<Option<ApplyRequest>, PanelError> {
        if self.phase == Phase::Initializing {
            return Err(PanelError::Initializing);
        }
        match intent {
            PanelIntent::SelectOutput(output) => {
                if !self.outputs.contains(&output) {
                    return Err(PanelError::UnknownOutput(output));
                }
                if self.selected.as_ref() == Some(&output) {
                    return Ok(None);
                }
                self.selected = Some(output);
                Ok(self.current_request())
            }
            PanelIntent::SetBrightness(raw) => self.move_slider(raw),
            PanelIntent::Nudge(delta) => {
                let current = self.brightness.unwrap_or(Brightness::DEFAULT);
                self.move_slider(current.value() + delta)
            }
            PanelIntent::Apply => Ok(self.current_request()),
        }
    }

    fn move_slider(&mut self, raw: f64) -> Result<Option<ApplyRequest>, PanelError> {
        if !self.control_enabled() {
            return Err(PanelError::ControlDisabled);
        }
        let value = Brightness::from_control(raw)?;
        if self.brightness == Some(value) {
            return Ok(None);
        }
        self.brightness = Some(value);
        Ok(self.current_request())
    }

    fn current_request(&self) -> Option<ApplyRequest> {
        match (&self.selected, self.brightness) {
            (Some(output), Some(value)) => Some(ApplyRequest {
                output: output.clone(),
                value,
            }),
            _ => None,
        }
    }
}

/// Keeps the panel's state and turns user intents into brightness changes.
///
/// Output discovery happens during [Server::initialize], so
/// [crate::armaf::spawn_server] only hands out the controller's port once the
/// panel is ready. Every state change is published on the channel returned
/// from [PanelController::new].
pub struct PanelController<B: DisplayBackend> {
    backend: B,
    fallback_brightness: Brightness,
    state: PanelState,
    state_sender: watch::Sender<PanelState>,
    apply_queue: ApplyQueue<B>,
}

impl<B: DisplayBackend> PanelController<B> {
    /// `fallback_brightness` is assumed when the brightness of the default
    /// output can't be fetched.
    pub fn new(
        backend: B,
        fallback_brightness: Brightness,
    ) -> (PanelController<B>, watch::Receiver<PanelState>) {
        let state = PanelState::initializing();
        let (state_sender, state_receiver) = watch::channel(state.clone());
        (
            PanelController {
                apply_queue: ApplyQueue::new(backend.clone()),
                backend,
                fallback_brightness,
                state,
                state_sender,
            },
            state_receiver,
        )
    }

    async fn discover_outputs(&self) -> Vec<Output> {
        match self.backend.list_outputs().await {
            Ok(outputs) => {
                log::debug!("Found outputs {:?}", outputs);
                outputs
            }
            Err(e) => {
                log::error!("Listing outputs failed: {:#}", e);
                vec![]
            }
        }
    }

    async fn fetch_brightness(&self, output: &str) -> Brightness {
        match self.backend.get_brightness(output).await {
            // Snapped to the slider step like user input
            Ok(brightness) => {
                Brightness::from_control(brightness.value()).unwrap_or(self.fallback_brightness)
            }
            Err(e) => {
                log::warn!(
                    "Fetching brightness of {} failed, assuming {}: {:#}",
                    output,
                    self.fallback_brightness,
                    e
                );
                self.fallback_brightness
            }
        }
    }

    fn publish(&self) {
        // Nobody watching is fine, the state is also returned from requests
        self.state_sender.send_replace(self.state.clone());
    }
}

#[async_trait]
impl<B: DisplayBackend> Server<PanelIntent, PanelState> for PanelController<B> {
    fn get_name(&self) -> String {
        "PanelController".to_owned()
    }

    async fn initialize(&mut self) -> Result<()> {
        let outputs = self.discover_outputs().await;
        let brightness = match outputs.first() {
            Some(first) => Some(self.fetch_brightness(first).await),
            None => {
                log::warn!("No outputs available, brightness control is disabled");
                None
            }
        };
        self.state.finish_initialization(outputs, brightness);
        log::debug!("Panel ready: {:?}", self.state);
        self.publish();
        Ok(())
    }

    async fn handle_message(&mut self, intent: PanelIntent) -> Result<PanelState> {
        log::debug!("Handling {:?}", intent);
        let apply = intent == PanelIntent::Apply;
        let request = self.state.transition(intent.clone()).map_err(|e| {
            log::warn!("Rejected {:?}: {}", intent, e);
            e
        })?;
        match request {
            Some(request) => {
                log::debug!("Applying {} to {}", request.value, request.output);
                self.apply_queue.submit(request);
            }
            None if apply => {
                log::warn!("Nothing to apply, no output selected or brightness unknown")
            }
            None => {}
        }
        self.publish();
        Ok(self.state.clone())
    }
}
