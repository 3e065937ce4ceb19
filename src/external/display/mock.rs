use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Brightness, DisplayBackend, Output};

/// Which backend operations a [MockDisplayBackend] should fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureMode {
    pub list_outputs: bool,
    pub get_brightness: bool,
    pub set_brightness: bool,
}

impl FailureMode {
    #[cfg(test)]
    pub fn all() -> FailureMode {
        FailureMode {
            list_outputs: true,
            get_brightness: true,
            set_brightness: true,
        }
    }
}

#[derive(Default)]
struct MockState {
    outputs: Vec<Output>,
    brightness: HashMap<Output, Brightness>,
    failures: FailureMode,
    set_calls: Vec<(Output, Brightness)>,
    subscribers: Vec<mpsc::UnboundedSender<(Output, Brightness)>>,
}

/// An in-memory [DisplayBackend], usable when testing the panel and as a
/// dry-run backend when no display server is around.
#[derive(Clone)]
pub struct MockDisplayBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockDisplayBackend {
    /// Create a backend with the given outputs, all at `initial_brightness`.
    #[cfg(test)]
    pub fn new(outputs: &[&str], initial_brightness: Brightness) -> MockDisplayBackend {
        let outputs: Vec<Output> = outputs.iter().map(|o| o.to_string()).collect();
        Self::with_outputs(outputs, initial_brightness)
    }

    pub fn with_outputs(outputs: Vec<Output>, initial_brightness: Brightness) -> MockDisplayBackend {
        let brightness = outputs
            .iter()
            .map(|o| (o.clone(), initial_brightness))
            .collect();
        MockDisplayBackend {
            state: Arc::new(Mutex::new(MockState {
                outputs,
                brightness,
                ..Default::default()
            })),
        }
    }

    /// Set which operations should return an error
    #[cfg(test)]
    pub fn set_failure_mode(&self, failures: FailureMode) {
        self.state.lock().unwrap().failures = failures;
    }

    /// Override the brightness reported for a single output
    #[cfg(test)]
    pub fn set_current_brightness(&self, output: &str, value: Brightness) {
        self.state
            .lock()
            .unwrap()
            .brightness
            .insert(output.to_owned(), value);
    }

    /// Every `set_brightness` call received so far, including failed ones
    #[cfg(test)]
    pub fn set_calls(&self) -> Vec<(Output, Brightness)> {
        self.state.lock().unwrap().set_calls.clone()
    }

    /// Get a channel on which every future `set_brightness` call is reported
    /// as soon as it arrives.
    #[cfg(test)]
    pub fn subscribe_set_calls(&self) -> mpsc::UnboundedReceiver<(Output, Brightness)> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().unwrap().subscribers.push(tx);
        rx
    }
}

#[async_trait]
impl DisplayBackend for MockDisplayBackend {
    async fn list_outputs(&self) -> Result<Vec<Output>> {
        let state = self.state.lock().unwrap();
        if state.failures.list_outputs {
            return Err(anyhow!("Mock DisplayBackend is failing to list outputs"));
        }
        Ok(state.outputs.clone())
    }

    async fn get_brightness(&self, output: &str) -> Result<Brightness> {
        let state = self.state.lock().unwrap();
        if state.failures.get_brightness {
            return Err(anyhow!("Mock DisplayBackend is failing to get brightness"));
        }
        state
            .brightness
            .get(output)
            .copied()
            .ok_or_else(|| anyhow!("Unknown output {}", output))
    }

    async fn set_brightness(&self, output: &str, value: Brightness) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        let call = (output.to_owned(), value);
        state.set_calls.push(call.clone());
        state
            .subscribers
            .retain(|subscriber| subscriber.send(call.clone()).is_ok());
        if state.failures.set_brightness {
            return Err(anyhow!("Mock DisplayBackend is failing to set brightness"));
        }
        if !state.outputs.iter().any(|o| o == output) {
            return Err(anyhow!("Unknown output {}", output));
        }
        state.brightness.insert(output.to_owned(), value);
        Ok(format!("Brightness set for {}: {}", output, value))
    }
}
