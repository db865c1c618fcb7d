//! Push-to-talk microphone gating.
//!
//! The microphone publishes only while an activation input is held and the
//! session is connected. The talking flag and the publish state change
//! together: the flag goes up only after the microphone is enabled, and any
//! release input or loss of connectivity forces it back down.

use crate::error::DeviceError;
use crate::machine::SessionSnapshot;
use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Local microphone publishing, owned exclusively by [`PushToTalk`].
#[async_trait]
pub trait Microphone: Send {
    /// Starts publishing from `device_id`, or the default input when `None`.
    async fn enable(&mut self, device_id: Option<&str>) -> Result<(), DeviceError>;

    /// Stops publishing.
    async fn disable(&mut self) -> Result<(), DeviceError>;
}

/// Input events that drive push-to-talk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TalkInput {
    PressStart,
    PressEnd,
    PointerCancel,
    WindowBlur,
}

pub struct PushToTalk<M> {
    microphone: M,
    connectivity: watch::Receiver<SessionSnapshot>,
    device_id: Option<String>,
    talking: bool,
    talking_tx: watch::Sender<bool>,
}

impl<M: Microphone> PushToTalk<M> {
    pub fn new(microphone: M, connectivity: watch::Receiver<SessionSnapshot>) -> Self {
        let (talking_tx, _) = watch::channel(false);
        Self {
            microphone,
            connectivity,
            device_id: None,
            talking: false,
            talking_tx,
        }
    }

    pub fn is_talking(&self) -> bool {
        self.talking
    }

    /// Receives the talking flag whenever it changes.
    pub fn subscribe_talking(&self) -> watch::Receiver<bool> {
        self.talking_tx.subscribe()
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    /// Selects the input device for subsequent presses. An in-progress
    /// publish keeps its current device.
    pub fn select_device(&mut self, device_id: impl Into<String>) {
        let device_id = device_id.into();
        debug!(device = %device_id, talking = self.talking, "selected input device");
        self.device_id = Some(device_id);
    }

    pub fn microphone(&self) -> &M {
        &self.microphone
    }

    fn is_connected(&self) -> bool {
        self.connectivity.borrow().is_connected()
    }

    fn set_talking(&mut self, talking: bool) {
        self.talking = talking;
        self.talking_tx.send_replace(talking);
    }

    /// Handles one input. Returns whether the microphone is live afterwards.
    pub async fn handle(&mut self, input: TalkInput) -> Result<bool, DeviceError> {
        match input {
            TalkInput::PressStart => self.press_start().await,
            TalkInput::PressEnd | TalkInput::PointerCancel | TalkInput::WindowBlur => {
                self.release().await.map(|()| false)
            }
        }
    }

    /// Enables the microphone if the session is connected.
    ///
    /// The enable is abandoned with [`DeviceError::Cancelled`] if the session
    /// stops being connected first.
    pub async fn press_start(&mut self) -> Result<bool, DeviceError> {
        if self.talking {
            return Ok(true);
        }
        if !self.is_connected() {
            debug!("ignoring press while session is not connected");
            return Ok(false);
        }

        let mut connectivity = self.connectivity.clone();
        let device_id = self.device_id.clone();
        let outcome = tokio::select! {
            result = self.microphone.enable(device_id.as_deref()) => Some(result),
            _ = connectivity.wait_for(|s| !s.is_connected()) => None,
        };

        match outcome {
            Some(Ok(())) => {
                self.set_talking(true);
                info!(device = device_id.as_deref().unwrap_or("default"), "microphone live");
                Ok(true)
            }
            Some(Err(e)) => {
                warn!("failed to enable microphone: {}", e);
                Err(e)
            }
            None => {
                // The abandoned enable may have half-opened the device.
                if let Err(e) = self.microphone.disable().await {
                    debug!("disable after cancelled enable failed: {}", e);
                }
                info!("microphone enable cancelled by session change");
                Err(DeviceError::Cancelled)
            }
        }
    }

    /// Disables the microphone if it is live.
    ///
    /// The talking flag drops even when disabling fails, and the failure is
    /// reported.
    pub async fn release(&mut self) -> Result<(), DeviceError> {
        if !self.talking {
            return Ok(());
        }
        self.set_talking(false);
        let result = self.microphone.disable().await;
        match &result {
            Ok(()) => info!("microphone released"),
            Err(e) => warn!("failed to disable microphone: {}", e),
        }
        result
    }

    /// Forces a release if the session is no longer connected.
    pub async fn sync_connectivity(&mut self) -> Result<(), DeviceError> {
        if self.talking && !self.is_connected() {
            info!("session left connected state, releasing microphone");
            return self.release().await;
        }
        Ok(())
    }

    /// Processes inputs until the input channel closes, releasing the
    /// microphone whenever the session leaves the connected state.
    pub async fn run(mut self, mut inputs: mpsc::Receiver<TalkInput>) -> Self {
        let mut connectivity = self.connectivity.clone();
        loop {
            tokio::select! {
                input = inputs.recv() => {
                    let Some(input) = input else { break };
                    if let Err(e) = self.handle(input).await {
                        debug!(?input, "push-to-talk input failed: {}", e);
                    }
                }
                changed = connectivity.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if let Err(e) = self.sync_connectivity().await {
                        debug!("release on disconnect failed: {}", e);
                    }
                }
            }
        }
        if let Err(e) = self.release().await {
            debug!("final release failed: {}", e);
        }
        self
    }
}
