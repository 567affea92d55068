//! Shared runtime state, cloned into every turn task.

use std::sync::Arc;

use ot_client::{DatasetUploader, HttpTransport, HttpUploader, StreamTransport};
use ot_domain::config::Config;
use ot_domain::error::Result;
use ot_sessions::{SessionAssetManager, SessionStore};

use crate::runtime::cancel::CancelMap;
use crate::runtime::gate::TurnGate;

#[derive(Clone)]
pub struct AgentState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionStore>,
    pub assets: Arc<SessionAssetManager>,
    pub transport: Arc<dyn StreamTransport>,
    pub gate: Arc<TurnGate>,
    pub cancel_map: Arc<CancelMap>,
}

impl AgentState {
    pub fn new(
        config: Arc<Config>,
        transport: Arc<dyn StreamTransport>,
        uploader: Arc<dyn DatasetUploader>,
    ) -> Self {
        Self {
            config,
            sessions: Arc::new(SessionStore::new()),
            assets: Arc::new(SessionAssetManager::new(uploader)),
            transport,
            gate: Arc::new(TurnGate::new()),
            cancel_map: Arc::new(CancelMap::new()),
        }
    }

    /// State wired to the agent service over HTTP.
    pub fn http(config: Arc<Config>) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config.agent)?);
        let uploader = Arc::new(HttpUploader::new(&config.agent)?);
        tracing::debug!(base_url = %config.agent.base_url, "agent client ready");
        Ok(Self::new(config, transport, uploader))
    }
}
