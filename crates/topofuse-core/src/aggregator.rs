// ── Aggregator facade ──
//
// Built once per process from an `AggregatorConfig`. Owns one source per
// configured vendor, the shared session backend, the classification
// engine, and the correlator. No globals: everything flows from `new`.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use topofuse_api::{
    CloudClient, Credential, FileSessionStore, FirewallAuth, FirewallClient, MemorySessionStore,
    SessionBackend, SessionManager, SessionState, SwitchAuth, SwitchClient, Vendor,
};
use tracing::{debug, info, warn};

use crate::classify::ClassificationEngine;
use crate::config::{AggregatorConfig, SessionStoreConfig};
use crate::discovery::{CloudDiscovery, Discovery, ScopeFilter};
use crate::error::{ApiResultExt, CoreError};
use crate::model::{CanonicalGraph, ClassificationResult, CorrelatedDevice};
use crate::monitor::Correlator;
use crate::sources::{FirewallSource, SwitchSource, host_label};

/// Which vendor graph to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyQuery {
    Firewall,
    Switch,
    Cloud(ScopeFilter),
}

impl TopologyQuery {
    pub fn vendor(&self) -> Vendor {
        match self {
            Self::Firewall => Vendor::FirewallController,
            Self::Switch => Vendor::DirectSwitch,
            Self::Cloud(_) => Vendor::CloudSwitch,
        }
    }
}

pub struct Aggregator {
    firewall: Option<FirewallSource>,
    switch: Option<SwitchSource>,
    cloud: Option<CloudDiscovery>,
    engine: Arc<ClassificationEngine>,
    correlator: Correlator,
    store: Arc<SessionBackend>,
}

impl Aggregator {
    /// Wire up every configured vendor. Nothing touches the network here.
    pub fn new(config: AggregatorConfig) -> Result<Self, CoreError> {
        let store = Arc::new(open_store(&config.session.store)?);
        let ttl = config.session.ttl;

        let firewall = config
            .firewall
            .map(|fw| -> Result<FirewallSource, CoreError> {
                let credential = expect_vendor(fw.endpoint.credential, Vendor::FirewallController)?;
                let host = host_label(&credential.host);
                let sessions = SessionManager::new(
                    FirewallAuth::new(),
                    Arc::clone(&store),
                    &fw.endpoint.transport,
                )
                .context(Vendor::FirewallController, &host, "build http client")?
                .with_ttl(ttl);

                let mut client = FirewallClient::new(Arc::new(sessions), credential);
                if let Some(vdom) = fw.vdom {
                    client = client.with_vdom(vdom);
                }
                Ok(FirewallSource::new(client))
            })
            .transpose()?;

        let switch = config
            .switch
            .map(|endpoint| -> Result<SwitchSource, CoreError> {
                let credential = expect_vendor(endpoint.credential, Vendor::DirectSwitch)?;
                let host = host_label(&credential.host);
                let sessions =
                    SessionManager::new(SwitchAuth, Arc::clone(&store), &endpoint.transport)
                        .context(Vendor::DirectSwitch, &host, "build http client")?
                        .with_ttl(ttl);
                Ok(SwitchSource::new(SwitchClient::new(
                    Arc::new(sessions),
                    credential,
                )))
            })
            .transpose()?;

        let cloud = config
            .cloud
            .map(|cloud| -> Result<CloudDiscovery, CoreError> {
                let credential = expect_vendor(cloud.endpoint.credential, Vendor::CloudSwitch)?;
                let host = host_label(&credential.host);
                let client =
                    CloudClient::from_credential(&credential, &cloud.endpoint.transport, cloud.gate)
                        .context(Vendor::CloudSwitch, &host, "build http client")?;
                Ok(CloudDiscovery::new(Arc::new(client), cloud.concurrency))
            })
            .transpose()?;

        let (engine, rejected) = ClassificationEngine::with_extra_oui(config.extra_oui);
        for entry in &rejected {
            warn!(prefix = %entry.prefix, "ignoring malformed OUI entry");
        }
        let engine = Arc::new(engine);
        let correlator = Correlator::new(Arc::clone(&engine), config.monitor.active_threshold);

        let aggregator = Self {
            firewall,
            switch,
            cloud,
            engine,
            correlator,
            store,
        };
        info!(vendors = ?aggregator.configured_vendors(), "aggregator ready");
        Ok(aggregator)
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn configured_vendors(&self) -> Vec<Vendor> {
        let mut vendors = Vec::with_capacity(3);
        if self.firewall.is_some() {
            vendors.push(Vendor::FirewallController);
        }
        if self.switch.is_some() {
            vendors.push(Vendor::DirectSwitch);
        }
        if self.cloud.is_some() {
            vendors.push(Vendor::CloudSwitch);
        }
        vendors
    }

    pub fn engine(&self) -> &Arc<ClassificationEngine> {
        &self.engine
    }

    pub fn correlator(&self) -> &Correlator {
        &self.correlator
    }

    pub fn session_store(&self) -> &Arc<SessionBackend> {
        &self.store
    }

    fn firewall(&self) -> Result<&FirewallSource, CoreError> {
        self.firewall.as_ref().ok_or(CoreError::NotConfigured {
            vendor: Vendor::FirewallController,
        })
    }

    fn switch(&self) -> Result<&SwitchSource, CoreError> {
        self.switch.as_ref().ok_or(CoreError::NotConfigured {
            vendor: Vendor::DirectSwitch,
        })
    }

    fn cloud(&self) -> Result<&CloudDiscovery, CoreError> {
        self.cloud.as_ref().ok_or(CoreError::NotConfigured {
            vendor: Vendor::CloudSwitch,
        })
    }

    // ── Operations ───────────────────────────────────────────────────

    pub async fn topology(
        &self,
        query: &TopologyQuery,
        cancel: &CancellationToken,
    ) -> Result<Discovery<CanonicalGraph>, CoreError> {
        debug!(vendor = %query.vendor(), "topology requested");
        match query {
            TopologyQuery::Firewall => self.firewall()?.topology(cancel).await,
            TopologyQuery::Switch => self.switch()?.topology(cancel).await,
            TopologyQuery::Cloud(scope) => self.cloud()?.canonical_topology(scope, cancel).await,
        }
    }

    /// Detected devices from the firewall, joined with port counters and
    /// classified. Both feeds are fetched concurrently.
    pub async fn monitored_devices(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<CorrelatedDevice>, CoreError> {
        let firewall = self.firewall()?;

        let (detected, port_stats) = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(CoreError::cancelled("monitor feed")),
            feeds = async { tokio::try_join!(firewall.detected_devices(), firewall.port_stats()) } => feeds?,
        };
        debug!(
            detected = detected.len(),
            port_records = port_stats.len(),
            "monitor feeds fetched"
        );

        self.correlator
            .correlate_cancellable(&detected, &port_stats, Utc::now(), cancel)
            .await
    }

    pub fn classify(
        &self,
        mac: &str,
        hostname: Option<&str>,
        manufacturer: Option<&str>,
    ) -> ClassificationResult {
        self.engine.classify(mac, hostname, manufacturer)
    }

    /// Session lifecycle state for a vendor. The cloud API is keyed per
    /// request and has no session, so it reports `None`.
    pub async fn session_state(&self, vendor: Vendor) -> Result<Option<SessionState>, CoreError> {
        match vendor {
            Vendor::FirewallController => Ok(Some(self.firewall()?.session_state().await)),
            Vendor::DirectSwitch => Ok(Some(self.switch()?.session_state().await)),
            Vendor::CloudSwitch => self.cloud().map(|_| None),
        }
    }

    /// End the vendor session and drop it from the store. A no-op for the
    /// sessionless cloud API.
    pub async fn logout(&self, vendor: Vendor) -> Result<(), CoreError> {
        match vendor {
            Vendor::FirewallController => self.firewall()?.logout().await,
            Vendor::DirectSwitch => self.switch()?.logout().await,
            Vendor::CloudSwitch => self.cloud().map(|_| ()),
        }
    }
}

fn open_store(config: &SessionStoreConfig) -> Result<SessionBackend, CoreError> {
    match config {
        SessionStoreConfig::Memory => Ok(SessionBackend::Memory(MemorySessionStore::new())),
        SessionStoreConfig::File(dir) => FileSessionStore::open(dir.clone())
            .map(SessionBackend::File)
            .map_err(|e| CoreError::Config {
                message: format!("cannot open session store {}: {e}", dir.display()),
            }),
    }
}

fn expect_vendor(credential: Credential, vendor: Vendor) -> Result<Credential, CoreError> {
    if credential.vendor == vendor {
        Ok(credential)
    } else {
        Err(CoreError::Config {
            message: format!(
                "{} credential configured in the {vendor} section",
                credential.vendor
            ),
        })
    }
}
