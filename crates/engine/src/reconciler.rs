use crate::error::EngineError;
use chrono::Utc;
use core_types::{ConnectionStatus, CredentialSet, LiveConnection, mask_secret};
use registry_client::{RegisterConnection, RegistryClient, RemoteConnection};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use vault::CredentialVault;

/// The "credential replayer" for the session startup.
///
/// This component runs when a session starts. Its sole responsibility is to
/// replay the credentials held in the local vault against the remote
/// registry, then fetch the registry's authoritative connection list and
/// shape it into the session's live view.
pub struct ConnectionReconciler {
    /// A shared reference to the vault the replayable records come from.
    vault: Arc<CredentialVault>,
    /// A shared reference to the registry client used for registration.
    registry: Arc<dyn RegistryClient>,
    /// Gate holding registration to at most one in-flight call. A single
    /// permit: the registry handles registrations strictly one at a time.
    registration_gate: Semaphore,
}

/// Tally of one restoration pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RestoreReport {
    /// Number of stored records the pass looked at.
    pub fn total(&self) -> usize {
        self.restored + self.skipped + self.failed
    }
}

impl fmt::Display for RestoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} restored, {} skipped, {} failed",
            self.restored, self.skipped, self.failed
        )
    }
}

impl ConnectionReconciler {
    /// Creates a new `ConnectionReconciler`.
    ///
    /// It takes shared `Arc` pointers to the components it needs, allowing it
    /// to safely coexist with the session's periodic tasks.
    pub fn new(vault: Arc<CredentialVault>, registry: Arc<dyn RegistryClient>) -> Self {
        Self {
            vault,
            registry,
            registration_gate: Semaphore::new(1),
        }
    }

    /// Replays every stored credential against the registry, in the order
    /// they were saved.
    ///
    /// Records whose api key or secret is redacted or empty are skipped. A
    /// failed registration is logged and counted; it never aborts the
    /// remainder. Only exchange connections replay; the AI credential never
    /// leaves the vault.
    pub async fn restore_connections(&self) -> RestoreReport {
        let mut report = RestoreReport::default();

        let Some(set) = self.vault.load() else {
            info!("no stored credentials to restore");
            return report;
        };

        info!(
            connections = set.connections.len(),
            "restoring stored connections"
        );

        for (index, credential) in set.connections.iter().enumerate() {
            let Some(request) = RegisterConnection::from_credential(credential) else {
                debug!(id = %credential.id, name = %credential.name,
                    "skipping connection without replayable secrets");
                report.skipped += 1;
                continue;
            };

            let Ok(_permit) = self.registration_gate.acquire().await else {
                // The gate only closes during teardown; nothing further can
                // be registered in this pass.
                warn!("registration gate closed, abandoning restoration");
                report.failed += set.connections.len() - index;
                break;
            };

            match self.registry.add_connection(&request).await {
                Ok(response) => {
                    info!(id = %response.connection_id, name = %credential.name,
                        "connection restored");
                    report.restored += 1;
                }
                Err(e) => {
                    warn!(id = %credential.id, name = %credential.name,
                        "connection restore failed: {e}");
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Fetches the registry's authoritative connection list and shapes it
    /// into the session's live view.
    ///
    /// Stored credentials contribute only their masked key preview. A
    /// connection the registry knows but the vault does not gets the bare
    /// mask token; a connection whose live retrieval failed keeps its slot
    /// with `status = Error` and no balance.
    pub async fn fetch_live_connections(&self) -> Result<Vec<LiveConnection>, EngineError> {
        let remotes = self.registry.get_connections().await?;
        let stored = self.vault.load();

        let connections = remotes
            .into_iter()
            .map(|remote| Self::shape_connection(remote, stored.as_ref()))
            .collect();

        Ok(connections)
    }

    fn shape_connection(
        remote: RemoteConnection,
        stored: Option<&CredentialSet>,
    ) -> LiveConnection {
        let api_key_masked = stored
            .and_then(|set| {
                set.connections
                    .iter()
                    .find(|c| c.id == remote.connection_id)
            })
            .map(|c| c.api_key.display_masked())
            .unwrap_or_else(|| mask_secret(""));

        match remote.data {
            Some(data) => LiveConnection {
                id: remote.connection_id,
                name: remote.name,
                status: remote.status,
                balance: data.balance,
                positions: data.positions,
                order_history: data.order_history,
                api_key_masked,
                last_updated: Utc::now(),
            },
            None => {
                if let Some(reason) = &remote.error {
                    warn!(id = %remote.connection_id, "connection has no live data: {reason}");
                }
                LiveConnection {
                    id: remote.connection_id,
                    name: remote.name,
                    status: ConnectionStatus::Error,
                    balance: None,
                    positions: Vec::new(),
                    order_history: Vec::new(),
                    api_key_masked,
                    last_updated: Utc::now(),
                }
            }
        }
    }
}
