use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::domain::{SortMode, Source, UserId};
use crate::errors::{RelayError, RelayResult};
use crate::services::registry_service::{RegistryService, SourceReport};
use crate::storage::traits::{CursorRepository, SourceRepository};

const QUEUE_DEPTH: usize = 32;

type Reply<T> = oneshot::Sender<RelayResult<T>>;

pub enum RegistryRequest {
    Add {
        caller: UserId,
        name: String,
        sort_mode: SortMode,
        reply: Reply<Source>,
    },
    Remove {
        caller: UserId,
        name: String,
        reply: Reply<String>,
    },
    Reset {
        caller: UserId,
        name: String,
        reply: Reply<String>,
    },
    List {
        caller: UserId,
        reply: Reply<Vec<Source>>,
    },
    Status {
        caller: UserId,
        reply: Reply<Vec<SourceReport>>,
    },
}

/// Cheap handle the admin shell uses to reach the registry worker
#[derive(Clone)]
pub struct RegistryHandle {
    tx: mpsc::Sender<RegistryRequest>,
}

impl RegistryHandle {
    async fn call<T>(&self, build: impl FnOnce(Reply<T>) -> RegistryRequest) -> RelayResult<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| RelayError::RegistryClosed)?;
        rx.await.map_err(|_| RelayError::RegistryClosed)?
    }

    pub async fn add(&self, caller: UserId, name: &str, sort_mode: SortMode) -> RelayResult<Source> {
        let name = name.to_string();
        self.call(|reply| RegistryRequest::Add {
            caller,
            name,
            sort_mode,
            reply,
        })
        .await
    }

    pub async fn remove(&self, caller: UserId, name: &str) -> RelayResult<String> {
        let name = name.to_string();
        self.call(|reply| RegistryRequest::Remove { caller, name, reply })
            .await
    }

    pub async fn reset(&self, caller: UserId, name: &str) -> RelayResult<String> {
        let name = name.to_string();
        self.call(|reply| RegistryRequest::Reset { caller, name, reply })
            .await
    }

    pub async fn list(&self, caller: UserId) -> RelayResult<Vec<Source>> {
        self.call(|reply| RegistryRequest::List { caller, reply }).await
    }

    pub async fn status(&self, caller: UserId) -> RelayResult<Vec<SourceReport>> {
        self.call(|reply| RegistryRequest::Status { caller, reply }).await
    }
}

/// Start the worker that owns registry writes. It stops once every handle is dropped.
pub fn spawn<S, C>(service: RegistryService<S, C>) -> (RegistryHandle, JoinHandle<()>)
where
    S: SourceRepository + 'static,
    C: CursorRepository + 'static,
{
    let (tx, mut rx) = mpsc::channel(QUEUE_DEPTH);

    let task = tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            // A dropped receiver just means the caller gave up waiting
            match request {
                RegistryRequest::Add {
                    caller,
                    name,
                    sort_mode,
                    reply,
                } => {
                    let _ = reply.send(service.add(caller, &name, sort_mode).await);
                }
                RegistryRequest::Remove { caller, name, reply } => {
                    let _ = reply.send(service.remove(caller, &name));
                }
                RegistryRequest::Reset { caller, name, reply } => {
                    let _ = reply.send(service.reset(caller, &name));
                }
                RegistryRequest::List { caller, reply } => {
                    let _ = reply.send(service.list(caller));
                }
                RegistryRequest::Status { caller, reply } => {
                    let _ = reply.send(service.status(caller));
                }
            }
        }
        debug!("registry worker stopped");
    });

    (RegistryHandle { tx }, task)
}
