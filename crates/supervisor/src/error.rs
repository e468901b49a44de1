// SPDX-License-Identifier: MIT

use thiserror::Error;
use xpod_core::BackendName;
use xpod_transport::TransportError;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("backend {0} is already registered")]
    DuplicateBackend(BackendName),

    #[error("backend {0} is not registered")]
    UnknownBackend(BackendName),

    #[error("backend {name} is already running")]
    AlreadyRunning { name: BackendName },

    #[error("failed to spawn backend {name}: {source}")]
    Spawn {
        name: BackendName,
        #[source]
        source: TransportError,
    },
}
