//! Backend registration
//!
//! A backend bundles the collaborators a [`Session`] needs: how to open a
//! port, which ports to scan, and which flash drivers exist. Backends are
//! feature-gated.

use crate::cli::Backend;
use rbossa_core::{FlashRegistry, Session};

/// Information about a backend
pub struct BackendInfo {
    /// Name used on the command line
    pub name: &'static str,
    /// Short description
    pub description: &'static str,
}

/// Get information about all backends enabled at compile time
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_backends() -> Vec<BackendInfo> {
    let mut backends = Vec::new();

    #[cfg(feature = "samba")]
    backends.push(BackendInfo {
        name: "samba",
        description: "SAM-BA boot monitor over USB CDC serial",
    });

    #[cfg(feature = "dummy")]
    backends.push(BackendInfo {
        name: "dummy",
        description: "In-memory target emulator for testing",
    });

    backends
}

/// Build a disconnected session for `backend`
#[allow(unused_variables)]
pub fn open_session(
    backend: Backend,
    baud: Option<u32>,
) -> Result<Session, Box<dyn std::error::Error>> {
    match backend {
        #[cfg(feature = "samba")]
        Backend::Samba => {
            use rbossa_samba::{SambaConnector, SerialPorts};
            // Real chips need real flash algorithms; none are registered yet
            Ok(Session::new(
                Box::new(SambaConnector::new(baud)),
                Box::new(SerialPorts),
                Box::new(FlashRegistry::new()),
            ))
        }

        #[cfg(feature = "dummy")]
        Backend::Dummy => {
            use rbossa_dummy::DummyConnector;
            let connector = DummyConnector::default();
            let mut registry = FlashRegistry::new();
            registry.register(rbossa_dummy::flash_driver());
            Ok(Session::new(
                Box::new(connector.clone()),
                Box::new(connector),
                Box::new(registry),
            ))
        }

        #[allow(unreachable_patterns)]
        other => {
            let names: Vec<&str> = available_backends().iter().map(|b| b.name).collect();
            Err(format!(
                "Backend {:?} is not enabled in this build [available: {}]",
                other,
                names.join(", ")
            )
            .into())
        }
    }
}
