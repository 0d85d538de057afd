//! Interface error types.

use std::path::PathBuf;
use thiserror::Error;

/// Interface errors.
///
/// Validation and operational failures only. Dispatching a plug or slot to
/// an interface of a different type is a bug in the caller and panics
/// instead of producing one of these.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A security system name outside the known set was requested.
    #[error("unknown security system {0:?}")]
    UnknownSecurity(String),

    /// Plug or slot attributes failed validation.
    #[error("{0}")]
    Validation(String),

    /// An attribute is present but has the wrong type or shape.
    #[error("attribute {name:?} must be {expected}")]
    InvalidAttribute { name: String, expected: &'static str },

    /// The connection is refused by the interface.
    #[error("connection not allowed: {0}")]
    NotAllowed(String),

    /// Host state needed to render a snippet could not be inspected.
    #[error("cannot inspect {}: {source}", path.display())]
    HostState {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A template referenced a token that was not supplied.
    #[error("template token ###{0}### has no value")]
    Template(String),

    /// No interface is registered under this name.
    #[error("unknown interface {0:?}")]
    UnknownInterface(String),

    /// An interface with this name is already registered.
    #[error("cannot add interface: {0:?}, interface name is in use")]
    InterfaceInUse(String),

    /// No snap is known under this name.
    #[error("unknown snap {0:?}")]
    UnknownSnap(String),

    /// A snap with this name is already present.
    #[error("cannot add snap {0:?}: snap name is in use")]
    SnapInUse(String),

    /// The snap still has connections and cannot be removed.
    #[error("cannot remove connected snap {0:?}")]
    SnapConnected(String),

    /// The snap has no plug with this name.
    #[error("snap {snap:?} has no plug named {plug:?}")]
    UnknownPlug { snap: String, plug: String },

    /// The snap has no slot with this name.
    #[error("snap {snap:?} has no slot named {slot:?}")]
    UnknownSlot { snap: String, slot: String },

    /// A plug and slot of different interfaces were connected.
    #[error("cannot connect plug {plug:?} (interface {plug_interface:?}) to slot {slot:?} (interface {slot_interface:?})")]
    InterfaceMismatch {
        plug: String,
        plug_interface: String,
        slot: String,
        slot_interface: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
