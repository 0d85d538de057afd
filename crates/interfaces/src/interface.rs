//! The capability-interface contract.

use crate::{Error, Plug, Result, SecuritySystem, Slot};

/// A rendered, security-system specific rule fragment.
pub type Snippet = Vec<u8>;

/// Behaviour of one interface type.
///
/// Implementations hold no mutable state. Every snippet method matches on
/// the full [`SecuritySystem`] set and returns `Ok(None)` for systems the
/// interface does not affect.
pub trait Interface: Send + Sync {
    /// Name matched against `Plug::interface()` and `Slot::interface()`.
    fn name(&self) -> &'static str;

    /// Validate a plug. Panics if the plug is of another interface.
    fn sanitize_plug(&self, plug: &Plug<'_>) -> Result<()>;

    /// Validate a slot. Panics if the slot is of another interface.
    fn sanitize_slot(&self, slot: &Slot<'_>) -> Result<()>;

    fn permanent_plug_snippet(&self, plug: &Plug<'_>, system: SecuritySystem) -> Result<Option<Snippet>>;

    fn connected_plug_snippet(
        &self,
        plug: &Plug<'_>,
        slot: &Slot<'_>,
        system: SecuritySystem,
    ) -> Result<Option<Snippet>>;

    fn permanent_slot_snippet(&self, slot: &Slot<'_>, system: SecuritySystem) -> Result<Option<Snippet>>;

    fn connected_slot_snippet(
        &self,
        plug: &Plug<'_>,
        slot: &Slot<'_>,
        system: SecuritySystem,
    ) -> Result<Option<Snippet>>;

    /// Whether connections of this type are made without user action.
    fn auto_connect(&self) -> bool;
}

/// Which side of which relationship a snippet is requested for.
#[derive(Debug, Clone, Copy)]
pub enum SnippetRequest<'a> {
    PermanentPlug(Plug<'a>),
    ConnectedPlug(Plug<'a>, Slot<'a>),
    PermanentSlot(Slot<'a>),
    ConnectedSlot(Plug<'a>, Slot<'a>),
}

/// Render a snippet for a security system given by name.
///
/// Names outside the known set fail with [`Error::UnknownSecurity`] before
/// the interface is consulted.
pub fn render_snippet(
    iface: &dyn Interface,
    system: &str,
    request: SnippetRequest<'_>,
) -> Result<Option<Snippet>> {
    let system: SecuritySystem = system.parse()?;
    match request {
        SnippetRequest::PermanentPlug(plug) => iface.permanent_plug_snippet(&plug, system),
        SnippetRequest::ConnectedPlug(plug, slot) => iface.connected_plug_snippet(&plug, &slot, system),
        SnippetRequest::PermanentSlot(slot) => iface.permanent_slot_snippet(&slot, system),
        SnippetRequest::ConnectedSlot(plug, slot) => iface.connected_slot_snippet(&plug, &slot, system),
    }
}

/// Abort on a plug dispatched to the wrong interface.
pub(crate) fn assert_plug_interface(iface: &str, plug: &Plug<'_>) {
    if plug.interface() != iface {
        panic!("plug is not of interface {iface:?}");
    }
}

/// Abort on a slot dispatched to the wrong interface.
pub(crate) fn assert_slot_interface(iface: &str, slot: &Slot<'_>) {
    if slot.interface() != iface {
        panic!("slot is not of interface {iface:?}");
    }
}

/// Reject slots offered by anything but an OS snap.
pub(crate) fn reserved_for_os(iface: &str, slot: &Slot<'_>) -> Result<()> {
    if slot.snap.snap_type != crate::SnapType::Os {
        return Err(Error::Validation(format!(
            "{iface} slots are reserved for the operating system snap"
        )));
    }
    Ok(())
}
