//! Capability interfaces for confined snaps.
//!
//! A snap declares **plugs** (capabilities it needs) and **slots**
//! (capabilities it offers). Each interface type decides how a plug and a
//! slot of that type are validated and which rule snippets each security
//! system receives when they are connected.
//!
//! # Overview
//!
//! - [`Interface`] is the contract every interface type implements. Snippet
//!   methods take a [`SecuritySystem`] and return `Ok(None)` when the
//!   interface does not affect it.
//! - [`builtin`] holds the closed set of interface types, dispatched through
//!   [`BuiltinInterface`].
//! - [`Repository`] records snaps and connections and implements
//!   [`SnippetSource`], which security backends consume.
//! - [`HostFs`] is the only way interfaces look at the host, so rendering
//!   that depends on live state stays testable.
//!
//! # Example
//!
//! ```
//! use interfaces::{Attrs, BuiltinConfig, MemFs, PlugRef, Repository, SecuritySystem,
//!     SlotRef, SnapInfo, SnapType, SnippetSource};
//! use std::sync::Arc;
//!
//! let mut repo = Repository::with_builtins(&BuiltinConfig::default(), Arc::new(MemFs::new()))?;
//! repo.add_snap(SnapInfo::new("core", SnapType::Os).with_slot("zigbee", "zigbee-dongle", Attrs::new()))?;
//! repo.add_snap(
//!     SnapInfo::new("hub", SnapType::App)
//!         .with_app("daemon", &[])
//!         .with_plug("radio", "zigbee-dongle", Attrs::new()),
//! )?;
//! repo.connect(PlugRef::new("hub", "radio"), SlotRef::new("core", "zigbee"))?;
//!
//! let snippets = repo.security_snippets_for_snap("hub", SecuritySystem::UDev)?;
//! assert!(snippets.contains_key("snap.hub.daemon"));
//! # Ok::<(), interfaces::Error>(())
//! ```

mod attrs;
mod backend;
pub mod builtin;
mod error;
mod hostfs;
pub mod implicit;
mod interface;
mod repo;
mod security;
mod snap;
pub mod template;

pub use attrs::{AttrValue, Attrs};
pub use backend::SecurityBackend;
pub use builtin::{BuiltinConfig, BuiltinInterface};
pub use error::{Error, Result};
pub use hostfs::{DirEntry, HostFs, MemFs, RealFs};
pub use interface::{Interface, Snippet, SnippetRequest, render_snippet};
pub use repo::{ConnRef, PlugRef, Repository, SecuritySnippets, SlotRef, SnippetSource};
pub use security::SecuritySystem;
pub use snap::{
    AppInfo, HookInfo, Plug, PlugInfo, Slot, SlotInfo, SnapInfo, SnapType, app_security_tag,
    hook_security_tag, snap_security_tag, validate_snap_name,
};
