//! Shadow documents: generated JavaScript mirroring a request file's code
//! blocks, kept in sync so a general-purpose engine can analyse them.
//!
//! - [`builder`] renders the document from a block tree.
//! - [`queue`] serialises every mutation of shadow files.
//! - [`session`] ties paths, queue and host together for one collection root.
//! - [`host`] is the file and notification surface supplied by the embedder,
//!   with [`fs_host`] and [`memory`] implementations.

pub mod builder;
pub mod fs_host;
pub mod host;
pub mod memory;
pub mod queue;
pub mod request;
pub mod session;
mod sync;

pub use builder::{build_shadow_document, function_header, function_name};
pub use fs_host::FileSystemHost;
pub use host::{HostEvent, ShadowHost};
pub use memory::MemoryHost;
pub use queue::{QueueNotice, QueueTimings, ShadowQueue};
pub use request::{ShadowOperation, UpdateRequest};
pub use session::ShadowSession;
