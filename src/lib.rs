//! demo-native-host: browser Native Messaging host for FACEIT demo installation
//!
//! A companion process for the FACEIT demo browser extension. The extension
//! downloads compressed match demos; this host decompresses them into the
//! local Counter-Strike 2 installation and puts the `playdemo` console
//! command on the clipboard.
//!
//! # Architecture
//!
//! - **Framing**: length-prefixed JSON over stdin and stdout
//! - **Dispatch**: five actions (`ping`, `getCS2Path`, `setCS2Path`,
//!   `processDemo`, `deleteDemo`), each answered with one response
//! - **Path resolution**: a user override from the config store, else the
//!   first CS2 folder found in the Steam libraries
//!
//! # Modules
//!
//! - [`config`]: Persistent settings and the config store
//! - [`demo`]: Zstd decompression and safe installation of demo files
//! - [`error`]: Error types
//! - [`native`]: Framing, protocol, dispatch and the host loop
//! - [`platform`]: Clipboard and file-system capabilities
//! - [`steam`]: Steam library discovery and installation path resolution

pub mod config;
pub mod demo;
pub mod error;
pub mod native;
pub mod platform;
pub mod steam;
