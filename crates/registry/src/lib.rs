//! pubmend registry - package registry client and version selection
//!
//! The only component that talks to the network. `RegistryClient` is a
//! thin I/O boundary over the pub.dev-style API; `CompatibleVersionFinder`
//! applies the installability filters on top of it.

pub mod client;
pub mod finder;

pub use client::{parse_package_payload, PackageRelease, RegistryClient, RegistryError};
pub use finder::{pick, CompatibleVersionFinder};
