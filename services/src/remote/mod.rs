//! Remote copy of the reservation document.
//!
//! The document lives in one remote object, addressed either by a fixed id or
//! by name inside a folder (see [`RemoteTarget`]). [`RemoteFileGateway`] is the
//! seam: [`DriveGateway`] talks to Google Drive with credentials from a
//! [`CredentialProvider`], and [`MockRemoteGateway`] keeps objects in memory
//! for tests.

mod credential;
mod drive;
mod mock;
mod traits;
mod types;

pub use credential::{Credential, DEFAULT_TOKEN_URI, OAuthCredentialProvider};
pub use drive::{DEFAULT_DRIVE_ROOT, DriveGateway};
pub use mock::MockRemoteGateway;
pub use traits::{CredentialProvider, RemoteFileGateway};
pub use types::{CredentialError, RemoteError, RemoteFile, RemoteSync, RemoteTarget};
