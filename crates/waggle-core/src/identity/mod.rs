//! Node identity: the long-lived signing keypair and its at-rest protection

mod keypair;
mod vault;

pub use keypair::{KeypairStore, NodeKeypair, StoredKeypair};
pub use vault::SecretVault;
