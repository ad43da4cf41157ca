//! Stand-in collaborator implementations for the simulator binary. A real
//! embedding host would back these with its actual package manager,
//! permission checker, and settings provider.

use ifw_events::{Pid, Uid};
use intent_firewall::{HostCollaborator, IdentityToken, PackageQueries, ProviderError};
use parking_lot::Mutex;

#[derive(Default)]
pub struct MockPackages;

impl PackageQueries for MockPackages {
    fn packages_for_uid(&self, uid: Uid) -> Result<Vec<String>, ProviderError> {
        Ok(vec![format!("com.example.uid{}", uid.0)])
    }

    fn signature_matches_platform(&self, _uid: Uid) -> Result<bool, ProviderError> {
        Ok(false)
    }
}

#[derive(Default)]
pub struct MockHost {
    lock: Mutex<()>,
}

impl HostCollaborator for MockHost {
    fn check_permission(&self, _permission: &str, _pid: Pid, _uid: Uid, _owning_uid: Uid, _exported: bool) -> Result<bool, ProviderError> {
        Ok(false)
    }

    fn device_provisioned(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }

    fn dispatch_lock(&self) -> &Mutex<()> {
        &self.lock
    }

    fn drop_identity(&self) -> IdentityToken {
        IdentityToken(0)
    }

    fn restore_identity(&self, _token: IdentityToken) {}
}
