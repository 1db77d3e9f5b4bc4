//! Engine wiring.
//!
//! One constructor, injected collaborators, no global state: the
//! embedding service builds a [`TwoFactorEngine`] at startup and hands
//! out references to its components.

use std::sync::Arc;

use crate::channel::{Channel, ChannelVerifier};
use crate::config::EngineConfig;
use crate::identity::IdentityLookup;
use crate::status::StatusAggregator;
use crate::store::EphemeralStore;
use crate::totp::TotpManager;

/// All verification flows behind one handle.
pub struct TwoFactorEngine {
    email: ChannelVerifier,
    sms: ChannelVerifier,
    totp: TotpManager,
    status: StatusAggregator,
}

impl TwoFactorEngine {
    #[must_use]
    pub fn new(
        store: Arc<dyn EphemeralStore>,
        identity: Arc<dyn IdentityLookup>,
        config: EngineConfig,
    ) -> Self {
        Self {
            email: ChannelVerifier::new(
                Channel::Email,
                Arc::clone(&store),
                Arc::clone(&identity),
                config.clone(),
            ),
            sms: ChannelVerifier::new(
                Channel::Sms,
                Arc::clone(&store),
                Arc::clone(&identity),
                config.clone(),
            ),
            totp: TotpManager::new(Arc::clone(&store), Arc::clone(&identity), config),
            status: StatusAggregator::new(identity),
        }
    }

    #[must_use]
    pub fn email(&self) -> &ChannelVerifier {
        &self.email
    }

    #[must_use]
    pub fn sms(&self) -> &ChannelVerifier {
        &self.sms
    }

    #[must_use]
    pub fn totp(&self) -> &TotpManager {
        &self.totp
    }

    #[must_use]
    pub fn status(&self) -> &StatusAggregator {
        &self.status
    }
}
