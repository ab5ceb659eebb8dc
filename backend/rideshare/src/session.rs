//! Wallet connection state, passed explicitly to whoever needs it.
//!
//! A [`Session`] pairs the wallet capability with the currently connected
//! account.  The account is published on a [`watch`] channel so a front end
//! can observe connects and disconnects without polling.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::errors::WalletError;
use crate::transaction::{TransactionHash, TransactionRequest};

/// A `0x`-prefixed hex account address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountAddress(String);

impl AccountAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x82cc...c6a6` style abbreviation for display.
    pub fn short(&self) -> String {
        if self.0.len() <= 10 {
            return self.0.clone();
        }
        format!("{}...{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl FromStr for AccountAddress {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let digits = raw
            .strip_prefix("0x")
            .ok_or_else(|| format!("{raw:?} must start with 0x"))?;
        if digits.is_empty() || digits.len() > 64 {
            return Err(format!("{raw:?} must have 1 to 64 hex digits"));
        }
        // hex::decode needs an even number of digits.
        let padded = if digits.len() % 2 == 1 {
            format!("0{digits}")
        } else {
            digits.to_string()
        };
        hex::decode(&padded).map_err(|e| format!("{raw:?} is not hex: {e}"))?;
        Ok(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }
}

impl TryFrom<String> for AccountAddress {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<AccountAddress> for String {
    fn from(address: AccountAddress) -> Self {
        address.0
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Signing capability of an external wallet.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Ask the named provider for an account.
    async fn connect(&self, provider: &str) -> Result<AccountAddress, WalletError>;

    async fn disconnect(&self) -> Result<(), WalletError>;

    /// Sign `request` as `sender` and submit it to the network.
    async fn sign_and_submit(
        &self,
        sender: &AccountAddress,
        request: &TransactionRequest,
    ) -> Result<TransactionHash, WalletError>;
}

/// Wallet capability plus the account it is currently connected as.
#[derive(Clone)]
pub struct Session {
    wallet: Arc<dyn Wallet>,
    account: Arc<watch::Sender<Option<AccountAddress>>>,
}

impl Session {
    pub fn new(wallet: Arc<dyn Wallet>) -> Self {
        let (account, _) = watch::channel(None);
        Self {
            wallet,
            account: Arc::new(account),
        }
    }

    pub fn wallet(&self) -> &dyn Wallet {
        self.wallet.as_ref()
    }

    pub async fn connect(&self, provider: &str) -> Result<AccountAddress, WalletError> {
        let address = self.wallet.connect(provider).await?;
        info!("Wallet connected via {provider}: {}", address.short());
        self.account.send_replace(Some(address.clone()));
        Ok(address)
    }

    /// Forget the connected account, even if the wallet reports an error.
    pub async fn disconnect(&self) {
        if let Err(e) = self.wallet.disconnect().await {
            warn!("Wallet disconnect failed: {e}");
        }
        if let Some(previous) = self.account.send_replace(None) {
            info!("Wallet disconnected: {}", previous.short());
        }
    }

    pub fn account(&self) -> Option<AccountAddress> {
        self.account.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.account.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<AccountAddress>> {
        self.account.subscribe()
    }
}
