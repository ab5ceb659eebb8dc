//! Contract call requests and the submit → finality pipeline.
//!
//! [`Submitter::submit`] is the single place where collaborator errors are
//! caught.  Whatever goes wrong after encoding comes back as a
//! [`SubmissionOutcome::Failed`] with a [`FailureReason`] that still says
//! which collaborator failed and why.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::encoder::EntryArg;
use crate::errors::{EncodingError, LedgerError, WalletError};
use crate::session::{AccountAddress, Wallet};

/// `<address>::<module>::<function>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionId {
    pub address: AccountAddress,
    pub module: String,
    pub function: String,
}

impl FunctionId {
    pub fn new(address: AccountAddress, module: &str, function: &str) -> Self {
        Self {
            address,
            module: module.to_string(),
            function: function.to_string(),
        }
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.address, self.module, self.function)
    }
}

impl Serialize for FunctionId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Entry-function payload handed to the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRequest {
    #[serde(rename = "type")]
    pub payload_type: &'static str,
    pub function: FunctionId,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<EntryArg>,
}

impl TransactionRequest {
    pub fn entry_function(function: FunctionId, arguments: Vec<EntryArg>) -> Self {
        Self {
            payload_type: "entry_function_payload",
            function,
            type_arguments: Vec::new(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionHash(pub String);

impl fmt::Display for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A transaction the ledger has committed successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedTransaction {
    pub hash: TransactionHash,
    pub version: Option<u64>,
    pub vm_status: String,
}

/// Finality capability of a ledger node.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Resolve once `hash` is committed, or fail if it was rejected.
    async fn wait_for_finality(
        &self,
        hash: &TransactionHash,
    ) -> Result<CommittedTransaction, LedgerError>;
}

/// Why a ride action did not reach the ledger, or was rejected there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Input could not be encoded; nothing was submitted.
    Encoding(EncodingError),
    /// No wallet account is connected.
    NotConnected,
    /// Another submission is still in flight.
    Busy,
    /// The wallet declined to sign or submit.
    WalletRejection(String),
    /// The transaction was committed but aborted by the contract.
    SubmissionFailure(String),
    /// The configured finality bound elapsed.
    FinalityTimeout(Duration),
    /// The finality wait failed without a verdict from the contract.
    FinalityUnknown(String),
}

impl FailureReason {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Encoding(_) => "encoding",
            Self::NotConnected => "not_connected",
            Self::Busy => "busy",
            Self::WalletRejection(_) => "wallet_rejection",
            Self::SubmissionFailure(_) => "submission_failure",
            Self::FinalityTimeout(_) => "finality_timeout",
            Self::FinalityUnknown(_) => "finality_unknown",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encoding(e) => write!(f, "invalid input: {e}"),
            Self::NotConnected => f.write_str("no wallet account is connected"),
            Self::Busy => f.write_str("another transaction is still in progress"),
            Self::WalletRejection(reason) => write!(f, "wallet rejected the transaction: {reason}"),
            Self::SubmissionFailure(reason) => f.write_str(reason),
            Self::FinalityTimeout(after) => {
                write!(f, "transaction not final after {}s", after.as_secs())
            }
            Self::FinalityUnknown(reason) => {
                write!(f, "could not confirm transaction: {reason}")
            }
        }
    }
}

impl From<EncodingError> for FailureReason {
    fn from(e: EncodingError) -> Self {
        Self::Encoding(e)
    }
}

impl From<WalletError> for FailureReason {
    fn from(e: WalletError) -> Self {
        match e {
            WalletError::NotConnected => Self::NotConnected,
            WalletError::Rejected(reason) => Self::WalletRejection(reason),
            other => Self::WalletRejection(other.to_string()),
        }
    }
}

impl From<LedgerError> for FailureReason {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Aborted(vm_status) => Self::SubmissionFailure(vm_status),
            other => Self::FinalityUnknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Confirmed(TransactionHash),
    Failed(FailureReason),
}

impl SubmissionOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }
}

/// Dispatches requests to the wallet and waits for ledger finality.
#[derive(Clone)]
pub struct Submitter {
    ledger: Arc<dyn Ledger>,
    finality_timeout: Option<Duration>,
}

impl Submitter {
    pub fn new(ledger: Arc<dyn Ledger>, finality_timeout: Option<Duration>) -> Self {
        Self {
            ledger,
            finality_timeout,
        }
    }

    pub async fn submit(
        &self,
        wallet: &dyn Wallet,
        sender: &AccountAddress,
        request: &TransactionRequest,
    ) -> SubmissionOutcome {
        match self.try_submit(wallet, sender, request).await {
            Ok(committed) => {
                info!(
                    "{} confirmed: {} (version {:?})",
                    request.function.function, committed.hash, committed.version
                );
                SubmissionOutcome::Confirmed(committed.hash)
            }
            Err(reason) => {
                warn!("{} failed: {reason}", request.function.function);
                SubmissionOutcome::Failed(reason)
            }
        }
    }

    async fn try_submit(
        &self,
        wallet: &dyn Wallet,
        sender: &AccountAddress,
        request: &TransactionRequest,
    ) -> Result<CommittedTransaction, FailureReason> {
        info!("Submitting {} as {}", request.function, sender.short());
        let hash = wallet.sign_and_submit(sender, request).await?;
        info!("Submitted {hash}, waiting for finality");

        let wait = self.ledger.wait_for_finality(&hash);
        let committed = match self.finality_timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| FailureReason::FinalityTimeout(limit))??,
            None => wait.await?,
        };
        Ok(committed)
    }
}
