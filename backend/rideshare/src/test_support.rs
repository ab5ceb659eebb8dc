//! Fakes shared by the unit and scenario tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::{Json, Router};
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::errors::{LedgerError, WalletError};
use crate::session::{AccountAddress, Wallet};
use crate::transaction::{CommittedTransaction, Ledger, TransactionHash, TransactionRequest};

pub const DRIVER: &str = "0x82cc89e747697f4a8d44d7e32cb5ad0e0c784d0dddefff16cf74fcff7462c6a6";

/// Client that talks to local fakes directly, whatever the proxy env says.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Bind `app` on an ephemeral local port and return its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Replies with a fixed sequence of responses, repeating the last one.
pub struct Script {
    replies: Vec<(StatusCode, Value)>,
    hits: AtomicUsize,
    requests: Mutex<Vec<(String, Option<Value>)>>,
}

impl Script {
    pub fn new(replies: Vec<(StatusCode, Value)>) -> Arc<Self> {
        assert!(!replies.is_empty());
        Arc::new(Self {
            replies,
            hits: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub async fn handler(
        State(script): State<Arc<Script>>,
        uri: Uri,
        body: Bytes,
    ) -> (StatusCode, Json<Value>) {
        let n = script.hits.fetch_add(1, Ordering::SeqCst);
        script
            .requests
            .lock()
            .unwrap()
            .push((uri.path().to_string(), serde_json::from_slice(&body).ok()));
        let (status, value) = &script.replies[n.min(script.replies.len() - 1)];
        (*status, Json(value.clone()))
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn bodies(&self) -> Vec<Option<Value>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }
}

/// How [`MockWallet`] answers the next sign request.
pub enum SignReply {
    Accept(&'static str),
    Reject(&'static str),
}

/// Wallet that answers from a queue and records what it was asked to sign.
///
/// With [`MockWallet::gated`] every sign request waits for [`MockWallet::release`],
/// which lets a test hold a submission in flight.
pub struct MockWallet {
    replies: Mutex<VecDeque<SignReply>>,
    pub submitted: Mutex<Vec<TransactionRequest>>,
    gate: Option<Semaphore>,
    pub entered: Semaphore,
}

impl MockWallet {
    pub fn new(replies: Vec<SignReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            submitted: Mutex::new(Vec::new()),
            gate: None,
            entered: Semaphore::new(0),
        })
    }

    pub fn gated(replies: Vec<SignReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            submitted: Mutex::new(Vec::new()),
            gate: Some(Semaphore::new(0)),
            entered: Semaphore::new(0),
        })
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn submissions(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }
}

#[async_trait]
impl Wallet for MockWallet {
    async fn connect(&self, _provider: &str) -> Result<AccountAddress, WalletError> {
        Ok(DRIVER.parse().unwrap())
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        Ok(())
    }

    async fn sign_and_submit(
        &self,
        _sender: &AccountAddress,
        request: &TransactionRequest,
    ) -> Result<TransactionHash, WalletError> {
        self.submitted.lock().unwrap().push(request.clone());
        self.entered.add_permits(1);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected sign request");
        match reply {
            SignReply::Accept(hash) => Ok(TransactionHash(hash.to_string())),
            SignReply::Reject(reason) => Err(WalletError::Rejected(reason.to_string())),
        }
    }
}

/// Ledger that commits every transaction, or aborts all with a fixed status.
pub struct MockLedger {
    abort: Option<String>,
}

impl MockLedger {
    pub fn committing() -> Arc<Self> {
        Arc::new(Self { abort: None })
    }

    pub fn aborting(vm_status: &str) -> Arc<Self> {
        Arc::new(Self {
            abort: Some(vm_status.to_string()),
        })
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn wait_for_finality(
        &self,
        hash: &TransactionHash,
    ) -> Result<CommittedTransaction, LedgerError> {
        match &self.abort {
            Some(status) => Err(LedgerError::Aborted(status.clone())),
            None => Ok(CommittedTransaction {
                hash: hash.clone(),
                version: Some(1),
                vm_status: "Executed successfully".to_string(),
            }),
        }
    }
}
