//! Lifecycle controller: create, book and complete rides one at a time.
//!
//! The controller owns the form state (the ride draft and the ride id) and a
//! single in-flight flag.  Every public operation runs through
//! `execute_guarded`:
//!
//! ```text
//! not connected ─────────────► Failed(NotConnected)
//! already Submitting ────────► Failed(Busy)
//! encode fails ──────────────► Failed(Encoding)
//! otherwise: Idle ─► Submitting ─► submit ─► Idle
//!                                    └─ Confirmed ─► reset form field
//! ```
//!
//! Only the last branch touches the in-flight flag, and it is cleared on
//! every exit path, including when the future is dropped mid-submission.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{info, warn};

use crate::encoder::{encode_create_ride, EntryArg, RideDraft, RideReference};
use crate::errors::EncodingError;
use crate::session::{AccountAddress, Session};
use crate::transaction::{
    FailureReason, FunctionId, SubmissionOutcome, Submitter, TransactionRequest,
};

/// The three contract entry points a user can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RideAction {
    Create,
    Book,
    Complete,
}

impl RideAction {
    pub fn function_name(&self) -> &'static str {
        match self {
            Self::Create => "create_ride",
            Self::Book => "book_ride",
            Self::Complete => "complete_ride",
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            Self::Create => "Ride created successfully!",
            Self::Book => "Ride booked successfully!",
            Self::Complete => "Ride completed successfully!",
        }
    }

    pub fn failure_message(&self) -> &'static str {
        match self {
            Self::Create => "Error creating ride",
            Self::Book => "Error booking ride",
            Self::Complete => "Error completing ride",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Idle,
    Submitting,
}

pub struct RideController {
    session: Session,
    submitter: Submitter,
    contract: AccountAddress,
    module: String,
    in_flight: AtomicBool,
    draft: Mutex<RideDraft>,
    ride_id: Mutex<String>,
}

/// Holds the in-flight flag for the lifetime of one submission.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RideController {
    pub fn new(
        session: Session,
        submitter: Submitter,
        contract: AccountAddress,
        module: &str,
    ) -> Self {
        Self {
            session,
            submitter,
            contract,
            module: module.to_string(),
            in_flight: AtomicBool::new(false),
            draft: Mutex::new(RideDraft::default()),
            ride_id: Mutex::new(String::new()),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> ControllerState {
        if self.in_flight.load(Ordering::Acquire) {
            ControllerState::Submitting
        } else {
            ControllerState::Idle
        }
    }

    pub fn draft(&self) -> RideDraft {
        lock(&self.draft).clone()
    }

    pub fn set_draft(&self, draft: RideDraft) {
        *lock(&self.draft) = draft;
    }

    pub fn ride_id(&self) -> String {
        lock(&self.ride_id).clone()
    }

    pub fn set_ride_id(&self, ride_id: &str) {
        *lock(&self.ride_id) = ride_id.to_string();
    }

    pub fn function_id(&self, action: RideAction) -> FunctionId {
        FunctionId::new(self.contract.clone(), &self.module, action.function_name())
    }

    /// Submit `create_ride` for the stored draft.
    ///
    /// The draft is cleared only once the ride is confirmed, so a failed
    /// attempt can be retried as is.
    pub async fn create_ride(&self) -> SubmissionOutcome {
        self.execute_guarded(
            RideAction::Create,
            |c| encode_create_ride(&c.draft()),
            |c| c.set_draft(RideDraft::default()),
        )
        .await
    }

    pub async fn book_ride(&self) -> SubmissionOutcome {
        self.execute_guarded(
            RideAction::Book,
            Self::encode_ride_reference,
            |c| c.set_ride_id(""),
        )
        .await
    }

    pub async fn complete_ride(&self) -> SubmissionOutcome {
        self.execute_guarded(
            RideAction::Complete,
            Self::encode_ride_reference,
            |c| c.set_ride_id(""),
        )
        .await
    }

    fn encode_ride_reference(&self) -> Result<Vec<EntryArg>, EncodingError> {
        Ok(RideReference::parse(&self.ride_id())?.to_args())
    }

    async fn execute_guarded<E, R>(
        &self,
        action: RideAction,
        encode: E,
        on_confirmed: R,
    ) -> SubmissionOutcome
    where
        E: FnOnce(&Self) -> Result<Vec<EntryArg>, EncodingError>,
        R: FnOnce(&Self),
    {
        let Some(sender) = self.session.account() else {
            return self.reject(action, FailureReason::NotConnected);
        };
        if self.in_flight.load(Ordering::Acquire) {
            return self.reject(action, FailureReason::Busy);
        }
        let arguments = match encode(self) {
            Ok(arguments) => arguments,
            Err(e) => return self.reject(action, e.into()),
        };
        let Some(_in_flight) = InFlight::acquire(&self.in_flight) else {
            return self.reject(action, FailureReason::Busy);
        };

        let request = TransactionRequest::entry_function(self.function_id(action), arguments);
        let outcome = self
            .submitter
            .submit(self.session.wallet(), &sender, &request)
            .await;

        if outcome.is_confirmed() {
            on_confirmed(self);
            info!("{}", action.success_message());
        }
        outcome
    }

    fn reject(&self, action: RideAction, reason: FailureReason) -> SubmissionOutcome {
        warn!("{}: {reason}", action.failure_message());
        SubmissionOutcome::Failed(reason)
    }
}
