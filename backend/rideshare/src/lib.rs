//! # RideShare client
//!
//! Creates, books and completes carpool rides held by the `carpooling`
//! contract.  Ride state lives on the ledger; this crate only turns form
//! input into contract calls, hands them to a wallet for signing and waits
//! for the ledger to finalise them.
//!
//! | Stage              | Module                                    |
//! |--------------------|-------------------------------------------|
//! | Argument encoding  | [`encoder`]                               |
//! | Submission         | [`transaction`], [`wallet`], [`rpc`]      |
//! | Lifecycle          | [`controller`], [`session`]               |
//! | HTTP front         | [`api`]                                   |

pub mod api;
pub mod config;
pub mod controller;
pub mod encoder;
pub mod errors;
pub mod rpc;
pub mod session;
pub mod transaction;
pub mod wallet;

#[cfg(test)]
mod test_lifecycle;
#[cfg(test)]
mod test_support;

pub use controller::{ControllerState, RideAction, RideController};
pub use encoder::{RideDraft, RideReference};
pub use session::{AccountAddress, Session};
pub use transaction::{FailureReason, SubmissionOutcome, Submitter};
