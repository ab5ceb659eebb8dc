use std::sync::Arc;

use chrono::Local;

use crate::controller::{ControllerState, RideAction, RideController};
use crate::encoder::{departure_epoch_seconds, EntryArg, RideDraft};
use crate::errors::{EncodingError, EncodingErrorKind, Field};
use crate::session::Session;
use crate::test_support::{MockLedger, MockWallet, SignReply, DRIVER};
use crate::transaction::{FailureReason, Ledger, SubmissionOutcome, Submitter, TransactionHash};

fn draft() -> RideDraft {
    RideDraft {
        from_location: "A".to_string(),
        to_location: "B".to_string(),
        departure_time: "2030-06-01T08:30".to_string(),
        available_seats: "3".to_string(),
        price_per_seat: "100".to_string(),
    }
}

fn unconnected(wallet: &Arc<MockWallet>, ledger: Arc<dyn Ledger>) -> Arc<RideController> {
    Arc::new(RideController::new(
        Session::new(wallet.clone()),
        Submitter::new(ledger, None),
        DRIVER.parse().unwrap(),
        "carpooling",
    ))
}

async fn connected(wallet: &Arc<MockWallet>, ledger: Arc<dyn Ledger>) -> Arc<RideController> {
    let controller = unconnected(wallet, ledger);
    controller.session().connect("Petra").await.unwrap();
    controller
}

fn confirmed(hash: &str) -> SubmissionOutcome {
    SubmissionOutcome::Confirmed(TransactionHash(hash.to_string()))
}

#[tokio::test]
async fn test_create_ride_confirmed_resets_draft() {
    let wallet = MockWallet::new(vec![SignReply::Accept("0xc1")]);
    let controller = connected(&wallet, MockLedger::committing()).await;
    controller.set_draft(draft());

    assert_eq!(controller.create_ride().await, confirmed("0xc1"));
    assert_eq!(controller.draft(), RideDraft::default());
    assert_eq!(controller.state(), ControllerState::Idle);

    let submitted = wallet.submitted.lock().unwrap();
    assert_eq!(submitted.len(), 1);
    let request = &submitted[0];
    assert_eq!(
        request.function.to_string(),
        format!("{DRIVER}::carpooling::create_ride")
    );
    assert!(request.type_arguments.is_empty());
    assert_eq!(
        request.arguments,
        vec![
            EntryArg::Bytes(b"A".to_vec()),
            EntryArg::Bytes(b"B".to_vec()),
            EntryArg::U64(departure_epoch_seconds("2030-06-01T08:30", &Local).unwrap() as u64),
            EntryArg::U64(3),
            EntryArg::U64(100),
        ]
    );
}

#[tokio::test]
async fn test_reset_yields_default_regardless_of_prior_draft() {
    let wallet = MockWallet::new(vec![SignReply::Accept("0x1"), SignReply::Accept("0x2")]);
    let controller = connected(&wallet, MockLedger::committing()).await;

    let other = RideDraft {
        from_location: "Lyon Part-Dieu".to_string(),
        to_location: "Genève Cornavin".to_string(),
        departure_time: "2031-12-24T18:05:30".to_string(),
        available_seats: "1".to_string(),
        price_per_seat: "0".to_string(),
    };
    for d in [draft(), other] {
        controller.set_draft(d);
        assert!(controller.create_ride().await.is_confirmed());
        assert_eq!(controller.draft(), RideDraft::default());
    }
}

#[tokio::test]
async fn test_create_ride_failure_keeps_draft_for_retry() {
    let wallet = MockWallet::new(vec![SignReply::Accept("0xc2")]);
    let status = "Move abort in 0x82cc::carpooling: E_INVALID_DEPARTURE(0x4)";
    let controller = connected(&wallet, MockLedger::aborting(status)).await;
    controller.set_draft(draft());

    assert_eq!(
        controller.create_ride().await,
        SubmissionOutcome::Failed(FailureReason::SubmissionFailure(status.to_string()))
    );
    assert_eq!(controller.draft(), draft());
    assert_eq!(controller.state(), ControllerState::Idle);
}

#[tokio::test]
async fn test_non_numeric_seats_never_reach_the_wallet() {
    let wallet = MockWallet::new(vec![]);
    let controller = connected(&wallet, MockLedger::committing()).await;
    let mut bad = draft();
    bad.available_seats = "three".to_string();
    controller.set_draft(bad.clone());

    assert_eq!(
        controller.create_ride().await,
        SubmissionOutcome::Failed(FailureReason::Encoding(EncodingError::new(
            Field::AvailableSeats,
            EncodingErrorKind::NotANumber("three".to_string()),
        )))
    );
    assert_eq!(wallet.submissions(), 0);
    assert_eq!(controller.draft(), bad);
    assert_eq!(controller.state(), ControllerState::Idle);
}

#[tokio::test]
async fn test_actions_require_a_connected_account() {
    let wallet = MockWallet::new(vec![]);
    let controller = unconnected(&wallet, MockLedger::committing());
    controller.set_draft(draft());
    controller.set_ride_id("42");

    for outcome in [
        controller.create_ride().await,
        controller.book_ride().await,
        controller.complete_ride().await,
    ] {
        assert_eq!(outcome, SubmissionOutcome::Failed(FailureReason::NotConnected));
    }
    assert_eq!(wallet.submissions(), 0);
    assert_eq!(controller.draft(), draft());
    assert_eq!(controller.ride_id(), "42");
}

#[tokio::test]
async fn test_book_ride_wallet_rejection_keeps_ride_id() {
    let wallet = MockWallet::new(vec![SignReply::Reject("User rejected the request")]);
    let controller = connected(&wallet, MockLedger::committing()).await;
    controller.set_ride_id("42");

    assert_eq!(
        controller.book_ride().await,
        SubmissionOutcome::Failed(FailureReason::WalletRejection(
            "User rejected the request".to_string()
        ))
    );
    assert_eq!(controller.ride_id(), "42");
    assert_eq!(controller.state(), ControllerState::Idle);

    let submitted = wallet.submitted.lock().unwrap();
    assert_eq!(submitted[0].function.function, "book_ride");
    assert_eq!(submitted[0].arguments, vec![EntryArg::U64(42)]);
}

#[tokio::test]
async fn test_book_ride_confirmed_clears_ride_id() {
    let wallet = MockWallet::new(vec![SignReply::Accept("0xb1")]);
    let controller = connected(&wallet, MockLedger::committing()).await;
    controller.set_ride_id("42");

    assert_eq!(controller.book_ride().await, confirmed("0xb1"));
    assert_eq!(controller.ride_id(), "");
}

#[tokio::test]
async fn test_complete_ride_abort_reason_is_preserved() {
    let wallet = MockWallet::new(vec![SignReply::Accept("0xd1")]);
    let controller = connected(&wallet, MockLedger::aborting("ride not yet booked")).await;
    controller.set_ride_id("7");

    assert_eq!(
        controller.complete_ride().await,
        SubmissionOutcome::Failed(FailureReason::SubmissionFailure(
            "ride not yet booked".to_string()
        ))
    );
    assert_eq!(controller.ride_id(), "7");
    assert_eq!(
        wallet.submitted.lock().unwrap()[0].function.function,
        RideAction::Complete.function_name()
    );
}

#[tokio::test]
async fn test_invalid_ride_id_is_an_encoding_failure() {
    let wallet = MockWallet::new(vec![]);
    let controller = connected(&wallet, MockLedger::committing()).await;
    controller.set_ride_id("seven");

    match controller.complete_ride().await {
        SubmissionOutcome::Failed(FailureReason::Encoding(e)) => {
            assert_eq!(e.field, Field::RideId)
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(wallet.submissions(), 0);
}

#[tokio::test]
async fn test_second_action_while_submitting_is_rejected() {
    let wallet = MockWallet::gated(vec![SignReply::Accept("0xc3")]);
    let controller = connected(&wallet, MockLedger::committing()).await;
    controller.set_draft(draft());
    controller.set_ride_id("42");

    let pending = tokio::spawn({
        let controller = controller.clone();
        async move { controller.create_ride().await }
    });
    wallet.entered.acquire().await.unwrap().forget();
    assert_eq!(controller.state(), ControllerState::Submitting);

    assert_eq!(
        controller.book_ride().await,
        SubmissionOutcome::Failed(FailureReason::Busy)
    );
    assert_eq!(
        controller.create_ride().await,
        SubmissionOutcome::Failed(FailureReason::Busy)
    );
    assert_eq!(wallet.submissions(), 1);
    assert_eq!(controller.ride_id(), "42");

    wallet.release();
    assert_eq!(pending.await.unwrap(), confirmed("0xc3"));
    assert_eq!(controller.state(), ControllerState::Idle);
    assert_eq!(controller.draft(), RideDraft::default());
}

#[tokio::test]
async fn test_dropped_submission_returns_to_idle() {
    let wallet = MockWallet::gated(vec![]);
    let controller = connected(&wallet, MockLedger::committing()).await;
    controller.set_ride_id("9");

    let pending = tokio::spawn({
        let controller = controller.clone();
        async move { controller.book_ride().await }
    });
    wallet.entered.acquire().await.unwrap().forget();
    assert_eq!(controller.state(), ControllerState::Submitting);

    pending.abort();
    assert!(pending.await.unwrap_err().is_cancelled());
    assert_eq!(controller.state(), ControllerState::Idle);
    assert_eq!(controller.ride_id(), "9");
}
