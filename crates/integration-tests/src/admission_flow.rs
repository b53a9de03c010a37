//! End-to-end admission scenarios: submit → queue → verify → pool.

use crate::harness::{settle, start_node};
use ddk_mempool::testing::signed_tx;
use shared_bus::{EventFilter, EventTopic, NodeEvent};
use shared_crypto::KeyPair;
use shared_types::entities::{Address, TransactionAsset, TransactionStatus, TransactionType};
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test]
async fn test_simple_admission_updates_pool_ledger_and_bus() {
    let node = start_node();
    let keypair = KeyPair::generate();
    node.ledger.credit(&keypair.public_key_bytes(), 1_000);

    let mut pool_events = node.bus.subscribe(EventFilter::topics(vec![EventTopic::Pool]));

    let trs = signed_tx(
        &keypair,
        TransactionType::Send,
        Some(Address(7)),
        10,
        1,
        100,
        TransactionAsset::None,
    );
    let id = trs.id;
    let sender = trs.sender_address;

    node.mempool.submit(trs);
    settle(|| node.mempool.has(&id)).await;

    assert_eq!(
        node.mempool.get(&id).unwrap().status,
        TransactionStatus::UnconfirmApplied
    );
    assert_eq!(node.ledger.account(sender).unwrap().unconfirmed_balance, 989);
    assert_eq!(node.ledger.account(sender).unwrap().balance, 1_000);

    let event = timeout(Duration::from_secs(1), pool_events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, NodeEvent::TransactionPutInPool(boxed) if boxed.id == id));
}

#[tokio::test]
async fn test_conflicting_sibling_parks_until_reshuffle() {
    let node = start_node();
    let keypair = KeyPair::generate();
    node.ledger.credit(&keypair.public_key_bytes(), 1_000);

    let first = signed_tx(
        &keypair,
        TransactionType::Send,
        Some(Address(7)),
        10,
        1,
        100,
        TransactionAsset::None,
    );
    let first_id = first.id;
    node.mempool.submit(first);
    settle(|| node.mempool.has(&first_id)).await;

    // Earlier canonical position than the pooled sibling.
    let overtaken = signed_tx(
        &keypair,
        TransactionType::Send,
        Some(Address(7)),
        5,
        1,
        50,
        TransactionAsset::None,
    );
    let overtaken_id = overtaken.id;
    node.mempool.submit(overtaken);

    settle(|| node.mempool.status().conflicted == 1).await;
    assert!(!node.mempool.has(&overtaken_id));

    // The sibling leaves with a forged block; the reshuffle admits the
    // parked transaction.
    let batch = node.mempool.pop_sorted(25).await;
    assert_eq!(batch.len(), 1);
    node.mempool.reshuffle();
    settle(|| node.mempool.has(&overtaken_id)).await;
}

#[tokio::test]
async fn test_double_spend_is_declined_with_session_notice() {
    let node = start_node();
    let keypair = KeyPair::generate();
    node.ledger.credit(&keypair.public_key_bytes(), 100);

    let address = Address::from_public_key(&keypair.public_key_bytes());
    let mut session = node.sessions.register(address);

    let overspend = signed_tx(
        &keypair,
        TransactionType::Send,
        Some(Address(7)),
        500,
        1,
        100,
        TransactionAsset::None,
    );
    let id = overspend.id;
    node.mempool.submit(overspend);

    let message = timeout(Duration::from_secs(1), session.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.channel, "pool/verify");
    assert!(!message.payload.verified);
    assert!(message.payload.errors[0].contains("Insufficient"));

    assert!(!node.mempool.has(&id));
    assert_eq!(
        node.ledger.account(address).unwrap().unconfirmed_balance,
        100
    );
}

#[tokio::test]
async fn test_key_rotation_waits_for_pending_set() {
    let node = start_node();
    let keypair = KeyPair::generate();
    node.ledger.credit(&keypair.public_key_bytes(), 10_000);

    let pending = signed_tx(
        &keypair,
        TransactionType::Send,
        Some(Address(7)),
        10,
        1,
        100,
        TransactionAsset::None,
    );
    let pending_id = pending.id;
    node.mempool.submit(pending);
    settle(|| node.mempool.has(&pending_id)).await;

    // Regardless of canonical position, a rotation conflicts while
    // anything from the account is pending.
    let rotation = signed_tx(
        &keypair,
        TransactionType::Signature,
        None,
        0,
        100,
        999,
        TransactionAsset::SecondSignature {
            public_key: KeyPair::generate().public_key_bytes(),
        },
    );
    node.mempool.submit(rotation);

    settle(|| node.mempool.status().conflicted == 1).await;
    assert_eq!(node.mempool.size(), 1);
}

#[tokio::test]
async fn test_expired_conflicted_transaction_is_dropped() {
    let node = start_node();
    let keypair = KeyPair::generate();
    node.ledger.credit(&keypair.public_key_bytes(), 1_000);

    let first = signed_tx(
        &keypair,
        TransactionType::Send,
        Some(Address(7)),
        10,
        1,
        100,
        TransactionAsset::None,
    );
    let first_id = first.id;
    node.mempool.submit(first);
    settle(|| node.mempool.has(&first_id)).await;

    let parked = signed_tx(
        &keypair,
        TransactionType::Send,
        Some(Address(7)),
        5,
        1,
        50,
        TransactionAsset::None,
    );
    let parked_id = parked.id;
    node.mempool.submit(parked);
    settle(|| node.mempool.status().conflicted == 1).await;

    // Past the for_testing expiry of 60 seconds.
    node.clock.advance(120);
    node.mempool.reshuffle();

    settle(|| node.mempool.status().conflicted == 0).await;
    assert!(!node.mempool.has(&parked_id));
    assert_eq!(node.mempool.size(), 1);
}

#[tokio::test]
async fn test_stake_freezes_unconfirmed_amount() {
    let node = start_node();
    let keypair = KeyPair::generate();
    node.ledger.credit(&keypair.public_key_bytes(), 1_000);

    let stake = signed_tx(
        &keypair,
        TransactionType::Stake,
        None,
        0,
        10,
        100,
        TransactionAsset::Stake { amount: 400 },
    );
    let id = stake.id;
    node.mempool.submit(stake);
    settle(|| node.mempool.has(&id)).await;

    let account = node
        .ledger
        .account(Address::from_public_key(&keypair.public_key_bytes()))
        .unwrap();
    assert_eq!(account.unconfirmed_frozen_amount, 400);
    assert_eq!(account.unconfirmed_balance, 990);
}
