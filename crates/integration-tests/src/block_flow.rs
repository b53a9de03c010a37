//! End-to-end block scenarios: pool → forge → process → feedback.

use crate::harness::{settle, start_node};
use ddk_block_verify::testing::build_block;
use ddk_block_verify::{ForkCause, ProcessBlockError};
use ddk_mempool::testing::signed_tx;
use shared_bus::{EventFilter, EventTopic, NodeEvent};
use shared_crypto::KeyPair;
use shared_types::constants::SLOT_INTERVAL_SECS;
use shared_types::entities::{Address, TransactionAsset, TransactionType};

fn next_timestamp(last: &shared_types::entities::Block) -> u32 {
    last.timestamp + SLOT_INTERVAL_SECS as u32
}

#[tokio::test]
async fn test_forge_and_apply_drains_pool() {
    let node = start_node();
    let mut chain_events = node.bus.subscribe(EventFilter::topics(vec![EventTopic::Chain]));

    let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
    for (index, keypair) in keys.iter().enumerate() {
        node.ledger.credit(&keypair.public_key_bytes(), 1_000);
        let trs = signed_tx(
            keypair,
            TransactionType::Send,
            Some(Address(7)),
            10,
            1,
            100 + index as u32,
            TransactionAsset::None,
        );
        node.mempool.submit(trs);
    }
    settle(|| node.mempool.size() == 3).await;

    // The producer takes the two canonically-first transactions.
    let batch = node.mempool.pop_sorted(2).await;
    assert_eq!(batch.len(), 2);
    assert_eq!(node.mempool.size(), 1);
    assert!(batch[0].timestamp < batch[1].timestamp);

    let block = build_block(
        &node.forger,
        &node.genesis,
        batch.clone(),
        next_timestamp(&node.genesis),
        0,
    );
    let applied = node
        .processor
        .process_block(block, true, true, true)
        .await
        .unwrap();

    assert_eq!(applied.height, 2);
    assert_eq!(node.chain.height(), 1);
    assert_eq!(node.processor.last_block().id, applied.id);

    let event = chain_events.try_recv().unwrap().unwrap();
    assert!(matches!(event, NodeEvent::BlockApplied { height: 2, .. }));
}

#[tokio::test]
async fn test_applied_block_evicts_pool_entries() {
    let node = start_node();
    let keypair = KeyPair::generate();
    node.ledger.credit(&keypair.public_key_bytes(), 1_000);

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
    node.mempool.submit(trs.clone());
    settle(|| node.mempool.has(&id)).await;

    // Another node's delegate includes the same transaction; applying the
    // relayed block must evict our pool copy and credit back the
    // unconfirmed debit.
    let block = build_block(
        &node.forger,
        &node.genesis,
        vec![trs],
        next_timestamp(&node.genesis),
        0,
    );
    node.processor.process_block(block, false, true, true).await.unwrap();

    assert!(!node.mempool.has(&id));
    assert_eq!(node.mempool.size(), 0);
    let account = node
        .ledger
        .account(Address::from_public_key(&keypair.public_key_bytes()))
        .unwrap();
    assert_eq!(account.unconfirmed_balance, 1_000);
    assert!(!node.mempool.lock_status().pool);
    assert!(!node.mempool.lock_status().queue);
}

#[tokio::test]
async fn test_duplicate_transaction_in_block_fails_payload_check() {
    let node = start_node();
    let keypair = KeyPair::generate();
    let trs = signed_tx(
        &keypair,
        TransactionType::Send,
        Some(Address(7)),
        10,
        1,
        100,
        TransactionAsset::None,
    );

    let block = build_block(
        &node.forger,
        &node.genesis,
        vec![trs.clone(), trs.clone()],
        next_timestamp(&node.genesis),
        0,
    );

    let err = node.processor.process_block(block, false, true, true).await;
    match err {
        Err(ProcessBlockError::Verification { errors }) => {
            assert!(errors
                .iter()
                .any(|e| e.contains(&format!("Encountered duplicate transaction: {}", trs.id))));
        }
        other => panic!("expected verification failure, got {other:?}"),
    }
    assert_eq!(node.chain.height(), 0);
}

#[tokio::test]
async fn test_confirmed_transaction_in_block_signals_fork_two() {
    let node = start_node();
    let keypair = KeyPair::generate();
    node.ledger.credit(&keypair.public_key_bytes(), 1_000);

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

    // Already confirmed on chain, and still sitting in our pool.
    node.chain.mark_confirmed(id);
    node.mempool.push_to_pool(trs.clone(), false, false).await.unwrap();
    assert!(node.mempool.has(&id));

    let block = build_block(
        &node.forger,
        &node.genesis,
        vec![trs],
        next_timestamp(&node.genesis),
        0,
    );
    let block_id = block.id;

    let err = node.processor.process_block(block, false, true, true).await;
    assert!(matches!(
        err,
        Err(ProcessBlockError::DuplicateConfirmedTransaction(dup)) if dup == id
    ));
    assert_eq!(
        node.chain.forks(),
        vec![(block_id, ForkCause::DuplicateConfirmed)]
    );
    // The stale pool copy was evicted through the feedback edge.
    assert!(!node.mempool.has(&id));
    assert!(!node.mempool.lock_status().pool);
}

#[tokio::test]
async fn test_admission_continues_after_block() {
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

    let batch = node.mempool.pop_sorted(25).await;
    let block = build_block(
        &node.forger,
        &node.genesis,
        batch,
        next_timestamp(&node.genesis),
        0,
    );
    let first_block = node
        .processor
        .process_block(block, false, true, true)
        .await
        .unwrap();

    // The pipeline is still live for the next round.
    let second = signed_tx(
        &keypair,
        TransactionType::Send,
        Some(Address(7)),
        20,
        1,
        200,
        TransactionAsset::None,
    );
    let second_id = second.id;
    node.mempool.submit(second);
    settle(|| node.mempool.has(&second_id)).await;

    node.clock.advance(SLOT_INTERVAL_SECS);
    let batch = node.mempool.pop_sorted(25).await;
    let block = build_block(
        &node.forger,
        &first_block,
        batch,
        next_timestamp(&first_block),
        0,
    );
    let second_block = node
        .processor
        .process_block(block, false, true, true)
        .await
        .unwrap();

    assert_eq!(second_block.height, 3);
    assert_eq!(node.chain.height(), 2);
    assert_eq!(node.mempool.size(), 0);
}
