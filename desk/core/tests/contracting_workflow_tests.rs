// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the contracting workflow.
//!
//! Covers approval gating, idempotent issuance (sequential, concurrent and
//! through a store conflict), the status-change events a contract produces,
//! partial-failure recovery, and races against a concurrent reject.

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use proposal_desk_core::application::{
    ContractingService, NotificationOutcome, ProposalService, ServiceError, StandardContractingService,
    StandardProposalService, StatusEventNotifier,
};
use proposal_desk_core::domain::contract::Contract;
use proposal_desk_core::domain::messaging::{EventPublisher, PublishError};
use proposal_desk_core::domain::proposal::{Proposal, ProposalId, ProposalStatus, TransitionPolicy};
use proposal_desk_core::domain::repository::{ContractRepository, ProposalRepository, RepositoryError};
use proposal_desk_core::infrastructure::event_bus::{EventBus, EventBusError};
use proposal_desk_core::infrastructure::repositories::{InMemoryContractRepository, InMemoryProposalRepository};

struct Desk {
    proposals: Arc<dyn ProposalService>,
    contracting: Arc<dyn ContractingService>,
}

fn desk_with(
    proposal_repo: Arc<dyn ProposalRepository>,
    contract_repo: Arc<dyn ContractRepository>,
    publisher: Arc<dyn EventPublisher>,
) -> Desk {
    let notifier = Arc::new(StatusEventNotifier::with_default_topic(publisher));
    Desk {
        proposals: Arc::new(StandardProposalService::new(
            proposal_repo.clone(),
            contract_repo.clone(),
            notifier.clone(),
            TransitionPolicy::Permissive,
        )),
        contracting: Arc::new(StandardContractingService::new(proposal_repo, contract_repo, notifier)),
    }
}

fn in_memory_desk(bus: &EventBus) -> (Desk, InMemoryContractRepository) {
    let contracts = InMemoryContractRepository::new();
    let desk = desk_with(
        Arc::new(InMemoryProposalRepository::new()),
        Arc::new(contracts.clone()),
        Arc::new(bus.clone()),
    );
    (desk, contracts)
}

async fn approved_proposal(desk: &Desk, name: &str) -> ProposalId {
    let proposal = desk
        .proposals
        .create_proposal(name, Decimal::from(50_000))
        .await
        .unwrap();
    desk.proposals.approve_proposal(proposal.id()).await.unwrap();
    proposal.id()
}

struct BrokenPublisher;

#[async_trait]
impl EventPublisher for BrokenPublisher {
    async fn publish(&self, _topic: &str, _payload: serde_json::Value) -> Result<(), PublishError> {
        Err(PublishError::Rejected { status: 503 })
    }
}

#[derive(Default)]
struct RecordingPublisher {
    events: Mutex<Vec<serde_json::Value>>,
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, _topic: &str, payload: serde_json::Value) -> Result<(), PublishError> {
        self.events.lock().push(payload);
        Ok(())
    }
}

/// Hides existing contracts from the first lookup, as a concurrent writer
/// landing between the existence check and the insert would.
struct StaleReadContractRepository {
    inner: InMemoryContractRepository,
    lookups: AtomicUsize,
}

#[async_trait]
impl ContractRepository for StaleReadContractRepository {
    async fn find_by_proposal_id(&self, proposal_id: ProposalId) -> Result<Option<Contract>, RepositoryError> {
        if self.lookups.fetch_add(1, Ordering::SeqCst) == 0 {
            return Ok(None);
        }
        self.inner.find_by_proposal_id(proposal_id).await
    }

    async fn insert(&self, contract: &Contract) -> Result<Contract, RepositoryError> {
        self.inner.insert(contract).await
    }
}

/// Fails the next proposal update once armed.
struct FlakyProposalRepository {
    inner: InMemoryProposalRepository,
    fail_next_update: AtomicBool,
}

#[async_trait]
impl ProposalRepository for FlakyProposalRepository {
    async fn find_by_id(&self, id: ProposalId) -> Result<Option<Proposal>, RepositoryError> {
        self.inner.find_by_id(id).await
    }

    async fn insert(&self, proposal: &Proposal) -> Result<Proposal, RepositoryError> {
        self.inner.insert(proposal).await
    }

    async fn update(&self, proposal: &Proposal, expected_status: ProposalStatus) -> Result<Proposal, RepositoryError> {
        if self.fail_next_update.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::Database("connection reset".to_string()));
        }
        self.inner.update(proposal, expected_status).await
    }

    async fn list_all(&self) -> Result<Vec<Proposal>, RepositoryError> {
        self.inner.list_all().await
    }

    async fn list_by_status(&self, status: ProposalStatus) -> Result<Vec<Proposal>, RepositoryError> {
        self.inner.list_by_status(status).await
    }
}

/// Fails the next contract insert once armed.
struct FlakyContractRepository {
    inner: InMemoryContractRepository,
    fail_next_insert: AtomicBool,
}

#[async_trait]
impl ContractRepository for FlakyContractRepository {
    async fn find_by_proposal_id(&self, proposal_id: ProposalId) -> Result<Option<Contract>, RepositoryError> {
        self.inner.find_by_proposal_id(proposal_id).await
    }

    async fn insert(&self, contract: &Contract) -> Result<Contract, RepositoryError> {
        if self.fail_next_insert.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::Database("connection reset".to_string()));
        }
        self.inner.insert(contract).await
    }
}

/// Stalls writes moving a proposal into `delayed`, after the caller has
/// already read the proposal, so a competing request can land first.
struct DelayedWriteProposalRepository {
    inner: InMemoryProposalRepository,
    delayed: ProposalStatus,
    delay: Duration,
}

#[async_trait]
impl ProposalRepository for DelayedWriteProposalRepository {
    async fn find_by_id(&self, id: ProposalId) -> Result<Option<Proposal>, RepositoryError> {
        self.inner.find_by_id(id).await
    }

    async fn insert(&self, proposal: &Proposal) -> Result<Proposal, RepositoryError> {
        self.inner.insert(proposal).await
    }

    async fn update(&self, proposal: &Proposal, expected_status: ProposalStatus) -> Result<Proposal, RepositoryError> {
        if proposal.status() == self.delayed {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.update(proposal, expected_status).await
    }

    async fn list_all(&self) -> Result<Vec<Proposal>, RepositoryError> {
        self.inner.list_all().await
    }

    async fn list_by_status(&self, status: ProposalStatus) -> Result<Vec<Proposal>, RepositoryError> {
        self.inner.list_by_status(status).await
    }
}

fn delayed_desk(delayed: ProposalStatus) -> (Desk, InMemoryContractRepository, Arc<RecordingPublisher>) {
    let contracts = InMemoryContractRepository::new();
    let publisher = Arc::new(RecordingPublisher::default());
    let desk = desk_with(
        Arc::new(DelayedWriteProposalRepository {
            inner: InMemoryProposalRepository::new(),
            delayed,
            delay: Duration::from_millis(100),
        }),
        Arc::new(contracts.clone()),
        publisher.clone(),
    );
    (desk, contracts, publisher)
}

#[tokio::test]
async fn test_approved_proposal_is_contracted_once() {
    let bus = EventBus::new(16);
    let (desk, contracts) = in_memory_desk(&bus);
    let id = approved_proposal(&desk, "Ana Costa").await;

    let first = desk.contracting.contract_proposal(id).await.unwrap();
    assert!(!first.already_existed);
    assert_eq!(first.proposal.status(), ProposalStatus::Contracted);
    assert_eq!(first.notification, NotificationOutcome::Published);
    assert!(first.contract.contract_number.starts_with("CTR"));

    let second = desk.contracting.contract_proposal(id).await.unwrap();
    assert!(second.already_existed);
    assert_eq!(second.contract, first.contract);
    assert_eq!(second.notification, NotificationOutcome::NotRequired);

    assert_eq!(contracts.len(), 1);
    let stored = desk.proposals.get_proposal(id).await.unwrap();
    assert_eq!(stored.status(), ProposalStatus::Contracted);
}

#[tokio::test]
async fn test_contracting_emits_exactly_one_event() {
    let bus = EventBus::new(16);
    let (desk, _) = in_memory_desk(&bus);
    let id = approved_proposal(&desk, "Ana Costa").await;
    let mut receiver = bus.subscribe_proposal(id);
    let mut all = bus.subscribe();

    desk.contracting.contract_proposal(id).await.unwrap();
    desk.contracting.contract_proposal(id).await.unwrap();

    let event = receiver.recv().await.unwrap();
    assert_eq!(event.previous_status, ProposalStatus::Approved);
    assert_eq!(event.new_status, ProposalStatus::Contracted);
    assert_eq!(event.event_type, "StatusChanged");

    let published = all.recv().await.unwrap();
    assert_eq!(published.topic, "status");
    assert!(matches!(all.try_recv(), Err(EventBusError::Empty)));
}

#[tokio::test]
async fn test_unapproved_proposals_cannot_be_contracted() {
    let bus = EventBus::new(16);
    let (desk, contracts) = in_memory_desk(&bus);

    let in_review = desk
        .proposals
        .create_proposal("Ana Costa", Decimal::from(50_000))
        .await
        .unwrap();
    let rejected = desk
        .proposals
        .create_proposal("Bruno Lima", Decimal::from(20_000))
        .await
        .unwrap();
    desk.proposals
        .set_proposal_status(rejected.id(), ProposalStatus::Rejected)
        .await
        .unwrap();

    let mut receiver = bus.subscribe();

    for (id, expected) in [
        (in_review.id(), ProposalStatus::InReview),
        (rejected.id(), ProposalStatus::Rejected),
    ] {
        match desk.contracting.contract_proposal(id).await {
            Err(ServiceError::InvalidState { status, .. }) => assert_eq!(status, expected),
            other => panic!("expected InvalidState, got {:?}", other),
        }
    }

    assert!(contracts.is_empty());
    assert!(matches!(receiver.try_recv(), Err(EventBusError::Empty)));
}

#[tokio::test]
async fn test_unknown_proposal_is_not_found() {
    let bus = EventBus::new(16);
    let (desk, contracts) = in_memory_desk(&bus);

    let result = desk.contracting.contract_proposal(ProposalId::new()).await;

    assert!(matches!(result, Err(ServiceError::NotFound(_))));
    assert!(contracts.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_converge_on_one_contract() {
    let publisher = Arc::new(RecordingPublisher::default());
    let contracts = InMemoryContractRepository::new();
    let desk = desk_with(
        Arc::new(InMemoryProposalRepository::new()),
        Arc::new(contracts.clone()),
        publisher.clone(),
    );
    let id = approved_proposal(&desk, "Ana Costa").await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let contracting = desk.contracting.clone();
            tokio::spawn(async move { contracting.contract_proposal(id).await })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    let fresh = results.iter().filter(|r| !r.already_existed).count();
    assert_eq!(fresh, 1);
    let number = &results[0].contract.contract_number;
    assert!(results.iter().all(|r| &r.contract.contract_number == number));
    assert_eq!(contracts.len(), 1);

    // InReview -> Approved, then Approved -> Contracted once
    let events = publisher.events.lock();
    let contracted: Vec<_> = events.iter().filter(|e| e["newStatus"] == "Contracted").collect();
    assert_eq!(contracted.len(), 1);
    assert_eq!(
        desk.proposals.get_proposal(id).await.unwrap().status(),
        ProposalStatus::Contracted
    );
}

#[tokio::test]
async fn test_insert_conflict_takes_idempotent_path() {
    let proposal_repo = Arc::new(InMemoryProposalRepository::new());
    let inner = InMemoryContractRepository::new();
    let contract_repo = Arc::new(StaleReadContractRepository {
        inner: inner.clone(),
        lookups: AtomicUsize::new(0),
    });
    let publisher = Arc::new(RecordingPublisher::default());

    let mut proposal = Proposal::new("Ana Costa", Decimal::from(50_000)).unwrap();
    proposal.approve(TransitionPolicy::Permissive).unwrap();
    proposal_repo.insert(&proposal).await.unwrap();

    // Another writer already issued the contract
    let existing = Contract::issue(proposal.id());
    inner.insert(&existing).await.unwrap();

    let contracting = StandardContractingService::new(
        proposal_repo.clone(),
        contract_repo,
        Arc::new(StatusEventNotifier::with_default_topic(publisher.clone())),
    );
    let issuance = contracting.contract_proposal(proposal.id()).await.unwrap();

    assert!(issuance.already_existed);
    assert_eq!(issuance.contract, existing);
    assert_eq!(issuance.proposal.status(), ProposalStatus::Contracted);
    // Replay reports the proposal as stored, not the snapshot read before the insert
    let stored = proposal_repo.find_by_id(proposal.id()).await.unwrap().unwrap();
    assert_eq!(issuance.proposal, stored);
    assert!(publisher.events.lock().is_empty());
    assert_eq!(inner.len(), 1);
}

#[tokio::test]
async fn test_publish_failure_keeps_contract() {
    let contracts = InMemoryContractRepository::new();
    let desk = desk_with(
        Arc::new(InMemoryProposalRepository::new()),
        Arc::new(contracts.clone()),
        Arc::new(BrokenPublisher),
    );
    let id = approved_proposal(&desk, "Ana Costa").await;

    let issuance = desk.contracting.contract_proposal(id).await.unwrap();
    assert!(!issuance.already_existed);
    assert!(issuance.notification.is_degraded());
    assert_eq!(contracts.len(), 1);

    let replay = desk.contracting.contract_proposal(id).await.unwrap();
    assert!(replay.already_existed);
    assert_eq!(replay.contract, issuance.contract);
    assert_eq!(replay.notification, NotificationOutcome::NotRequired);
}

#[tokio::test]
async fn test_failed_status_write_leaves_no_contract() {
    let proposal_repo = Arc::new(FlakyProposalRepository {
        inner: InMemoryProposalRepository::new(),
        fail_next_update: AtomicBool::new(false),
    });
    let contracts = InMemoryContractRepository::new();
    let publisher = Arc::new(RecordingPublisher::default());
    let desk = desk_with(proposal_repo.clone(), Arc::new(contracts.clone()), publisher.clone());
    let id = approved_proposal(&desk, "Ana Costa").await;
    publisher.events.lock().clear();

    proposal_repo.fail_next_update.store(true, Ordering::SeqCst);
    let result = desk.contracting.contract_proposal(id).await;
    assert!(matches!(result, Err(ServiceError::Repository(RepositoryError::Database(_)))));

    // Status write failed before any contract was stored
    assert!(contracts.is_empty());
    assert_eq!(desk.proposals.get_proposal(id).await.unwrap().status(), ProposalStatus::Approved);
    assert!(publisher.events.lock().is_empty());

    let retry = desk.contracting.contract_proposal(id).await.unwrap();
    assert!(!retry.already_existed);
    assert_eq!(retry.proposal.status(), ProposalStatus::Contracted);
    assert_eq!(contracts.len(), 1);
    assert_eq!(publisher.events.lock().len(), 1);
}

#[tokio::test]
async fn test_failed_contract_insert_is_completed_on_retry() {
    let contract_repo = Arc::new(FlakyContractRepository {
        inner: InMemoryContractRepository::new(),
        fail_next_insert: AtomicBool::new(false),
    });
    let publisher = Arc::new(RecordingPublisher::default());
    let desk = desk_with(
        Arc::new(InMemoryProposalRepository::new()),
        contract_repo.clone(),
        publisher.clone(),
    );
    let id = approved_proposal(&desk, "Ana Costa").await;
    publisher.events.lock().clear();

    contract_repo.fail_next_insert.store(true, Ordering::SeqCst);
    let result = desk.contracting.contract_proposal(id).await;
    assert!(matches!(result, Err(ServiceError::Repository(RepositoryError::Database(_)))));

    // Claimed but not yet issued
    assert_eq!(desk.proposals.get_proposal(id).await.unwrap().status(), ProposalStatus::Contracted);
    assert!(contract_repo.inner.is_empty());
    assert!(publisher.events.lock().is_empty());

    let check = desk.contracting.check_status(id).await.unwrap();
    assert_eq!(check.already_existed, Some(false));
    assert!(check.contract.is_some());
    assert_eq!(contract_repo.inner.len(), 1);

    let events = publisher.events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["previousStatus"], "Approved");
    assert_eq!(events[0]["newStatus"], "Contracted");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reject_racing_contracting_is_refused() {
    let (desk, contracts, publisher) = delayed_desk(ProposalStatus::Rejected);
    let id = approved_proposal(&desk, "Ana Costa").await;
    publisher.events.lock().clear();

    let proposals = desk.proposals.clone();
    let reject = tokio::spawn(async move { proposals.set_proposal_status(id, ProposalStatus::Rejected).await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let issuance = desk.contracting.contract_proposal(id).await.unwrap();
    assert!(!issuance.already_existed);

    match reject.await.unwrap() {
        Err(ServiceError::IllegalTransition { from, to }) => {
            assert_eq!(from, ProposalStatus::Contracted);
            assert_eq!(to, ProposalStatus::Rejected);
        }
        other => panic!("expected IllegalTransition, got {:?}", other),
    }

    assert_eq!(desk.proposals.get_proposal(id).await.unwrap().status(), ProposalStatus::Contracted);
    assert_eq!(contracts.len(), 1);
    let events = publisher.events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["newStatus"], "Contracted");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_contracting_racing_reject_issues_nothing() {
    let (desk, contracts, publisher) = delayed_desk(ProposalStatus::Contracted);
    let id = approved_proposal(&desk, "Ana Costa").await;
    publisher.events.lock().clear();

    let contracting = desk.contracting.clone();
    let issue = tokio::spawn(async move { contracting.contract_proposal(id).await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let rejected = desk
        .proposals
        .set_proposal_status(id, ProposalStatus::Rejected)
        .await
        .unwrap();
    assert_eq!(rejected.proposal.status(), ProposalStatus::Rejected);

    match issue.await.unwrap() {
        Err(ServiceError::InvalidState { status, .. }) => assert_eq!(status, ProposalStatus::Rejected),
        other => panic!("expected InvalidState, got {:?}", other),
    }

    assert_eq!(desk.proposals.get_proposal(id).await.unwrap().status(), ProposalStatus::Rejected);
    assert!(contracts.is_empty());
    let events = publisher.events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["newStatus"], "Rejected");
}

#[tokio::test]
async fn test_contracted_proposal_rejects_generic_status_changes() {
    let bus = EventBus::new(16);
    let (desk, _) = in_memory_desk(&bus);
    let id = approved_proposal(&desk, "Ana Costa").await;
    desk.contracting.contract_proposal(id).await.unwrap();

    for target in ProposalStatus::ALL {
        match desk.proposals.set_proposal_status(id, target).await {
            Err(ServiceError::IllegalTransition { from, to }) => {
                assert_eq!(from, ProposalStatus::Contracted);
                assert_eq!(to, target);
            }
            other => panic!("expected IllegalTransition, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_check_status_contracts_only_approved_proposals() {
    let bus = EventBus::new(16);
    let (desk, contracts) = in_memory_desk(&bus);

    let pending = desk
        .proposals
        .create_proposal("Carla Dias", Decimal::from_str("1234.56").unwrap())
        .await
        .unwrap();
    let check = desk.contracting.check_status(pending.id()).await.unwrap();
    assert_eq!(check.proposal.status(), ProposalStatus::InReview);
    assert!(check.contract.is_none());
    assert!(contracts.is_empty());

    let id = approved_proposal(&desk, "Ana Costa").await;
    let check = desk.contracting.check_status(id).await.unwrap();
    assert_eq!(check.proposal.status(), ProposalStatus::Contracted);
    assert_eq!(check.already_existed, Some(false));

    let again = desk.contracting.check_status(id).await.unwrap();
    assert_eq!(again.already_existed, Some(true));
    assert_eq!(again.contract, check.contract);

    let contract = desk.contracting.get_contract(id).await.unwrap();
    assert_eq!(Some(contract), check.contract);
    assert!(matches!(
        desk.contracting.get_contract(pending.id()).await,
        Err(ServiceError::ContractNotFound(_))
    ));
}
