//! The unit of work: entity-set registration, the shared command queue and commit.
//!
//! A [`UnitOfWork`] owns a store backend, one [`CommandQueue`] and a user-defined
//! group of entity sets `S`. The group is built exactly once, at construction,
//! through [`EntitySets::register`]; after that the slot registry never changes.
//!
//! ```ignore
//! use docwork::prelude::*;
//!
//! #[derive(EntitySets)]
//! struct Shop {
//!     customers: EntitySet<Customer>,
//!     #[entity_set(collection = "order_lines")]
//!     lines: EntitySet<OrderLine>,
//! }
//!
//! let uow = UnitOfWork::builder(InMemoryStore::new())
//!     .use_transactions(true)
//!     .build::<Shop>()?;
//!
//! uow.customers.insert(&customer, InsertOptions::new()).await?;
//! uow.commit().await?;
//! ```

use mea::{mutex::Mutex, rwlock::RwLock};
use std::{
    fmt,
    ops::Deref,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::{
    backend::{StoreBackend, StoreBackendBuilder},
    cancel::{AbortRegistration, cancellable},
    command::{Command, WriteTarget},
    document::Document,
    entity_set::{EntitySet, TrackedSet},
    error::{DocumentStoreError, DocumentStoreResult},
    queue::{CommandQueue, SharedQueue},
};

/// A group of entity sets that can be registered on a unit of work.
///
/// Usually derived with `#[derive(EntitySets)]`, which registers every named field
/// of type `EntitySet<D>` under the field's name.
pub trait EntitySets: Sized {
    /// Creates every entity set of the group through `registry`.
    fn register(registry: &mut SetRegistry) -> DocumentStoreResult<Self>;
}

impl EntitySets for () {
    fn register(_: &mut SetRegistry) -> DocumentStoreResult<Self> {
        Ok(())
    }
}

/// Hands out entity sets bound to one unit of work's backend and queue.
///
/// Only available while the unit of work is being constructed.
pub struct SetRegistry {
    backend: Arc<dyn StoreBackend>,
    queue: SharedQueue,
    slots: Vec<(String, Box<dyn TrackedSet>)>,
}

impl SetRegistry {
    fn new(backend: Arc<dyn StoreBackend>, queue: SharedQueue) -> Self {
        Self { backend, queue, slots: Vec::new() }
    }

    /// Registers an entity set under `slot`, using the slot name as the collection name.
    pub fn register<D: Document>(&mut self, slot: &str) -> DocumentStoreResult<EntitySet<D>> {
        self.register_as(slot, slot)
    }

    /// Registers an entity set under `slot` bound to `collection`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DuplicateEntitySet`] if `slot` is taken.
    pub fn register_as<D: Document>(
        &mut self,
        slot: &str,
        collection: &str,
    ) -> DocumentStoreResult<EntitySet<D>> {
        if self.slots.iter().any(|(name, _)| name == slot) {
            return Err(DocumentStoreError::DuplicateEntitySet(slot.to_string()));
        }

        let set = EntitySet::new(collection, Arc::clone(&self.backend), Arc::clone(&self.queue));
        self.slots.push((slot.to_string(), Box::new(set.clone())));

        Ok(set)
    }
}

/// Lifecycle of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfWorkState {
    /// Accepting reads and writes.
    Open,
    /// Draining the command queue.
    Committing,
    /// The last commit failed or was cancelled; the queue holds every command that
    /// was not applied.
    Faulted,
}

/// Tracks writes across a group of entity sets and flushes them in order on commit.
///
/// `S` is reachable through `Deref`, so entity sets are used as `uow.customers`.
pub struct UnitOfWork<S = ()> {
    backend: Arc<dyn StoreBackend>,
    queue: SharedQueue,
    sets: S,
    slots: Vec<(String, Box<dyn TrackedSet>)>,
    use_transactions: bool,
    state: RwLock<UnitOfWorkState>,
    commit_lock: Mutex<()>,
}

impl UnitOfWork<()> {
    /// Starts building a unit of work over `backend`.
    pub fn builder<B: StoreBackend + 'static>(backend: B) -> UnitOfWorkBuilder {
        UnitOfWorkBuilder::new(Arc::new(backend))
    }
}

impl<S: EntitySets> UnitOfWork<S> {
    /// Creates a unit of work over a shared backend and registers the sets of `S`.
    pub fn new(backend: Arc<dyn StoreBackend>, use_transactions: bool) -> DocumentStoreResult<Self> {
        let queue = CommandQueue::shared();
        let mut registry = SetRegistry::new(Arc::clone(&backend), Arc::clone(&queue));
        let sets = S::register(&mut registry)?;

        debug!(
            slots = registry.slots.len(),
            use_transactions,
            "unit of work created"
        );

        Ok(Self {
            backend,
            queue,
            sets,
            slots: registry.slots,
            use_transactions,
            state: RwLock::new(UnitOfWorkState::Open),
            commit_lock: Mutex::new(()),
        })
    }

    /// Builds the backend with `builder` and creates a unit of work over it.
    pub async fn from_builder<B>(builder: B, use_transactions: bool) -> DocumentStoreResult<Self>
    where
        B: StoreBackendBuilder,
        B::Backend: 'static,
    {
        let backend = builder.build().await?;
        Self::new(Arc::new(backend), use_transactions)
    }

    /// Returns the entity sets of this unit of work.
    pub fn sets(&self) -> &S {
        &self.sets
    }

    /// Looks up the entity set registered under `slot`.
    ///
    /// Returns `None` if no set is registered there or its entity type is not `D`.
    pub fn entity_set<D: Document>(&self, slot: &str) -> Option<&EntitySet<D>> {
        self.slots
            .iter()
            .find(|(name, _)| name == slot)
            .and_then(|(_, set)| set.as_any().downcast_ref::<EntitySet<D>>())
    }

    /// Returns `(slot, collection)` for every registered entity set, in
    /// registration order.
    pub fn slots(&self) -> impl Iterator<Item = (&str, &str)> {
        self.slots
            .iter()
            .map(|(slot, set)| (slot.as_str(), set.collection_name()))
    }

    pub fn uses_transactions(&self) -> bool {
        self.use_transactions
    }

    pub fn backend(&self) -> &Arc<dyn StoreBackend> {
        &self.backend
    }

    pub async fn state(&self) -> UnitOfWorkState {
        *self.state.read().await
    }

    /// Clones the queued commands in execution order.
    pub async fn pending_commands(&self) -> Vec<Command> {
        self.queue.lock().await.snapshot()
    }

    /// Whether any command is queued or any entity is tracked as modified.
    pub async fn has_pending_changes(&self) -> bool {
        if self.queue.lock().await.has_next() {
            return true;
        }
        for (_, set) in &self.slots {
            if set.modified_count().await > 0 {
                return true;
            }
        }
        false
    }

    /// Drops every queued command and every modified registry entry, returning the
    /// discarded commands. The unit of work is `Open` afterwards.
    pub async fn discard_pending(&self) -> Vec<Command> {
        let _commit = self.commit_lock.lock().await;
        let discarded = self.queue.lock().await.clear();
        self.clear_modified().await;
        *self.state.write().await = UnitOfWorkState::Open;

        info!(discarded = discarded.len(), "discarded pending commands");
        discarded
    }

    /// Executes every queued command in order, then clears every modified registry.
    ///
    /// Commands run one at a time; each is awaited before the next starts. With
    /// transactions enabled the commands queued when the commit starts run inside
    /// one store session that is committed only if every one of them succeeded.
    ///
    /// # Errors
    ///
    /// On the first failing command the drain stops and the unit of work becomes
    /// [`UnitOfWorkState::Faulted`]. Nothing is retried until `commit` is called
    /// again.
    ///
    /// - without transactions the error is
    ///   [`StoreOperationFailed`](DocumentStoreError::StoreOperationFailed); the
    ///   commands before the failed one are applied and dequeued, the failed one
    ///   and every later one stay queued;
    /// - with transactions it is [`CommitAborted`](DocumentStoreError::CommitAborted)
    ///   wrapping that failure, the transaction is aborted and the whole batch
    ///   stays queued.
    pub async fn commit(&self) -> DocumentStoreResult<()> {
        let _commit = self.commit_lock.lock().await;
        self.commit_locked().await
    }

    /// Like [`commit`](Self::commit), but stops as soon as `registration`'s handle
    /// is aborted.
    ///
    /// The command in flight at that point and every later one stay queued, an open
    /// transaction is dropped uncommitted and the unit of work becomes `Faulted`.
    /// A call aborted while still waiting behind another commit changes nothing.
    pub async fn commit_with_cancellation(
        &self,
        registration: AbortRegistration,
    ) -> DocumentStoreResult<()> {
        let started = AtomicBool::new(false);
        let result = cancellable(registration, async {
            let _commit = self.commit_lock.lock().await;
            started.store(true, Ordering::Release);
            self.commit_locked().await
        })
        .await;

        if let Err(DocumentStoreError::Cancelled) = result {
            if started.load(Ordering::Acquire) {
                *self.state.write().await = UnitOfWorkState::Faulted;
                warn!("commit cancelled");
            } else {
                debug!("commit cancelled before it started");
            }
        }

        result
    }

    /// Releases the backend's resources.
    pub async fn shutdown(&self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await
    }

    async fn commit_locked(&self) -> DocumentStoreResult<()> {
        let pending = self.queue.lock().await.len();
        let span = info_span!(
            "commit",
            pending,
            transactional = self.use_transactions
        );

        self.flush().instrument(span).await
    }

    async fn flush(&self) -> DocumentStoreResult<()> {
        *self.state.write().await = UnitOfWorkState::Committing;

        let result = if self.use_transactions {
            self.commit_transactional().await
        } else {
            self.drain().await
        };

        match result {
            Ok(()) => {
                self.clear_modified().await;
                *self.state.write().await = UnitOfWorkState::Open;
                info!("commit complete");
                Ok(())
            }
            Err(err) => {
                *self.state.write().await = UnitOfWorkState::Faulted;
                warn!(error = %err, "commit failed");
                Err(err)
            }
        }
    }

    /// Runs the queued batch inside one session. The batch leaves the queue only
    /// once the session has committed.
    async fn commit_transactional(&self) -> DocumentStoreResult<()> {
        let batch = self.queue.lock().await.snapshot();
        if batch.is_empty() {
            return Ok(());
        }

        let count = batch.len();
        let mut session = self.backend.start_session().await?;
        let executed = Self::execute_batch(batch, &mut WriteTarget::Session(session.as_mut())).await;

        if let Err(err) = executed {
            if let Err(abort_err) = session.abort_transaction().await {
                warn!(error = %abort_err, "failed to abort transaction");
            }
            return Err(DocumentStoreError::CommitAborted { source: Box::new(err) });
        }

        // Held across the commit so the batch is dequeued without another await.
        let mut queue = self.queue.lock().await;
        session.commit_transaction().await?;
        queue.take_front(count);

        Ok(())
    }

    async fn execute_batch(batch: Vec<Command>, target: &mut WriteTarget<'_>) -> DocumentStoreResult<()> {
        for command in batch {
            trace_command(&command);
            command.execute(target).await?;
        }

        Ok(())
    }

    /// Runs queued commands against the store until the queue is empty or one
    /// fails. The queue stays locked while a command runs, so a command is
    /// dequeued in the same step that observes its success.
    async fn drain(&self) -> DocumentStoreResult<()> {
        let mut target = WriteTarget::Store(self.backend.as_ref());

        loop {
            let mut queue = self.queue.lock().await;
            let Some(command) = queue.peek().cloned() else {
                return Ok(());
            };

            trace_command(&command);
            command.execute(&mut target).await?;
            queue.take_next();
        }
    }

    async fn clear_modified(&self) {
        for (_, set) in &self.slots {
            set.clear_modified().await;
        }
    }
}

fn trace_command(command: &Command) {
    debug!(
        entity_type = command.entity_type(),
        collection = command.collection(),
        operation = %command.kind(),
        id = %command.operation().id(),
        "executing command"
    );
}

impl<S> Deref for UnitOfWork<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.sets
    }
}

impl<S: fmt::Debug> fmt::Debug for UnitOfWork<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("backend", &self.backend)
            .field("sets", &self.sets)
            .field("use_transactions", &self.use_transactions)
            .finish_non_exhaustive()
    }
}

/// Builder for [`UnitOfWork`].
#[derive(Debug)]
pub struct UnitOfWorkBuilder {
    backend: Arc<dyn StoreBackend>,
    use_transactions: bool,
}

impl UnitOfWorkBuilder {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend, use_transactions: false }
    }

    /// Wraps each commit in a store transaction. Off by default.
    pub fn use_transactions(mut self, use_transactions: bool) -> Self {
        self.use_transactions = use_transactions;
        self
    }

    pub fn build<S: EntitySets>(self) -> DocumentStoreResult<UnitOfWork<S>> {
        UnitOfWork::new(self.backend, self.use_transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cancel::AbortHandle,
        command::OperationKind,
        options::{DeleteOptions, InsertOptions, ReplaceOptions},
        testing::{Note, RecordingStore},
    };
    use bson::Uuid;
    use std::time::Duration;

    #[derive(Debug)]
    struct Journal {
        notes: EntitySet<Note>,
        archive: EntitySet<Note>,
    }

    impl EntitySets for Journal {
        fn register(registry: &mut SetRegistry) -> DocumentStoreResult<Self> {
            Ok(Self {
                notes: registry.register("notes")?,
                archive: registry.register_as("archive", "archived_notes")?,
            })
        }
    }

    fn journal(store: &RecordingStore, use_transactions: bool) -> UnitOfWork<Journal> {
        UnitOfWork::builder(store.clone())
            .use_transactions(use_transactions)
            .build()
            .unwrap()
    }

    async fn insert_notes(uow: &UnitOfWork<Journal>, count: usize) -> Vec<Uuid> {
        let mut ids = Vec::new();
        for n in 0..count {
            let note = Note::new(&format!("note {n}"));
            uow.notes.insert(&note, InsertOptions::new()).await.unwrap();
            ids.push(note.id);
        }
        ids
    }

    #[tokio::test]
    async fn commit_applies_commands_in_order_and_clears_modified() {
        let store = RecordingStore::new();
        let uow = journal(&store, false);
        let mut note = Note::new("draft");
        let stale = Uuid::new();

        uow.notes.insert(&note, InsertOptions::new()).await.unwrap();
        note.text = "final".to_string();
        uow.notes.update(note.id, &note, ReplaceOptions::new()).await.unwrap();
        uow.archive.remove(stale, DeleteOptions::new()).await;
        assert!(uow.has_pending_changes().await);

        uow.commit().await.unwrap();

        assert_eq!(
            store.writes().await,
            vec![
                (OperationKind::Insert, "notes".to_string(), note.id),
                (OperationKind::Update, "notes".to_string(), note.id),
                (OperationKind::Remove, "archived_notes".to_string(), stale),
            ]
        );
        assert!(uow.notes.list_modified().await.is_empty());
        assert!(uow.pending_commands().await.is_empty());
        assert!(!uow.has_pending_changes().await);
        assert_eq!(uow.state().await, UnitOfWorkState::Open);
    }

    #[tokio::test]
    async fn failed_command_stops_the_drain_and_stays_queued() {
        let store = RecordingStore::failing_at(2);
        let uow = journal(&store, false);
        let ids = insert_notes(&uow, 5).await;

        let err = uow.commit().await.unwrap_err();

        match &err {
            DocumentStoreError::StoreOperationFailed { operation, collection, id, .. } => {
                assert_eq!(*operation, OperationKind::Insert);
                assert_eq!(collection, "notes");
                assert_eq!(id, &ids[2].to_string());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.writes().await.len(), 2);
        assert_eq!(uow.state().await, UnitOfWorkState::Faulted);

        let remaining = uow
            .pending_commands()
            .await
            .iter()
            .map(|command| *command.operation().id())
            .collect::<Vec<_>>();
        assert_eq!(remaining, ids[2..].to_vec());
        assert_eq!(uow.notes.list_modified().await.len(), 5);

        uow.commit().await.unwrap();

        let written = store
            .writes()
            .await
            .into_iter()
            .map(|(_, _, id)| id)
            .collect::<Vec<_>>();
        assert_eq!(written, ids);
        assert_eq!(uow.state().await, UnitOfWorkState::Open);
    }

    #[tokio::test]
    async fn transactional_failure_keeps_the_whole_batch_queued() {
        let store = RecordingStore::failing_at(2);
        let uow = journal(&store, true);
        let ids = insert_notes(&uow, 3).await;

        let err = uow.commit().await.unwrap_err();

        assert!(matches!(err, DocumentStoreError::CommitAborted { .. }));
        assert!(matches!(err.root_cause(), DocumentStoreError::Backend(_)));
        assert!(store.writes().await.is_empty());
        assert_eq!(store.commits().await, 0);
        assert_eq!(uow.state().await, UnitOfWorkState::Faulted);

        let pending = uow
            .pending_commands()
            .await
            .iter()
            .map(|command| *command.operation().id())
            .collect::<Vec<_>>();
        assert_eq!(pending, ids);

        uow.commit().await.unwrap();

        let written = store
            .writes()
            .await
            .into_iter()
            .map(|(_, _, id)| id)
            .collect::<Vec<_>>();
        assert_eq!(written, ids);
        assert_eq!(store.commits().await, 1);
        assert!(uow.pending_commands().await.is_empty());
    }

    #[tokio::test]
    async fn failed_session_commit_keeps_the_batch_queued() {
        let store = RecordingStore::failing_commit();
        let uow = journal(&store, true);
        insert_notes(&uow, 3).await;

        let err = uow.commit().await.unwrap_err();

        assert!(matches!(err, DocumentStoreError::Backend(_)));
        assert!(store.writes().await.is_empty());
        assert_eq!(uow.pending_commands().await.len(), 3);
        assert_eq!(uow.state().await, UnitOfWorkState::Faulted);
    }

    #[tokio::test]
    async fn transactional_commit_applies_everything_once() {
        let store = RecordingStore::new();
        let uow = journal(&store, true);
        insert_notes(&uow, 3).await;

        uow.commit().await.unwrap();

        assert_eq!(store.writes().await.len(), 3);
        assert_eq!(store.commits().await, 1);
        assert!(uow.uses_transactions());
    }

    #[tokio::test]
    async fn commit_on_empty_queue_is_a_no_op() {
        let store = RecordingStore::new();
        let uow = journal(&store, false);

        uow.commit().await.unwrap();

        assert!(store.writes().await.is_empty());
        assert_eq!(uow.state().await, UnitOfWorkState::Open);
    }

    #[tokio::test]
    async fn discard_pending_empties_queue_and_registries() {
        let store = RecordingStore::failing_at(0);
        let uow = journal(&store, false);
        insert_notes(&uow, 2).await;
        uow.commit().await.unwrap_err();

        let discarded = uow.discard_pending().await;

        assert_eq!(discarded.len(), 2);
        assert!(!uow.has_pending_changes().await);
        assert_eq!(uow.state().await, UnitOfWorkState::Open);
    }

    #[test]
    fn duplicate_slot_is_rejected() {
        #[derive(Debug)]
        struct Twice {
            _first: EntitySet<Note>,
            _second: EntitySet<Note>,
        }

        impl EntitySets for Twice {
            fn register(registry: &mut SetRegistry) -> DocumentStoreResult<Self> {
                Ok(Self {
                    _first: registry.register("notes")?,
                    _second: registry.register_as("notes", "other")?,
                })
            }
        }

        let result = UnitOfWork::builder(RecordingStore::new()).build::<Twice>();

        assert!(matches!(
            result,
            Err(DocumentStoreError::DuplicateEntitySet(slot)) if slot == "notes"
        ));
    }

    #[test]
    fn slots_are_looked_up_by_name() {
        let uow = journal(&RecordingStore::new(), false);

        assert_eq!(
            uow.slots().collect::<Vec<_>>(),
            vec![("notes", "notes"), ("archive", "archived_notes")]
        );
        assert_eq!(
            uow.entity_set::<Note>("archive").map(EntitySet::collection_name),
            Some("archived_notes")
        );
        assert!(uow.entity_set::<Note>("missing").is_none());
    }

    #[tokio::test]
    async fn commit_aborted_before_it_starts_leaves_everything_untouched() {
        let store = RecordingStore::new();
        let uow = journal(&store, false);
        insert_notes(&uow, 2).await;
        let (handle, registration) = AbortHandle::new_pair();
        handle.abort();

        let result = uow.commit_with_cancellation(registration).await;

        assert!(matches!(result, Err(DocumentStoreError::Cancelled)));
        assert!(store.writes().await.is_empty());
        assert_eq!(uow.pending_commands().await.len(), 2);
        assert_eq!(uow.state().await, UnitOfWorkState::Open);
    }

    #[tokio::test]
    async fn cancellation_mid_drain_keeps_in_flight_and_later_commands() {
        let store = RecordingStore::stalling_at(1);
        let uow = journal(&store, false);
        let ids = insert_notes(&uow, 3).await;
        let (handle, registration) = AbortHandle::new_pair();

        let (result, _) = tokio::join!(uow.commit_with_cancellation(registration), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.abort();
        });

        assert!(matches!(result, Err(DocumentStoreError::Cancelled)));
        assert_eq!(store.writes().await.len(), 1);

        let remaining = uow
            .pending_commands()
            .await
            .iter()
            .map(|command| *command.operation().id())
            .collect::<Vec<_>>();
        assert_eq!(remaining, ids[1..].to_vec());
        assert_eq!(uow.state().await, UnitOfWorkState::Faulted);
    }

    #[tokio::test]
    async fn cancelled_transactional_commit_is_not_committed() {
        let store = RecordingStore::stalling_at(1);
        let uow = journal(&store, true);
        insert_notes(&uow, 2).await;
        let (handle, registration) = AbortHandle::new_pair();

        let (result, _) = tokio::join!(uow.commit_with_cancellation(registration), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.abort();
        });

        assert!(matches!(result, Err(DocumentStoreError::Cancelled)));
        assert!(store.writes().await.is_empty());
        assert_eq!(store.commits().await, 0);
    }

    #[tokio::test]
    async fn applied_command_is_not_replayed_after_cancellation() {
        let (store, gate) = RecordingStore::gated_at(0);
        let uow = journal(&store, false);
        let ids = insert_notes(&uow, 1).await;
        let (handle, registration) = AbortHandle::new_pair();

        let (result, _, _) = tokio::join!(
            uow.commit_with_cancellation(registration),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                let held = uow.queue.lock().await;
                tokio::time::sleep(Duration::from_millis(20)).await;
                drop(held);
            },
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                gate.notify_one();
                tokio::time::sleep(Duration::from_millis(5)).await;
                handle.abort();
            },
        );

        assert!(matches!(result, Ok(()) | Err(DocumentStoreError::Cancelled)));
        assert!(uow.pending_commands().await.is_empty());

        uow.commit().await.unwrap();

        let written = store
            .writes()
            .await
            .into_iter()
            .map(|(_, _, id)| id)
            .collect::<Vec<_>>();
        assert_eq!(written, ids);
        assert_eq!(uow.state().await, UnitOfWorkState::Open);
    }

    #[tokio::test]
    async fn cancelling_a_commit_still_waiting_to_start_changes_nothing() {
        let store = RecordingStore::stalling_at(0);
        let uow = journal(&store, false);
        insert_notes(&uow, 1).await;
        let (first_handle, first_registration) = AbortHandle::new_pair();
        let (waiting_handle, waiting_registration) = AbortHandle::new_pair();

        let (first, waiting, _) = tokio::join!(
            uow.commit_with_cancellation(first_registration),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                uow.commit_with_cancellation(waiting_registration).await
            },
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                waiting_handle.abort();
                tokio::time::sleep(Duration::from_millis(10)).await;
                assert_eq!(uow.state().await, UnitOfWorkState::Committing);
                first_handle.abort();
            },
        );

        assert!(matches!(waiting, Err(DocumentStoreError::Cancelled)));
        assert!(matches!(first, Err(DocumentStoreError::Cancelled)));
        assert_eq!(uow.state().await, UnitOfWorkState::Faulted);
        assert_eq!(uow.pending_commands().await.len(), 1);
    }
}
