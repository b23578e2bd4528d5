//! Label generator integration tests
//!
//! Drive the full generation loop against an in-memory corpus store and
//! scripted reasoning services: happy path, idempotence, dry run,
//! clear-existing, partial batches, and retry behavior.

use async_trait::async_trait;
use mailsift_core::{
    CorpusStore, Error, LabelAssignment, LabelSource, LabelWrite, Message, MessageId, NewMessage,
    Result, Taxonomy,
};
use mailsift_labeler::{LabelGenerator, LabelerOptions, ReasoningService, RetryPolicy};
use mailsift_store::SqliteStore;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn taxonomy() -> Arc<Taxonomy> {
    Arc::new(Taxonomy::personal_inbox())
}

fn seeded_store(n: usize) -> SqliteStore {
    let store = SqliteStore::in_memory(taxonomy()).unwrap();
    for i in 0..n {
        store
            .insert_message(&NewMessage {
                account: "me@example.com".into(),
                provider_id: format!("m{i}"),
                thread_id: String::new(),
                internal_date: i as i64,
                from_addr: "news@example.com".into(),
                to_addr: "me@example.com".into(),
                subject: format!("subject {i}"),
                snippet: String::new(),
                body: "50% off everything".into(),
                provider_labels: Vec::new(),
            })
            .unwrap();
    }
    store
}

/// Extract the batch's message ids from the user message ("Email ID: N")
fn ids_in_prompt(user_message: &str) -> Vec<i64> {
    user_message
        .lines()
        .filter_map(|line| line.strip_prefix("Email ID: "))
        .filter_map(|raw| raw.trim().parse().ok())
        .collect()
}

/// Labels every message in the batch with a fixed category, optionally
/// skipping some entries or emitting an unknown category for others.
struct EchoService {
    calls: AtomicUsize,
    skip_first_of_batch: bool,
    unknown_category_for_first: bool,
    omit_confidence: bool,
}

impl EchoService {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            skip_first_of_batch: false,
            unknown_category_for_first: false,
            omit_confidence: false,
        }
    }
}

#[async_trait]
impl ReasoningService for EchoService {
    async fn complete(&self, _system: &str, user_message: &str) -> mailsift_core::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let ids = ids_in_prompt(user_message);
        let entries: Vec<String> = ids
            .iter()
            .enumerate()
            .filter(|(i, _)| !(self.skip_first_of_batch && *i == 0))
            .map(|(i, id)| {
                let label = if self.unknown_category_for_first && i == 0 {
                    "not_a_real_category"
                } else {
                    "marketing_promo"
                };
                if self.omit_confidence {
                    format!(r#"{{"id": {id}, "label": "{label}"}}"#)
                } else {
                    format!(r#"{{"id": {id}, "label": "{label}", "confidence": 0.92}}"#)
                }
            })
            .collect();
        Ok(format!("[{}]", entries.join(", ")))
    }
}

/// Fails with a retryable error `failures` times, then behaves like Echo.
struct FlakyService {
    inner: EchoService,
    failures: usize,
    attempts: AtomicUsize,
}

#[async_trait]
impl ReasoningService for FlakyService {
    async fn complete(&self, system: &str, user_message: &str) -> mailsift_core::Result<String> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err(Error::RateLimited);
        }
        self.inner.complete(system, user_message).await
    }
}

/// Always fails with a transient error
struct DownService;

#[async_trait]
impl ReasoningService for DownService {
    async fn complete(&self, _system: &str, _user: &str) -> mailsift_core::Result<String> {
        Err(Error::backend("503 service unavailable"))
    }
}

/// Delegates to a real store but refuses label writes for one message id,
/// as when a message is administratively deleted while a run is in flight.
struct VanishingMessageStore {
    inner: SqliteStore,
    vanished: MessageId,
}

impl CorpusStore for VanishingMessageStore {
    fn insert_message(&self, message: &NewMessage) -> Result<bool> {
        self.inner.insert_message(message)
    }

    fn get_unlabeled_messages(&self, limit: usize) -> Result<Vec<Message>> {
        self.inner.get_unlabeled_messages(limit)
    }

    fn get_labeled_messages(&self) -> Result<Vec<(Message, LabelAssignment)>> {
        self.inner.get_labeled_messages()
    }

    fn upsert_label(
        &self,
        message_id: MessageId,
        category: &str,
        confidence: f32,
        source: LabelSource,
    ) -> Result<LabelWrite> {
        if message_id == self.vanished {
            return Err(Error::validation(format!("no message with id {message_id}")));
        }
        self.inner.upsert_label(message_id, category, confidence, source)
    }

    fn clear_labels(&self, sources: &[LabelSource]) -> Result<usize> {
        self.inner.clear_labels(sources)
    }

    fn label_distribution(&self) -> Result<BTreeMap<String, u64>> {
        self.inner.label_distribution()
    }

    fn message_count(&self) -> Result<u64> {
        self.inner.message_count()
    }

    fn unlabeled_count(&self) -> Result<u64> {
        self.inner.unlabeled_count()
    }
}

fn fast_options() -> LabelerOptions {
    LabelerOptions {
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 2,
            jitter: false,
        },
        ..LabelerOptions::default()
    }
}

fn generator(service: Arc<dyn ReasoningService>, options: LabelerOptions) -> LabelGenerator {
    LabelGenerator::new(service, taxonomy(), options)
}

#[tokio::test]
async fn labels_everything_and_second_run_is_a_noop() {
    let store = seeded_store(12);
    let service = Arc::new(EchoService::new());
    let gen = generator(service.clone(), fast_options());

    let report = gen.run(&store).await.unwrap();
    assert_eq!(report.labeled, 12);
    assert_eq!(report.batches, 2); // batch size 10
    assert_eq!(store.unlabeled_count().unwrap(), 0);

    let labeled = store.get_labeled_messages().unwrap();
    assert_eq!(labeled.len(), 12);
    assert!(labeled.iter().all(|(_, l)| l.source == LabelSource::Llm));
    assert!(labeled
        .iter()
        .all(|(_, l)| (0.0..=1.0).contains(&l.confidence)));

    // Idempotent: nothing left to label, no service calls made
    let calls_before = service.calls.load(Ordering::SeqCst);
    let second = gen.run(&store).await.unwrap();
    assert_eq!(second.labeled, 0);
    assert_eq!(second.batches, 0);
    assert_eq!(service.calls.load(Ordering::SeqCst), calls_before);
}

#[tokio::test]
async fn dry_run_persists_nothing() {
    let store = seeded_store(5);
    let gen = generator(
        Arc::new(EchoService::new()),
        LabelerOptions {
            dry_run: true,
            ..fast_options()
        },
    );

    let report = gen.run(&store).await.unwrap();
    assert_eq!(report.previewed, 5);
    assert_eq!(report.labeled, 0);
    assert_eq!(store.unlabeled_count().unwrap(), 5);
}

#[tokio::test]
async fn dry_run_does_not_clear_existing() {
    let store = seeded_store(2);
    let ids: Vec<_> = store
        .get_unlabeled_messages(usize::MAX)
        .unwrap()
        .iter()
        .map(|m| m.id)
        .collect();
    store
        .upsert_label(ids[0], "personal", 0.9, LabelSource::Llm)
        .unwrap();

    let gen = generator(
        Arc::new(EchoService::new()),
        LabelerOptions {
            dry_run: true,
            clear_existing: true,
            ..fast_options()
        },
    );
    gen.run(&store).await.unwrap();

    // The pre-existing llm label survived the preview run
    assert_eq!(store.get_labeled_messages().unwrap().len(), 1);
}

#[tokio::test]
async fn clear_existing_removes_only_llm_labels() {
    let store = seeded_store(3);
    let ids: Vec<_> = store
        .get_unlabeled_messages(usize::MAX)
        .unwrap()
        .iter()
        .map(|m| m.id)
        .collect();
    store
        .upsert_label(ids[0], "personal", 1.0, LabelSource::Manual)
        .unwrap();
    store
        .upsert_label(ids[1], "travel", 0.8, LabelSource::Llm)
        .unwrap();

    let gen = generator(
        Arc::new(EchoService::new()),
        LabelerOptions {
            clear_existing: true,
            ..fast_options()
        },
    );
    let report = gen.run(&store).await.unwrap();

    // The llm label was cleared and regenerated; the manual one was untouched
    assert_eq!(report.labeled, 2);
    let labeled = store.get_labeled_messages().unwrap();
    assert_eq!(labeled.len(), 3);
    let manual = labeled
        .iter()
        .find(|(m, _)| m.id == ids[0])
        .map(|(_, l)| l)
        .unwrap();
    assert_eq!(manual.source, LabelSource::Manual);
    assert_eq!(manual.category, "personal");
    let regenerated = labeled
        .iter()
        .find(|(m, _)| m.id == ids[1])
        .map(|(_, l)| l)
        .unwrap();
    assert_eq!(regenerated.category, "marketing_promo");
}

#[tokio::test]
async fn partial_batch_response_leaves_exactly_the_missing_message_unlabeled() {
    let store = seeded_store(5);
    let service = EchoService {
        skip_first_of_batch: true,
        ..EchoService::new()
    };
    let gen = generator(Arc::new(service), fast_options());

    let report = gen.run(&store).await.unwrap();
    assert_eq!(report.labeled, 4);
    assert_eq!(report.missing, 1);
    assert_eq!(store.unlabeled_count().unwrap(), 1);

    // The missing one is the first in insertion order
    let still_unlabeled = store.get_unlabeled_messages(usize::MAX).unwrap();
    assert_eq!(still_unlabeled.len(), 1);
    assert_eq!(still_unlabeled[0].subject, "subject 0");
}

#[tokio::test]
async fn unknown_category_leaves_message_unlabeled() {
    let store = seeded_store(3);
    let service = EchoService {
        unknown_category_for_first: true,
        ..EchoService::new()
    };
    let gen = generator(Arc::new(service), fast_options());

    let report = gen.run(&store).await.unwrap();
    assert_eq!(report.labeled, 2);
    assert_eq!(report.rejected, 1);
    assert_eq!(store.unlabeled_count().unwrap(), 1);
}

#[tokio::test]
async fn omitted_confidence_uses_configured_default() {
    let store = seeded_store(1);
    let service = EchoService {
        omit_confidence: true,
        ..EchoService::new()
    };
    let gen = generator(Arc::new(service), fast_options());

    gen.run(&store).await.unwrap();
    let labeled = store.get_labeled_messages().unwrap();
    assert!((labeled[0].1.confidence - 0.8).abs() < 1e-6);
}

#[tokio::test]
async fn transient_failures_are_retried_within_the_batch() {
    let store = seeded_store(4);
    let service = FlakyService {
        inner: EchoService::new(),
        failures: 2,
        attempts: AtomicUsize::new(0),
    };
    let gen = generator(Arc::new(service), fast_options());

    let report = gen.run(&store).await.unwrap();
    assert_eq!(report.labeled, 4);
    assert_eq!(report.failed, 0);
}

#[tokio::test]
async fn exhausted_retries_fail_the_batch_but_not_the_run() {
    let store = seeded_store(15); // two batches at size 10
    let gen = generator(Arc::new(DownService), fast_options());

    let report = gen.run(&store).await.unwrap();
    assert_eq!(report.failed, 15);
    assert_eq!(report.failed_batches, 2);
    assert_eq!(report.batches, 2);
    assert_eq!(report.labeled, 0);
    // Everything is still unlabeled and eligible for a later run
    assert_eq!(store.unlabeled_count().unwrap(), 15);
}

#[tokio::test]
async fn one_refused_write_does_not_abort_the_run() {
    let inner = seeded_store(12);
    let vanished = inner.get_unlabeled_messages(usize::MAX).unwrap()[2].id;
    let store = VanishingMessageStore { inner, vanished };
    let gen = generator(Arc::new(EchoService::new()), fast_options());

    let report = gen.run(&store).await.unwrap();
    // The siblings in batch one and the whole second batch still commit
    assert_eq!(report.labeled, 11);
    assert_eq!(report.write_failed, 1);
    assert_eq!(report.batches, 2);
    assert_eq!(report.failed_batches, 0);
    assert_eq!(store.unlabeled_count().unwrap(), 1);
}

#[tokio::test]
async fn limit_caps_the_run() {
    let store = seeded_store(8);
    let gen = generator(
        Arc::new(EchoService::new()),
        LabelerOptions {
            limit: Some(3),
            ..fast_options()
        },
    );

    let report = gen.run(&store).await.unwrap();
    assert_eq!(report.labeled, 3);
    assert_eq!(store.unlabeled_count().unwrap(), 5);
}
