use crate::batch::{decode_combined, partition, resolve, Batch, Decoded, EncodedBatch};
use crate::counter::TranslationCounter;
use crate::document::TranslationRequest;
use crate::error::{JsonTranslatorError, Result};
use crate::events::ProgressEvent;
use crate::notify::MilestoneNotifier;
use crate::store::ResultStore;
use crate::translate::{Translator, AUTO_DETECT};
use async_trait::async_trait;
use futures::Stream;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Events buffered between the pipeline task and a slow consumer.
const EVENT_BUFFER: usize = 64;

/// Tuning for a translation run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Entries per translation request.
    pub batch_size: usize,
    /// Token used to pack several values into one request.
    pub separator: String,
    /// Pause after every batch.
    pub batch_delay: Duration,
    /// Pause after every single-value call during fallback.
    pub item_delay: Duration,
    /// Longest combined string sent at once; longer batches go value by value.
    pub max_batch_chars: usize,
    /// Report progress every this many batches (and at 100%).
    pub progress_every: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            separator: " ||| ".to_string(),
            batch_delay: Duration::from_millis(200),
            item_delay: Duration::from_millis(300),
            max_batch_chars: 5000,
            progress_every: 10,
        }
    }
}

/// How a run ended, for callers that drive [`TranslationPipeline::run`] directly.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed { file_id: String, lang_tag: String },
    Failed { translated: usize, total: usize },
}

/// Destination for progress events.
///
/// `emit` fails with [`JsonTranslatorError::Cancelled`] once the consumer is gone.
#[async_trait]
pub trait EventSink: Send {
    async fn emit(&mut self, event: ProgressEvent) -> Result<()>;

    fn is_closed(&self) -> bool {
        false
    }
}

#[async_trait]
impl EventSink for mpsc::Sender<ProgressEvent> {
    async fn emit(&mut self, event: ProgressEvent) -> Result<()> {
        self.send(event)
            .await
            .map_err(|_| JsonTranslatorError::Cancelled)
    }

    fn is_closed(&self) -> bool {
        mpsc::Sender::is_closed(self)
    }
}

#[async_trait]
impl EventSink for Vec<ProgressEvent> {
    async fn emit(&mut self, event: ProgressEvent) -> Result<()> {
        self.push(event);
        Ok(())
    }
}

/// Drives a request through batched translation and stores the result.
pub struct TranslationPipeline {
    translator: Arc<dyn Translator>,
    store: Arc<dyn ResultStore>,
    counter: Arc<TranslationCounter>,
    notifier: Option<MilestoneNotifier>,
    config: PipelineConfig,
}

impl TranslationPipeline {
    pub fn new(
        translator: Arc<dyn Translator>,
        store: Arc<dyn ResultStore>,
        counter: Arc<TranslationCounter>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            translator,
            store,
            counter,
            notifier: None,
            config,
        }
    }

    pub fn with_notifier(mut self, notifier: MilestoneNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Start a run on a background task and return its event stream.
    ///
    /// The stream ends after exactly one terminal event. Dropping it abandons
    /// the run at the next event.
    pub fn stream(
        self: Arc<Self>,
        request: TranslationRequest,
    ) -> impl Stream<Item = ProgressEvent> + Send + 'static {
        let (mut tx, rx) = mpsc::channel(EVENT_BUFFER);
        let fallback = tx.clone();

        tokio::spawn(async move {
            let run = tokio::spawn(async move { self.run(&request, &mut tx).await });

            match run.await {
                Ok(Ok(outcome)) => debug!("Run finished: {:?}", outcome),
                Ok(Err(JsonTranslatorError::Cancelled)) => {
                    info!("Client disconnected, abandoning translation run")
                }
                Ok(Err(e)) => error!("Translation run aborted: {}", e),
                // A crashed run still owes the consumer its terminal event.
                Err(e) => {
                    error!("Translation run crashed: {}", e);
                    let _ = fallback
                        .send(ProgressEvent::Failed {
                            message: "Translation failed".to_string(),
                        })
                        .await;
                }
            }
        });

        futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
    }

    /// Translate the whole request, reporting to `sink`.
    ///
    /// Only a vanished consumer is returned as an error; every other failure
    /// ends the run with a terminal failure event.
    pub async fn run<S: EventSink>(
        &self,
        request: &TranslationRequest,
        sink: &mut S,
    ) -> Result<RunOutcome> {
        let total = request.len();
        let language = request.language;
        let rule = "=".repeat(60);

        info!(
            "Starting translation of {} entries into {} using {}",
            total,
            language,
            self.translator.name()
        );

        sink.emit(ProgressEvent::info(&rule)).await?;
        sink.emit(ProgressEvent::info("🚀 Translation started...")).await?;
        sink.emit(ProgressEvent::info(format!("📊 Total: {} entries", total)))
            .await?;
        sink.emit(ProgressEvent::info(format!("🌍 Target language: {}", language)))
            .await?;
        sink.emit(ProgressEvent::info("-".repeat(60))).await?;

        let mut translated: Map<String, Value> = Map::new();
        let mut batches_done = 0usize;

        for batch in partition(&request.entries, self.config.batch_size) {
            // Progress is only emitted every few batches; stop calling the
            // provider as soon as the consumer is gone.
            if sink.is_closed() {
                return Err(JsonTranslatorError::Cancelled);
            }

            match self.translate_batch(&batch, language.code, sink).await {
                Ok(values) => {
                    for (entry, value) in batch.entries.iter().zip(values) {
                        translated.insert(entry.key.clone(), value);
                    }
                }
                Err(JsonTranslatorError::Cancelled) => return Err(JsonTranslatorError::Cancelled),
                Err(e) => {
                    warn!("Batch {} failed: {}", batch.index + 1, e);
                    sink.emit(ProgressEvent::error(format!("❌ Error: {}", e)))
                        .await?;
                    sink.emit(ProgressEvent::warning(format!(
                        "⏸ Paused at {}/{}",
                        translated.len(),
                        total
                    )))
                    .await?;
                    break;
                }
            }

            batches_done += 1;
            let progress = translated.len();
            let percentage = (progress * 100 / total) as u8;

            if batches_done % self.config.progress_every == 0 || progress == total {
                sink.emit(ProgressEvent::progress(format!(
                    "⏳ Progress: {}/{} ({}%)",
                    progress, total, percentage
                )))
                .await?;
                sink.emit(ProgressEvent::Percentage { value: percentage })
                    .await?;
            }

            if !self.config.batch_delay.is_zero() {
                tokio::time::sleep(self.config.batch_delay).await;
            }
        }

        if translated.len() != total {
            warn!("Run incomplete: {}/{} entries", translated.len(), total);
            return self.fail(sink, translated.len(), total).await;
        }

        // Nothing is committed for a consumer that already left.
        if sink.is_closed() {
            return Err(JsonTranslatorError::Cancelled);
        }

        let document: Map<String, Value> = request
            .entries
            .iter()
            .map(|entry| {
                let value = translated
                    .get(&entry.key)
                    .cloned()
                    .unwrap_or_else(|| entry.value.clone());
                (entry.key.clone(), value)
            })
            .collect();

        let file_id = Uuid::new_v4().to_string();
        let lang_tag = language.tag();

        if let Err(e) = self.store.put(&file_id, document, &lang_tag).await {
            error!("Failed to store translation {}: {}", file_id, e);
            return self.fail(sink, total, total).await;
        }

        let count = self.counter.increment().await;
        if let Some(ref notifier) = self.notifier {
            notifier.spawn_notify(count);
        }
        info!("Translation {} stored as {} (total translations: {})", lang_tag, file_id, count);

        sink.emit(ProgressEvent::info(&rule)).await?;
        sink.emit(ProgressEvent::success("✅ TRANSLATION COMPLETE!"))
            .await?;
        sink.emit(ProgressEvent::info(format!(
            "📊 {}/{} entries translated",
            total, total
        )))
        .await?;
        sink.emit(ProgressEvent::info(format!("🌍 Language: {}", language.name)))
            .await?;
        sink.emit(ProgressEvent::Complete {
            file_id: file_id.clone(),
            lang_code: lang_tag.clone(),
        })
        .await?;

        Ok(RunOutcome::Completed { file_id, lang_tag })
    }

    async fn fail<S: EventSink>(
        &self,
        sink: &mut S,
        translated: usize,
        total: usize,
    ) -> Result<RunOutcome> {
        sink.emit(ProgressEvent::error("❌ Translation incomplete"))
            .await?;
        sink.emit(ProgressEvent::Failed {
            message: "Translation failed".to_string(),
        })
        .await?;
        Ok(RunOutcome::Failed { translated, total })
    }

    /// Translate one batch. The returned values line up with `batch.entries`.
    ///
    /// Errors from the combined (or single) call abort the run; errors on
    /// individual values during fallback do not.
    async fn translate_batch<S: EventSink>(
        &self,
        batch: &Batch<'_>,
        target: &str,
        sink: &mut S,
    ) -> Result<Vec<Value>> {
        let mut values: Vec<Value> = batch.entries.iter().map(|e| e.value.clone()).collect();

        match batch.encode(&self.config.separator, self.config.max_batch_chars) {
            EncodedBatch::Passthrough => {}
            EncodedBatch::Single { position, text } => {
                let result = self.translator.translate(&text, AUTO_DETECT, target).await?;
                values[position] = resolve(&batch.entries[position], &result);
            }
            EncodedBatch::Combined { positions, text } => {
                let result = self.translator.translate(&text, AUTO_DETECT, target).await?;
                match decode_combined(&result, positions.len(), &self.config.separator) {
                    Decoded::Parts(parts) => {
                        for (&position, part) in positions.iter().zip(parts) {
                            values[position] = resolve(&batch.entries[position], &part);
                        }
                    }
                    Decoded::Mismatch { expected, actual } => {
                        debug!(
                            "Batch {} mismatch: expected {} parts, got {}",
                            batch.index + 1,
                            expected,
                            actual
                        );
                        sink.emit(ProgressEvent::warning(
                            "⚠ Batch mismatch, translating entries individually...",
                        ))
                        .await?;
                        self.translate_each(batch, &positions, target, &mut values, sink)
                            .await?;
                    }
                }
            }
            EncodedBatch::Oversized { positions } => {
                sink.emit(ProgressEvent::warning(
                    "⚠ Batch too long for one request, translating entries individually...",
                ))
                .await?;
                self.translate_each(batch, &positions, target, &mut values, sink)
                    .await?;
            }
        }

        Ok(values)
    }

    /// Per-value fallback. A failing value keeps its original text.
    async fn translate_each<S: EventSink>(
        &self,
        batch: &Batch<'_>,
        positions: &[usize],
        target: &str,
        values: &mut [Value],
        sink: &mut S,
    ) -> Result<()> {
        for &position in positions {
            let entry = &batch.entries[position];
            match self.translator.translate(&entry.text, AUTO_DETECT, target).await {
                Ok(result) => values[position] = resolve(entry, &result),
                Err(e) => {
                    warn!("Translating '{}' failed: {}", entry.key, e);
                    sink.emit(ProgressEvent::error(format!(
                        "❌ Error on \"{}\": {}",
                        entry.key, e
                    )))
                    .await?;
                }
            }

            if !self.config.item_delay.is_zero() {
                tokio::time::sleep(self.config.item_delay).await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Entry;
    use crate::languages::Language;
    use crate::store::{MemoryStore, StoredArtifact};
    use futures::StreamExt;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    type Behavior = dyn Fn(usize, &str) -> Result<String> + Send + Sync;

    /// Records every call and answers through a closure of (call index, text).
    struct ScriptedTranslator {
        calls: Mutex<Vec<String>>,
        behavior: Box<Behavior>,
    }

    impl ScriptedTranslator {
        fn new(behavior: impl Fn(usize, &str) -> Result<String> + Send + Sync + 'static) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                behavior: Box::new(behavior),
            }
        }

        fn uppercase() -> Self {
            Self::new(|_, text| Ok(text.to_uppercase()))
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Translator for ScriptedTranslator {
        async fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<String> {
            let index = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(text.to_string());
                calls.len() - 1
            };
            (self.behavior)(index, text)
        }

        fn name(&self) -> &'static str {
            "Scripted"
        }
    }

    struct Harness {
        translator: Arc<ScriptedTranslator>,
        store: Arc<MemoryStore>,
        counter: Arc<TranslationCounter>,
        pipeline: TranslationPipeline,
    }

    fn fast_config() -> PipelineConfig {
        PipelineConfig {
            batch_delay: Duration::ZERO,
            item_delay: Duration::ZERO,
            ..PipelineConfig::default()
        }
    }

    fn harness(translator: ScriptedTranslator, config: PipelineConfig) -> Harness {
        let translator = Arc::new(translator);
        let store = Arc::new(MemoryStore::new());
        let counter = Arc::new(TranslationCounter::in_memory());
        let pipeline = TranslationPipeline::new(
            translator.clone(),
            store.clone(),
            counter.clone(),
            config,
        );
        Harness {
            translator,
            store,
            counter,
            pipeline,
        }
    }

    fn request(pairs: &[(&str, Value)]) -> TranslationRequest {
        TranslationRequest {
            entries: pairs
                .iter()
                .map(|(k, v)| Entry::new(*k, v.clone()))
                .collect(),
            language: Language::from_name("German").unwrap(),
        }
    }

    fn numbered_request(count: usize) -> TranslationRequest {
        TranslationRequest {
            entries: (0..count)
                .map(|i| Entry::new(format!("key{}", i), json!(format!("value {}", i))))
                .collect(),
            language: Language::from_name("German").unwrap(),
        }
    }

    fn percentages(events: &[ProgressEvent]) -> Vec<u8> {
        events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Percentage { value } => Some(*value),
                _ => None,
            })
            .collect()
    }

    fn terminal_count(events: &[ProgressEvent]) -> usize {
        events.iter().filter(|e| e.is_terminal()).count()
    }

    async fn stored(h: &Harness, outcome: &RunOutcome) -> StoredArtifact {
        let RunOutcome::Completed { file_id, .. } = outcome else {
            panic!("expected completed run, got {:?}", outcome);
        };
        h.store.get(file_id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_two_keys_single_combined_call() {
        let h = harness(ScriptedTranslator::uppercase(), fast_config());
        let req = request(&[("a", json!("Hello")), ("b", json!("World"))]);
        let mut events = Vec::new();

        let outcome = h.pipeline.run(&req, &mut events).await.unwrap();

        assert_eq!(h.translator.calls(), vec!["Hello ||| World"]);
        let artifact = stored(&h, &outcome).await;
        assert_eq!(artifact.lang_tag, "DE");
        assert_eq!(artifact.payload["a"], "HELLO");
        assert_eq!(artifact.payload["b"], "WORLD");
        assert_eq!(
            artifact.payload.keys().collect::<Vec<_>>(),
            vec!["a", "b"]
        );

        match events.last().unwrap() {
            ProgressEvent::Complete { file_id, lang_code } => {
                assert!(!file_id.is_empty());
                assert_eq!(lang_code, "DE");
            }
            other => panic!("expected complete event, got {:?}", other),
        }
        assert_eq!(terminal_count(&events), 1);
        assert_eq!(h.counter.get().await, 1);
    }

    #[tokio::test]
    async fn test_three_batches_report_once() {
        let h = harness(ScriptedTranslator::uppercase(), fast_config());
        let req = numbered_request(120);
        let mut events = Vec::new();

        let outcome = h.pipeline.run(&req, &mut events).await.unwrap();

        assert_eq!(h.translator.calls().len(), 3);
        assert_eq!(percentages(&events), vec![100]);
        let artifact = stored(&h, &outcome).await;
        assert_eq!(artifact.payload.len(), 120);
        assert_eq!(artifact.payload["key119"], "VALUE 119");
    }

    #[tokio::test]
    async fn test_progress_every_tenth_batch() {
        let config = PipelineConfig {
            batch_size: 1,
            ..fast_config()
        };
        let h = harness(ScriptedTranslator::uppercase(), config);
        let mut events = Vec::new();

        h.pipeline.run(&numbered_request(25), &mut events).await.unwrap();

        assert_eq!(percentages(&events), vec![40, 80, 100]);
    }

    #[tokio::test]
    async fn test_failing_second_batch_aborts_run() {
        let h = harness(
            ScriptedTranslator::new(|index, text| {
                if index >= 1 {
                    Err(JsonTranslatorError::Api("connection reset".to_string()))
                } else {
                    Ok(text.to_uppercase())
                }
            }),
            fast_config(),
        );
        let mut events = Vec::new();

        let outcome = h.pipeline.run(&numbered_request(120), &mut events).await.unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Failed {
                translated: 50,
                total: 120
            }
        );
        assert_eq!(h.translator.calls().len(), 2);
        assert!(events.iter().any(|e| matches!(
            e,
            ProgressEvent::Warning { message } if message.ends_with("Paused at 50/120")
        )));
        assert!(matches!(events.last(), Some(ProgressEvent::Failed { .. })));
        assert_eq!(terminal_count(&events), 1);
        assert_eq!(h.store.len().await.unwrap(), 0);
        assert_eq!(h.counter.get().await, 0);
    }

    #[tokio::test]
    async fn test_mismatch_falls_back_per_item() {
        let h = harness(
            ScriptedTranslator::new(|_, text| {
                // The provider mangles the separator but translates single values fine.
                Ok(text.replace("|||", "/").to_uppercase())
            }),
            fast_config(),
        );
        let req = request(&[
            ("a", json!("one")),
            ("b", json!("two")),
            ("c", json!("three")),
        ]);
        let mut events = Vec::new();

        let outcome = h.pipeline.run(&req, &mut events).await.unwrap();

        assert_eq!(
            h.translator.calls(),
            vec!["one ||| two ||| three", "one", "two", "three"]
        );
        assert!(events.iter().any(|e| matches!(
            e,
            ProgressEvent::Warning { message } if message.contains("Batch mismatch")
        )));
        let artifact = stored(&h, &outcome).await;
        assert_eq!(artifact.payload["c"], "THREE");
    }

    #[tokio::test]
    async fn test_item_failure_keeps_original_value() {
        let h = harness(
            ScriptedTranslator::new(|index, text| match (index, text) {
                (0, _) => Ok("only one part".to_string()),
                (_, "broken") => Err(JsonTranslatorError::Api("rejected".to_string())),
                _ => Ok(text.to_uppercase()),
            }),
            fast_config(),
        );
        let req = request(&[("ok", json!("fine")), ("bad", json!("broken"))]);
        let mut events = Vec::new();

        let outcome = h.pipeline.run(&req, &mut events).await.unwrap();

        let artifact = stored(&h, &outcome).await;
        assert_eq!(artifact.payload["ok"], "FINE");
        assert_eq!(artifact.payload["bad"], "broken");
        assert!(events.iter().any(|e| matches!(
            e,
            ProgressEvent::Error { message } if message.contains("\"bad\"")
        )));
        assert!(matches!(events.last(), Some(ProgressEvent::Complete { .. })));
    }

    #[tokio::test]
    async fn test_blank_values_are_never_sent() {
        let h = harness(ScriptedTranslator::uppercase(), fast_config());
        let req = request(&[
            ("empty", json!("")),
            ("space", json!("   ")),
            ("text", json!("hi")),
            ("nothing", Value::Null),
        ]);
        let mut events = Vec::new();

        let outcome = h.pipeline.run(&req, &mut events).await.unwrap();

        assert_eq!(h.translator.calls(), vec!["hi"]);
        let artifact = stored(&h, &outcome).await;
        assert_eq!(artifact.payload["empty"], "");
        assert_eq!(artifact.payload["space"], "   ");
        assert_eq!(artifact.payload["text"], "HI");
        assert_eq!(artifact.payload["nothing"], Value::Null);
    }

    #[tokio::test]
    async fn test_empty_translated_part_uses_original() {
        let h = harness(
            ScriptedTranslator::new(|_, _| Ok("HALLO |||   ".to_string())),
            fast_config(),
        );
        let req = request(&[("a", json!("hello")), ("b", json!("world"))]);
        let mut events = Vec::new();

        let outcome = h.pipeline.run(&req, &mut events).await.unwrap();

        let artifact = stored(&h, &outcome).await;
        assert_eq!(artifact.payload["a"], "HALLO");
        assert_eq!(artifact.payload["b"], "world");
    }

    #[tokio::test]
    async fn test_oversized_batch_skips_combined_call() {
        let config = PipelineConfig {
            max_batch_chars: 10,
            ..fast_config()
        };
        let h = harness(ScriptedTranslator::uppercase(), config);
        let req = request(&[("a", json!("long value")), ("b", json!("another one"))]);
        let mut events = Vec::new();

        let outcome = h.pipeline.run(&req, &mut events).await.unwrap();

        assert_eq!(h.translator.calls(), vec!["long value", "another one"]);
        assert_eq!(stored(&h, &outcome).await.payload["b"], "ANOTHER ONE");
    }

    #[tokio::test]
    async fn test_empty_document_completes() {
        let h = harness(ScriptedTranslator::uppercase(), fast_config());
        let mut events = Vec::new();

        let outcome = h.pipeline.run(&request(&[]), &mut events).await.unwrap();

        assert!(h.translator.calls().is_empty());
        assert!(stored(&h, &outcome).await.payload.is_empty());
        assert!(percentages(&events).is_empty());
    }

    #[tokio::test]
    async fn test_disconnected_consumer_commits_nothing() {
        let h = harness(ScriptedTranslator::uppercase(), fast_config());
        let (mut tx, rx) = mpsc::channel(EVENT_BUFFER);
        drop(rx);

        let result = h.pipeline.run(&numbered_request(3), &mut tx).await;

        assert!(matches!(result, Err(JsonTranslatorError::Cancelled)));
        assert_eq!(h.store.len().await.unwrap(), 0);
        assert_eq!(h.counter.get().await, 0);
    }

    #[tokio::test]
    async fn test_store_failure_ends_with_error() {
        struct RejectingStore;

        #[async_trait]
        impl ResultStore for RejectingStore {
            async fn put(&self, _: &str, _: Map<String, Value>, _: &str) -> Result<()> {
                Err(JsonTranslatorError::Store("disk full".to_string()))
            }
            async fn get(&self, _: &str) -> Result<Option<StoredArtifact>> {
                Ok(None)
            }
            async fn mark_consumed(&self, _: &str) -> Result<bool> {
                Ok(false)
            }
            async fn delete_expired(&self, _: Duration) -> Result<usize> {
                Ok(0)
            }
            async fn len(&self) -> Result<usize> {
                Ok(0)
            }
        }

        let counter = Arc::new(TranslationCounter::in_memory());
        let pipeline = TranslationPipeline::new(
            Arc::new(ScriptedTranslator::uppercase()),
            Arc::new(RejectingStore),
            counter.clone(),
            fast_config(),
        );
        let mut events = Vec::new();

        let outcome = pipeline.run(&numbered_request(2), &mut events).await.unwrap();

        assert!(matches!(outcome, RunOutcome::Failed { .. }));
        assert!(matches!(events.last(), Some(ProgressEvent::Failed { .. })));
        assert_eq!(terminal_count(&events), 1);
        assert_eq!(counter.get().await, 0);
    }

    #[tokio::test]
    async fn test_stream_ends_after_terminal_event() {
        let h = harness(ScriptedTranslator::uppercase(), fast_config());
        let pipeline = Arc::new(h.pipeline);

        let events: Vec<ProgressEvent> = pipeline.stream(numbered_request(5)).collect().await;

        assert_eq!(terminal_count(&events), 1);
        assert!(matches!(events.last(), Some(ProgressEvent::Complete { .. })));
        assert_eq!(h.store.len().await.unwrap(), 1);
    }

    /// Collects events and reports closed once the shared flag is raised.
    struct ClosingSink {
        events: Vec<ProgressEvent>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl EventSink for ClosingSink {
        async fn emit(&mut self, event: ProgressEvent) -> Result<()> {
            self.events.push(event);
            Ok(())
        }

        fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_disconnect_between_progress_reports_stops_batches() {
        let closed = Arc::new(AtomicBool::new(false));
        let flag = closed.clone();
        let translator = ScriptedTranslator::new(move |_, text| {
            flag.store(true, Ordering::SeqCst);
            Ok(text.to_uppercase())
        });
        let config = PipelineConfig {
            batch_size: 1,
            ..fast_config()
        };
        let h = harness(translator, config);
        let mut sink = ClosingSink {
            events: Vec::new(),
            closed,
        };

        let result = h.pipeline.run(&numbered_request(5), &mut sink).await;

        assert!(matches!(result, Err(JsonTranslatorError::Cancelled)));
        assert_eq!(h.translator.calls().len(), 1);
        assert!(percentages(&sink.events).is_empty());
        assert_eq!(h.store.len().await.unwrap(), 0);
        assert_eq!(h.counter.get().await, 0);
    }

    #[tokio::test]
    async fn test_crashed_run_still_ends_with_failure() {
        let translator = ScriptedTranslator::new(|_, _| panic!("provider client crashed"));
        let h = harness(translator, fast_config());
        let pipeline = Arc::new(h.pipeline);

        let events: Vec<ProgressEvent> = pipeline.stream(numbered_request(2)).collect().await;

        assert_eq!(terminal_count(&events), 1);
        assert!(matches!(events.last(), Some(ProgressEvent::Failed { .. })));
        assert_eq!(h.store.len().await.unwrap(), 0);
        assert_eq!(h.counter.get().await, 0);
    }
}
