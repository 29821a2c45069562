//! Segment-level translation fan-out.
//!
//! Every (segment, language) pair becomes one spawned task. Results are
//! regrouped per language and re-sorted by segment index, so completion order
//! never leaks into the output. The batch is all-or-nothing: the first failure
//! cancels the remaining tasks and no language map is returned.
//!
//! Persisting the per-language results is a second, independent fan-out where
//! a failed write only loses that one language.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{FlowError, Result};
use crate::models::{LanguageResult, ORIGINAL_LANG, SubtitleTrack, TimedText, TranscriptSegment};
use crate::subtitle::SubtitleSink;
use crate::translate::Translator;

/// Output of one translation task
struct UnitResult {
    index: usize,
    lang: String,
    entry: Result<TimedText>,
}

pub struct FanOutEngine {
    limit: Option<Arc<Semaphore>>,
}

impl FanOutEngine {
    /// `max_concurrency` of `None` runs every unit at once
    pub fn new(max_concurrency: Option<usize>) -> Self {
        Self {
            limit: max_concurrency.map(|n| Arc::new(Semaphore::new(n.max(1)))),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// The untranslated track
    pub fn passthrough(segments: &[TranscriptSegment]) -> Vec<TimedText> {
        segments.iter().map(TimedText::from).collect()
    }

    /// Translate every segment into every language.
    ///
    /// The returned map holds one chronologically ordered sequence per
    /// requested language plus the [`ORIGINAL_LANG`] passthrough.
    pub async fn translate(
        &self,
        translator: Arc<dyn Translator>,
        segments: &[TranscriptSegment],
        langs: &[String],
        cancel: &CancellationToken,
    ) -> Result<LanguageResult> {
        let mut results = LanguageResult::new();
        results.insert(ORIGINAL_LANG.to_string(), Self::passthrough(segments));

        if langs.is_empty() || segments.is_empty() {
            for lang in langs {
                results.insert(lang.clone(), Vec::new());
            }
            return Ok(results);
        }

        let token = cancel.child_token();
        let mut units = JoinSet::new();

        for segment in segments {
            for lang in langs {
                let translator = Arc::clone(&translator);
                let limit = self.limit.clone();
                let token = token.clone();
                let lang = lang.clone();
                let segment = segment.clone();

                units.spawn(async move {
                    let work = async {
                        let _permit = match limit {
                            Some(semaphore) => Some(
                                semaphore.acquire_owned().await.map_err(|_| FlowError::Cancelled)?,
                            ),
                            None => None,
                        };
                        translator.translate(&segment.text, &lang).await
                    };

                    let entry = tokio::select! {
                        _ = token.cancelled() => Err(FlowError::Cancelled),
                        translated = work => translated
                            .map(|text| TimedText::new(segment.start, segment.end, text)),
                    };

                    UnitResult { index: segment.index, lang, entry }
                });
            }
        }

        info!(
            segments = segments.len(),
            languages = langs.len(),
            units = units.len(),
            "Translation fan-out started"
        );

        let mut grouped: HashMap<String, Vec<(usize, TimedText)>> = langs
            .iter()
            .map(|lang| (lang.clone(), Vec::with_capacity(segments.len())))
            .collect();
        let mut failure: Option<FlowError> = None;

        while let Some(joined) = units.join_next().await {
            let unit_error = match joined {
                Ok(UnitResult { index, lang, entry: Ok(entry) }) => {
                    if failure.is_none() {
                        grouped.entry(lang).or_default().push((index, entry));
                    }
                    continue;
                }
                Ok(UnitResult { index, lang, entry: Err(e) }) => {
                    if failure.is_none() {
                        error!(segment = index, lang = %lang, "Translation failed: {}", e);
                    }
                    e
                }
                Err(e) => FlowError::Translation(format!("translation task aborted: {}", e)),
            };

            // First reported failure wins, later ones are dropped
            if failure.is_none() {
                failure = Some(unit_error);
                token.cancel();
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }

        for (lang, mut entries) in grouped {
            entries.sort_by_key(|(index, _)| *index);
            results.insert(lang, entries.into_iter().map(|(_, entry)| entry).collect());
        }

        debug!(languages = results.len(), "Translation fan-out completed");
        Ok(results)
    }

    /// Write every language concurrently; failed languages are logged and left out.
    pub async fn persist(
        sink: Arc<dyn SubtitleSink>,
        results: LanguageResult,
    ) -> BTreeMap<String, String> {
        let mut writes = JoinSet::new();

        for (lang, entries) in results {
            let sink = Arc::clone(&sink);
            writes.spawn(async move {
                let written = sink.write(&lang, &entries).await;
                (lang, written)
            });
        }

        let mut uris = BTreeMap::new();
        while let Some(joined) = writes.join_next().await {
            match joined {
                Ok((lang, Ok(uri))) => {
                    uris.insert(lang, uri);
                }
                Ok((lang, Err(e))) => {
                    warn!(lang = %lang, "Failed to save subtitles, skipping language: {}", e);
                }
                Err(e) => {
                    warn!("Subtitle write task aborted: {}", e);
                }
            }
        }

        uris
    }

    /// Full subtitle step of a job.
    ///
    /// The original track is written before any translation starts. Returned
    /// tracks are ordered `original` first, then `langs` order, one per language.
    pub async fn run(
        &self,
        translator: Arc<dyn Translator>,
        sink: Arc<dyn SubtitleSink>,
        segments: &[TranscriptSegment],
        langs: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<SubtitleTrack>> {
        let mut tracks = Vec::with_capacity(langs.len() + 1);

        match sink.write(ORIGINAL_LANG, &Self::passthrough(segments)).await {
            Ok(uri) => tracks.push(SubtitleTrack { uri, lang: ORIGINAL_LANG.to_string() }),
            Err(e) => warn!("Failed to save original subtitles, skipping: {}", e),
        }

        let mut results = self.translate(translator, segments, langs, cancel).await?;
        results.remove(ORIGINAL_LANG);

        let mut uris = Self::persist(sink, results).await;
        for lang in langs {
            if let Some(uri) = uris.remove(lang) {
                tracks.push(SubtitleTrack { uri, lang: lang.clone() });
            }
        }

        Ok(tracks)
    }
}
