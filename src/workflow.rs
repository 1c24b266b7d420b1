use futures::stream::{self, Stream, StreamExt};
use tracing::{debug, error, info, warn};

use crate::entity::TranslatableEntity;
use crate::error::ProcessingError;
use crate::translate::Dispatcher;

/// Per-run translation parameters. Unset fields fall back to the
/// dispatcher defaults or, for the source language, to the entity's
/// detected language.
#[derive(Debug, Clone, Default)]
pub struct TranslationOptions {
    pub source_language: Option<String>,
    pub target_language: Option<String>,
    pub engine: Option<String>,
}

impl TranslationOptions {
    pub fn new<S: Into<String>>(source_language: S) -> Self {
        Self {
            source_language: Some(source_language.into()),
            ..Self::default()
        }
    }

    pub fn target<S: Into<String>>(mut self, target_language: S) -> Self {
        self.target_language = Some(target_language.into());
        self
    }

    pub fn engine<S: Into<String>>(mut self, engine: S) -> Self {
        self.engine = Some(engine.into());
        self
    }
}

/// Translate every source text of `entity` and append the results.
///
/// Texts that fail inside an engine are logged and skipped; if none of the
/// texts translate, one warning is logged and the entity is returned as is.
/// Errors that are not per-text (no source language, unsupported engine)
/// are returned.
pub async fn translate_entity<E: TranslatableEntity>(
    dispatcher: &Dispatcher,
    mut entity: E,
    options: &TranslationOptions,
) -> Result<E, ProcessingError> {
    let texts = entity.source_texts();
    if texts.is_empty() {
        return Ok(entity);
    }

    let source = options
        .source_language
        .clone()
        .or_else(|| entity.detected_language().map(str::to_string))
        .ok_or_else(|| ProcessingError::new("No source language detected."))?;
    let target = options
        .target_language
        .clone()
        .unwrap_or_else(|| dispatcher.default_target().to_string());

    let mut translated = 0;
    for text in &texts {
        let result = dispatcher
            .translate_or_skip(text, &source, Some(target.as_str()), options.engine.as_deref())
            .await?;
        if let Some(result) = result {
            entity.add_translation(result, &target);
            translated += 1;
        }
    }

    if translated == 0 {
        warn!(
            entity = entity.id().unwrap_or_default(),
            source_lang = %source,
            target_lang = %target,
            "Couldn't translate entity!"
        );
    } else {
        debug!(
            entity = entity.id().unwrap_or_default(),
            "Translated {}/{} texts",
            translated,
            texts.len()
        );
    }

    Ok(entity)
}

/// Lazily translate a stream of entities.
///
/// Each input yields at most one output: entities whose translation raises
/// are logged with their id and dropped, and the stream carries on.
pub fn translate_entities<'a, E, S>(
    dispatcher: &'a Dispatcher,
    entities: S,
    options: &'a TranslationOptions,
) -> impl Stream<Item = E> + 'a
where
    E: TranslatableEntity + 'a,
    S: Stream<Item = E> + 'a,
{
    entities.filter_map(move |entity| async move {
        let id = entity.id().unwrap_or_default().to_string();
        match translate_entity(dispatcher, entity, options).await {
            Ok(entity) => Some(entity),
            Err(e) => {
                error!("Translation failed for `{}`: {}", id, e);
                None
            }
        }
    })
}

/// Convenience over [`translate_entities`] for an in-memory batch
pub async fn translate_batch<E, I>(
    dispatcher: &Dispatcher,
    entities: I,
    options: &TranslationOptions,
) -> Vec<E>
where
    E: TranslatableEntity,
    I: IntoIterator<Item = E>,
{
    let entities: Vec<E> = entities.into_iter().collect();
    let total = entities.len();
    let translated: Vec<E> = translate_entities(dispatcher, stream::iter(entities), options)
        .collect()
        .await;
    info!("Translated batch: {} of {} entities emitted", translated.len(), total);
    translated
}
