//! Wiring of the query-time pipeline from settings.

use std::sync::Arc;

use tracing::{info, warn};

use siteqa_core::config::Settings;
use siteqa_core::traits::{CrossEncoder, Embedder, Generator};
use siteqa_core::{Error, Result};
use siteqa_embed::{get_default_cross_encoder, get_default_embedder, EncoderPair};
use siteqa_llm::build_generator;

use crate::answer::AnswerService;
use crate::expand::QueryExpander;
use crate::orchestrator::Retriever;
use crate::rerank::Reranker;
use crate::retriever::{HybridParams, HybridRetriever};
use crate::snapshot::{Snapshot, SnapshotStore};

/// Model collaborators of the pipeline.
#[derive(Clone)]
pub struct Models {
    pub encoders: EncoderPair,
    pub cross_encoder: Arc<dyn CrossEncoder>,
    pub generator: Arc<dyn Generator>,
}

impl Models {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base: Arc<dyn Embedder> = get_default_embedder(&settings.embedding)?;
        Ok(Self {
            encoders: EncoderPair::from_settings(base, &settings.embedding),
            cross_encoder: get_default_cross_encoder(&settings.reranker)?,
            generator: build_generator(&settings.llm, settings.timeouts.generate())?,
        })
    }
}

/// Assembles a [`Retriever`] over an opened snapshot.
///
/// Vectors built by one embedder are not searchable with another, so a
/// manifest naming a different document encoder is a configuration error.
pub fn assemble(settings: &Settings, snapshot: Snapshot, models: &Models) -> Result<Retriever> {
    if snapshot.manifest.embedder != models.encoders.id() {
        return Err(Error::InvalidConfig(format!(
            "snapshot {} was built with embedder '{}', configured embedder is '{}'; reindex",
            snapshot.manifest.version,
            snapshot.manifest.embedder,
            models.encoders.id()
        )));
    }
    let r = &settings.retrieval;
    let hybrid = HybridRetriever::new(
        Arc::new(snapshot.text),
        Arc::new(snapshot.vector),
        Arc::clone(&models.encoders.query),
        HybridParams::from_settings(settings)?,
    );
    let reranker = Reranker::new(Arc::clone(&models.cross_encoder), settings.timeouts.rerank());
    let mut retriever = Retriever::new(hybrid, reranker, r.top_n).with_concurrency(r.fan_out_concurrency);
    if r.expansion_enabled {
        retriever = retriever.with_expander(QueryExpander::new(Arc::clone(&models.generator), r.num_expansions, settings.timeouts.expand()));
    } else {
        warn!("query expansion disabled");
    }
    Ok(retriever)
}

/// Opens the published snapshot and builds the retriever for it.
pub async fn open_retriever(settings: &Settings, models: &Models) -> Result<Retriever> {
    let snapshot = SnapshotStore::new(&settings.paths.index_root).open_current().await?;
    let retriever = assemble(settings, snapshot, models)?;
    info!(index_root = %settings.paths.index_root.display(), "retriever ready");
    Ok(retriever)
}

pub async fn open_answer_service(settings: &Settings, models: &Models) -> Result<AnswerService> {
    let retriever = open_retriever(settings, models).await?;
    Ok(AnswerService::new(Arc::new(retriever), Arc::clone(&models.generator), settings.timeouts.generate()))
}
