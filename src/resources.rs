//! Assembly of the shared, read-only matching resources from settings.

use crate::settings::Settings;
use anyhow::{Context, Result};
use fieldfuse_api::HttpSource;
use fieldfuse_core::{DataSource, HashingModel, IdfTable, MemorySource, SimpleTokenizer};
use fieldfuse_matcher::{DetectorRegistry, Gazetteer, MatchResources};
use fieldfuse_storage::IdfCorpus;
use std::sync::Arc;
use tracing::{info, warn};

fn data_source(settings: &Settings) -> Result<Arc<dyn DataSource>> {
    if let Some((fields_url, data_url)) = settings.remote_catalog() {
        info!("Catalog: {} / {}", fields_url, data_url);
        return Ok(Arc::new(HttpSource::new(fields_url, data_url)?));
    }
    match &settings.catalog.tables_path {
        Some(path) => {
            let source = MemorySource::from_json_file(path)
                .with_context(|| format!("cannot load tables from {}", path.display()))?;
            info!("Catalog: {} tables from {}", source.table_ids().len(), path.display());
            Ok(Arc::new(source))
        }
        None => {
            warn!("No catalog configured, every table will be reported as unavailable");
            Ok(Arc::new(MemorySource::new()))
        }
    }
}

fn idf_table(settings: &Settings) -> Result<Arc<dyn IdfTable>> {
    match &settings.resources.idf_path {
        Some(path) => Ok(Arc::new(IdfCorpus::load(path)?)),
        None => {
            warn!("No IDF table configured, keyword weights are all zero");
            Ok(Arc::new(IdfCorpus::default()))
        }
    }
}

fn gazetteer(settings: &Settings) -> Result<Gazetteer> {
    match &settings.resources.gazetteer_path {
        Some(path) => Gazetteer::from_json_file(path)
            .with_context(|| format!("cannot load gazetteer {}", path.display())),
        None => Ok(Gazetteer::builtin()),
    }
}

/// Build everything the match workers share.
pub fn build_resources(settings: &Settings) -> Result<MatchResources> {
    let registry = DetectorRegistry::builtin(Arc::new(gazetteer(settings)?))
        .context("invalid detector registry")?;
    info!("Loaded {} value detectors", registry.len());

    Ok(MatchResources {
        source: data_source(settings)?,
        tokenizer: Arc::new(SimpleTokenizer),
        model: Arc::new(HashingModel::new(settings.resources.embedding_dim)?),
        idf: idf_table(settings)?,
        registry: Arc::new(registry),
    })
}
