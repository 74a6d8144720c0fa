// IDF table built from a document corpus and persisted as JSON
use ahash::{AHashMap, AHashSet};
use anyhow::{Context, Result};
use fieldfuse_core::{IdfTable, Tokenizer};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// Document frequency counter. Each document counts a term once.
#[derive(Debug, Default)]
pub struct IdfBuilder {
    documents: u64,
    frequencies: AHashMap<String, u64>,
}

impl IdfBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(&mut self, text: &str, tokenizer: &dyn Tokenizer) -> Result<()> {
        let terms: AHashSet<String> = tokenizer
            .segment(text)?
            .into_iter()
            .map(|t| t.to_lowercase())
            .collect();
        for term in terms {
            *self.frequencies.entry(term).or_insert(0) += 1;
        }
        self.documents += 1;
        Ok(())
    }

    /// Add one document per JSON line, concatenating the string values of
    /// `keys`. Malformed lines are skipped.
    pub fn add_json_lines<R: BufRead>(&mut self, reader: R, keys: &[&str], tokenizer: &dyn Tokenizer) -> Result<usize> {
        let mut skipped = 0;
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let item: serde_json::Map<String, serde_json::Value> = match serde_json::from_str(&line) {
                Ok(item) => item,
                Err(e) => {
                    warn!("Skipping line {}: {}", number + 1, e);
                    skipped += 1;
                    continue;
                }
            };
            let text: Vec<&str> = keys
                .iter()
                .filter_map(|k| item.get(*k).and_then(serde_json::Value::as_str))
                .collect();
            self.add_document(&text.join(" "), tokenizer)?;
        }
        Ok(skipped)
    }

    #[must_use]
    pub fn documents(&self) -> u64 {
        self.documents
    }

    /// `ln(N / (df + 1))` per term.
    #[must_use]
    pub fn build(self) -> IdfCorpus {
        let n = self.documents as f64;
        let weights = self
            .frequencies
            .into_iter()
            .map(|(term, df)| (term, (n / (df as f64 + 1.0)).ln()))
            .collect();
        IdfCorpus { weights }
    }
}

/// Precomputed term weights. Unknown terms weigh 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdfCorpus {
    weights: AHashMap<String, f64>,
}

impl IdfCorpus {
    #[must_use]
    pub fn new(weights: AHashMap<String, f64>) -> Self {
        Self { weights }
    }

    /// Build from in-memory documents.
    pub fn from_documents<S: AsRef<str>>(documents: &[S], tokenizer: &dyn Tokenizer) -> Result<Self> {
        let mut builder = IdfBuilder::new();
        for doc in documents {
            builder.add_document(doc.as_ref(), tokenizer)?;
        }
        Ok(builder.build())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("cannot open IDF table {}", path.display()))?;
        let map: std::collections::HashMap<String, f64> = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("invalid IDF table {}", path.display()))?;
        info!("Loaded {} IDF weights from {}", map.len(), path.display());
        Ok(Self {
            weights: map.into_iter().collect(),
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut ordered: Vec<(&String, &f64)> = self.weights.iter().collect();
        ordered.sort_by(|a, b| a.0.cmp(b.0));
        let map: serde_json::Map<String, serde_json::Value> = ordered
            .into_iter()
            .map(|(k, v)| (k.clone(), serde_json::json!(v)))
            .collect();

        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, &map)?;
        writer.flush()?;
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

impl IdfTable for IdfCorpus {
    fn idf(&self, term: &str) -> f64 {
        self.weights.get(term).copied().unwrap_or(0.0)
    }
}
