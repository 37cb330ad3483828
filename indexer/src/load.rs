use anyhow::Result;
use search_core::{Collection, DocId, Document, KvStore};
use serde::Deserialize;
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

const INSERT_BATCH: usize = 500;

/// One crawled page, as written by the crawler (JSON object per line or array).
#[derive(Debug, Deserialize)]
struct InputDoc {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: String,
    url: Option<String>,
    #[serde(default, alias = "authority")]
    pagerank: Option<f64>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub rejected: usize,
}

/// Replace the collection with every document found under `input`, numbering them from 1
/// in file order.
pub fn load_collection<S: KvStore>(input: &Path, collection: &Collection<S>) -> Result<LoadSummary> {
    collection.reset()?;
    let mut loader = Loader { collection, next_doc_id: 1, pending: Vec::new(), summary: LoadSummary::default() };
    for file in input_files(input) {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            loader.load_jsonl(&file)?;
        } else {
            loader.load_json(&file)?;
        }
    }
    loader.flush()?;
    Ok(loader.summary)
}

fn input_files(input: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files
}

struct Loader<'a, S> {
    collection: &'a Collection<S>,
    next_doc_id: DocId,
    pending: Vec<Document>,
    summary: LoadSummary,
}

impl<S: KvStore> Loader<'_, S> {
    fn load_jsonl(&mut self, file: &Path) -> Result<()> {
        let reader = BufReader::new(File::open(file)?);
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<InputDoc>(&line) {
                Ok(doc) => self.push(doc)?,
                Err(e) => {
                    tracing::warn!(file = %file.display(), line = n + 1, error = %e, "rejecting malformed record");
                    self.summary.rejected += 1;
                }
            }
        }
        Ok(())
    }

    fn load_json(&mut self, file: &Path) -> Result<()> {
        let reader = BufReader::new(File::open(file)?);
        let json: serde_json::Value = serde_json::from_reader(reader)?;
        let values = match json {
            serde_json::Value::Array(arr) => arr,
            obj @ serde_json::Value::Object(_) => vec![obj],
            _ => Vec::new(),
        };
        for v in values {
            match serde_json::from_value::<InputDoc>(v) {
                Ok(doc) => self.push(doc)?,
                Err(e) => {
                    tracing::warn!(file = %file.display(), error = %e, "rejecting malformed record");
                    self.summary.rejected += 1;
                }
            }
        }
        Ok(())
    }

    fn push(&mut self, input: InputDoc) -> Result<()> {
        let doc_id = self.next_doc_id;
        self.next_doc_id += 1;
        let url = input.url.or(input.id).unwrap_or_default();
        self.pending.push(Document {
            doc_id,
            url,
            title: input.title.unwrap_or_default(),
            body: input.body,
            authority: input.pagerank.unwrap_or(0.0),
        });
        if self.pending.len() >= INSERT_BATCH {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.collection.insert_all(&self.pending)?;
        self.summary.loaded += self.pending.len();
        self.pending.clear();
        Ok(())
    }
}
