//! Embedded full-text backend
//!
//! Keeps job offers in an in-memory Tantivy index. Useful to run the
//! gateway without a cluster and as the store behind the API tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{JobOffer, JobOfferPatch};
use tantivy::{
    Document, Index, IndexReader, IndexWriter, ReloadPolicy, Term,
    collector::TopDocs,
    query::{AllQuery, BooleanQuery, Occur, Query, TermQuery},
    schema::{Field, IndexRecordOption, NumericOptions, STORED, STRING, Schema, TEXT},
    tokenizer::TokenStream,
};
use tracing::debug;
use uuid::Uuid;

use super::{DEFAULT_RESULT_WINDOW, DocumentStore, SEARCH_FIELDS, StoreError};

/// Index writer heap (50MB)
const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Field handles of the job offer schema
#[derive(Clone, Copy)]
struct Fields {
    id: Field,
    job: Field,
    company: Field,
    address: Field,
    date: Field,
    link: Field,
    salary: Field,
    description: Field,
}

/// Builds the Tantivy schema for job offers
fn build_schema() -> (Schema, Fields) {
    let mut schema_builder = Schema::builder();

    // Id: exact-match lookups only
    let id = schema_builder.add_text_field("id", STRING | STORED);

    // Searchable text, stored so documents can be returned whole
    let job = schema_builder.add_text_field(SEARCH_FIELDS[0], TEXT | STORED);
    let company = schema_builder.add_text_field(SEARCH_FIELDS[1], TEXT | STORED);
    let address = schema_builder.add_text_field(SEARCH_FIELDS[2], TEXT | STORED);
    let description = schema_builder.add_text_field(SEARCH_FIELDS[3], TEXT | STORED);

    // Stored as-is, never searched
    let date = schema_builder.add_text_field("Date", STORED);
    let link = schema_builder.add_text_field("Link", STORED);
    let salary = schema_builder.add_f64_field("Salary", NumericOptions::default().set_stored());

    let fields = Fields {
        id,
        job,
        company,
        address,
        date,
        link,
        salary,
        description,
    };
    (schema_builder.build(), fields)
}

struct Inner {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    fields: Fields,
}

/// Job offer store backed by an in-memory Tantivy index.
///
/// Writes are committed and made searchable before they return.
#[derive(Clone)]
pub struct EmbeddedStore {
    inner: Arc<Inner>,
}

impl EmbeddedStore {
    pub fn new() -> Result<Self, StoreError> {
        let (schema, fields) = build_schema();
        let index = Index::create_in_ram(schema);
        let writer = index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?;
        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        Ok(Self {
            inner: Arc::new(Inner {
                index,
                reader,
                writer: Mutex::new(writer),
                fields,
            }),
        })
    }

    /// Runs blocking index work off the async runtime
    async fn run<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> Result<T, StoreError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || work(&inner))
            .await
            .map_err(|e| StoreError::Internal(format!("index task failed: {e}")))?
    }
}

impl Inner {
    fn lock_writer(&self) -> Result<std::sync::MutexGuard<'_, IndexWriter>, StoreError> {
        self.writer
            .lock()
            .map_err(|_| StoreError::Internal("index writer lock poisoned".to_string()))
    }

    /// Commits pending writes and makes them visible to searchers
    fn commit(&self, writer: &mut IndexWriter) -> Result<(), StoreError> {
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    fn to_document(&self, id: &str, offer: &JobOffer) -> Document {
        let f = &self.fields;
        let mut doc = Document::new();
        doc.add_text(f.id, id);

        let texts = [
            (f.job, &offer.job),
            (f.company, &offer.company),
            (f.address, &offer.address),
            (f.date, &offer.date),
            (f.link, &offer.link),
            (f.description, &offer.description),
        ];
        for (field, value) in texts {
            if let Some(text) = value {
                doc.add_text(field, text);
            }
        }
        if let Some(salary) = offer.salary {
            doc.add_f64(f.salary, salary);
        }
        doc
    }

    fn read_offer(&self, doc: &Document) -> Result<JobOffer, StoreError> {
        let f = &self.fields;
        let text = |field: Field| {
            doc.get_first(field)
                .and_then(|v| v.as_text())
                .map(str::to_string)
        };

        let id = text(f.id)
            .ok_or_else(|| StoreError::Internal("stored document has no id".to_string()))?;
        Ok(JobOffer {
            id: Some(id),
            job: text(f.job),
            company: text(f.company),
            address: text(f.address),
            date: text(f.date),
            link: text(f.link),
            salary: doc.get_first(f.salary).and_then(|v| v.as_f64()),
            description: text(f.description),
        })
    }

    fn id_term(&self, id: &str) -> Term {
        Term::from_field_text(self.fields.id, id)
    }

    /// Runs `query` and returns up to `limit` offers in score order
    fn collect(&self, query: &dyn Query, limit: usize) -> Result<Vec<JobOffer>, StoreError> {
        let searcher = self.reader.searcher();
        let top_docs = searcher.search(query, &TopDocs::with_limit(limit))?;

        top_docs
            .into_iter()
            .map(|(_score, address)| {
                let doc = searcher.doc(address)?;
                self.read_offer(&doc)
            })
            .collect()
    }

    fn find(&self, id: &str) -> Result<Option<JobOffer>, StoreError> {
        let query = TermQuery::new(self.id_term(id), IndexRecordOption::Basic);
        Ok(self.collect(&query, 1)?.into_iter().next())
    }

    /// Free-text query: every token of `text`, analyzed per search field,
    /// as an optional clause. Punctuation is never query syntax.
    fn text_query(&self, text: &str) -> Result<BooleanQuery, StoreError> {
        let f = &self.fields;
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();

        for field in [f.job, f.company, f.address, f.description] {
            let analyzer = self.index.tokenizer_for_field(field)?;
            let mut stream = analyzer.token_stream(text);
            while stream.advance() {
                let term = Term::from_field_text(field, &stream.token().text);
                let query = TermQuery::new(term, IndexRecordOption::WithFreqs);
                clauses.push((Occur::Should, Box::new(query)));
            }
        }
        Ok(BooleanQuery::new(clauses))
    }

    fn search(&self, query: Option<&str>) -> Result<Vec<JobOffer>, StoreError> {
        match query {
            Some(text) => {
                let query = self.text_query(text)?;
                self.collect(&query, DEFAULT_RESULT_WINDOW)
            }
            None => self.collect(&AllQuery, DEFAULT_RESULT_WINDOW),
        }
    }
}

#[async_trait]
impl DocumentStore for EmbeddedStore {
    async fn index(&self, source: &JobOffer, _refresh: bool) -> Result<String, StoreError> {
        let source = source.clone();
        self.run(move |inner| {
            let id = Uuid::new_v4().simple().to_string();
            let mut writer = inner.lock_writer()?;
            writer.add_document(inner.to_document(&id, &source))?;
            inner.commit(&mut writer)?;
            debug!(%id, "indexed job offer");
            Ok(id)
        })
        .await
    }

    async fn get(&self, id: &str) -> Result<Option<JobOffer>, StoreError> {
        let id = id.to_string();
        self.run(move |inner| inner.find(&id)).await
    }

    async fn update(&self, id: &str, patch: &JobOfferPatch) -> Result<(), StoreError> {
        let id = id.to_string();
        let patch = patch.clone();
        self.run(move |inner| {
            // Holding the writer serializes read-modify-write cycles
            let mut writer = inner.lock_writer()?;
            let mut offer = inner
                .find(&id)?
                .ok_or_else(|| StoreError::rejected(404, format!("[{id}]: document missing")))?;

            patch.apply_to(&mut offer);
            writer.delete_term(inner.id_term(&id));
            writer.add_document(inner.to_document(&id, &offer))?;
            inner.commit(&mut writer)
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let id = id.to_string();
        self.run(move |inner| {
            let mut writer = inner.lock_writer()?;
            if inner.find(&id)?.is_none() {
                return Err(StoreError::rejected(404, "not_found"));
            }
            writer.delete_term(inner.id_term(&id));
            inner.commit(&mut writer)
        })
        .await
    }

    async fn search(&self, query: Option<&str>) -> Result<Vec<JobOffer>, StoreError> {
        let query = query.map(str::to_string);
        self.run(move |inner| inner.search(query.as_deref())).await
    }
}
