//! Tantivy-based member search index.
//!
//! Members are indexed with their names, mails, study details and the names of
//! the teams they currently belong to. Fields are boosted individually.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::{Member, Team, TeamHistory};
use crate::roster::team_name;

const BOOST_NAME: f32 = 10.0;
const BOOST_MAILS: f32 = 6.0;
const BOOST_TEAMS: f32 = 4.0;
const BOOST_FIELD_OF_STUDY: f32 = 3.0;
const BOOST_NATIONALITIES: f32 = 2.0;

/// Search hit with relevance score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub member_id: i64,
    pub score: f32,
}

struct SearchFields {
    member_id: Field,
    name: Field,
    mails: Field,
    team_names: Field,
    field_of_study: Field,
    nationalities: Field,
}

/// Tantivy search index for members.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

impl SearchIndex {
    /// Create or open a search index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        let mut schema_builder = Schema::builder();
        // STRING so the id can be used as a delete term
        let member_id = schema_builder.add_text_field("member_id", STRING | STORED);
        let name = schema_builder.add_text_field("name", TEXT | STORED);
        let mails = schema_builder.add_text_field("mails", TEXT);
        let team_names = schema_builder.add_text_field("team_names", TEXT);
        let field_of_study = schema_builder.add_text_field("field_of_study", TEXT);
        let nationalities = schema_builder.add_text_field("nationalities", TEXT);
        let schema = schema_builder.build();

        let fields = SearchFields {
            member_id,
            name,
            mails,
            team_names,
            field_of_study,
            nationalities,
        };

        // Try to open existing index or create new one
        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema.clone()))
            .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Rebuild the entire index from the directory.
    pub async fn rebuild(
        &self,
        members: &[Member],
        teams: &[Team],
        histories: &[TeamHistory],
    ) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_all_documents()?;
        for member in members {
            writer.add_document(self.create_document(member, teams, histories))?;
        }
        writer.commit()?;

        // Reload reader to see new documents
        self.reader.reload()?;

        tracing::info!("Search index rebuilt with {} members", members.len());
        Ok(())
    }

    /// Index or re-index a single member.
    pub async fn index_member(
        &self,
        member: &Member,
        teams: &[Team],
        histories: &[TeamHistory],
    ) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(self.id_term(member.member_id));
        writer.add_document(self.create_document(member, teams, histories))?;
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Remove a member from the index.
    pub async fn remove_member(&self, member_id: i64) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(self.id_term(member_id));
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Search for members matching the query.
    pub fn search(
        &self,
        query_str: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SearchResult>, AppError> {
        if query_str.trim().is_empty() {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        let field_queries = [
            (self.fields.name, BOOST_NAME),
            (self.fields.mails, BOOST_MAILS),
            (self.fields.team_names, BOOST_TEAMS),
            (self.fields.field_of_study, BOOST_FIELD_OF_STUDY),
            (self.fields.nationalities, BOOST_NATIONALITIES),
        ];

        let query_parser = QueryParser::for_index(
            &self.index,
            field_queries.iter().map(|(field, _)| *field).collect(),
        );
        let base_query = query_parser
            .parse_query(query_str)
            .map_err(|e| AppError::Search(format!("Invalid search query: {}", e)))?;

        let mut subqueries: Vec<(Occur, Box<dyn tantivy::query::Query>)> = Vec::new();
        for (field, boost) in field_queries {
            let field_parser = QueryParser::for_index(&self.index, vec![field]);
            if let Ok(field_query) = field_parser.parse_query(query_str) {
                subqueries.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
            }
        }

        let combined_query = if subqueries.is_empty() {
            base_query
        } else {
            Box::new(BooleanQuery::new(subqueries))
        };

        let top_docs = searcher
            .search(&combined_query, &TopDocs::with_limit(limit + offset))
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let results: Vec<SearchResult> = top_docs
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let member_id = doc
                    .get_first(self.fields.member_id)?
                    .as_str()?
                    .parse()
                    .ok()?;
                Some(SearchResult { member_id, score })
            })
            .collect();

        Ok(results)
    }

    fn id_term(&self, member_id: i64) -> Term {
        Term::from_field_text(self.fields.member_id, &member_id.to_string())
    }

    fn create_document(
        &self,
        member: &Member,
        teams: &[Team],
        histories: &[TeamHistory],
    ) -> TantivyDocument {
        let mails: Vec<&str> = [
            Some(member.orbit_mail.as_str()),
            member.ntnu_mail.as_deref(),
            member.personal_mail.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();

        let team_names: Vec<String> = histories
            .iter()
            .filter(|h| h.member_id == member.member_id && h.is_open())
            .map(|h| team_name(teams, h.team_id))
            .collect();

        doc!(
            self.fields.member_id => member.member_id.to_string(),
            self.fields.name => member.full_name(),
            self.fields.mails => mails.join(" "),
            self.fields.team_names => team_names.join(" "),
            self.fields.field_of_study => member.field_of_study.clone(),
            self.fields.nationalities => member.nationalities.clone().unwrap_or_default()
        )
    }
}
