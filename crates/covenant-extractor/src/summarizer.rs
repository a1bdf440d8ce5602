//! Field retrieval and summarization
//!
//! The conversation is seeded with passages from vector and full-text
//! search, then the model may ask for more through the `retrieve` tool.
//! Tool rounds are bounded; once the budget is spent the model is asked to
//! answer without tools.

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::prompt::{
    format_passages, retrieval_query, retrieve_tool, SummaryPromptBuilder,
    BUDGET_EXHAUSTED_NOTICE, RETRIEVE_TOOL,
};
use crate::types::FieldSummary;
use covenant_domain::traits::{Embedder, LlmProvider, VectorStore};
use covenant_domain::{
    CompletionReply, CompletionRequest, FieldSpec, Message, SearchHit, ToolCall,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Produces a free-text summary of what a contract says about one field
pub struct FieldSummarizer<L, E, S> {
    llm: Arc<L>,
    embedder: Arc<E>,
    store: Arc<S>,
    config: ExtractorConfig,
}

impl<L, E, S> FieldSummarizer<L, E, S>
where
    L: LlmProvider,
    E: Embedder,
    S: VectorStore,
{
    /// Create a new summarizer
    pub fn new(llm: Arc<L>, embedder: Arc<E>, store: Arc<S>, config: ExtractorConfig) -> Self {
        Self {
            llm,
            embedder,
            store,
            config,
        }
    }

    /// Passages for `query` from `document_id`, deduplicated by content
    ///
    /// Vector hits come first, followed by full-text hits when the store
    /// supports lexical search.
    pub async fn retrieve(
        &self,
        query: &str,
        document_id: &str,
        collection: &str,
    ) -> Result<Vec<SearchHit>, ExtractorError> {
        let document_ids = [document_id.to_string()];
        let vector = self
            .embedder
            .embed_query(query)
            .await
            .map_err(ExtractorError::embedding)?;
        let mut hits = self
            .store
            .search_by_vector(collection, &vector, &document_ids, self.config.vector_top_k)
            .await
            .map_err(ExtractorError::store)?;

        if self.store.supports_full_text() && self.config.full_text_top_k > 0 {
            let lexical = self
                .store
                .search_full_text(collection, query, &document_ids, self.config.full_text_top_k)
                .await
                .map_err(ExtractorError::store)?;
            hits.extend(lexical);
        }

        let mut seen = HashSet::new();
        hits.retain(|hit| seen.insert(hit.content.clone()));
        Ok(hits)
    }

    /// Summarize everything the document says about `field`
    pub async fn summarize(
        &self,
        field: &FieldSpec,
        document_id: &str,
        collection: &str,
    ) -> Result<FieldSummary, ExtractorError> {
        let query = retrieval_query(field);
        let seed = self.retrieve(&query, document_id, collection).await?;
        if seed.is_empty() {
            return Err(ExtractorError::NoContext(field.name.clone()));
        }
        debug!("Field '{}' seeded with {} passages", field.name, seed.len());

        let mut shown: HashSet<String> = seed.iter().map(|hit| hit.content.clone()).collect();
        let mut messages = SummaryPromptBuilder::new(field, &seed).build();
        let tools = vec![retrieve_tool()];

        for round in 0..self.config.max_tool_iterations {
            let request = CompletionRequest::new(messages.clone())
                .with_tools(tools.clone())
                .with_temperature(self.config.temperature);
            let reply = self.llm.complete(request).await.map_err(ExtractorError::llm)?;

            if reply.tool_calls.is_empty() {
                return self.finish(field, &reply, shown.len());
            }

            debug!(
                "Field '{}' round {}: {} tool call(s)",
                field.name,
                round + 1,
                reply.tool_calls.len()
            );
            messages.push(Message::assistant(
                reply.content.clone().unwrap_or_default(),
                reply.tool_calls.clone(),
            ));
            for call in &reply.tool_calls {
                let result = self
                    .run_tool(call, document_id, collection, &mut shown)
                    .await?;
                messages.push(Message::tool(call.id.clone(), result));
            }
        }

        info!(
            "Field '{}' used all {} retrieval rounds; requesting final answer",
            field.name, self.config.max_tool_iterations
        );
        messages.push(Message::user(BUDGET_EXHAUSTED_NOTICE));
        let request = CompletionRequest::new(messages).with_temperature(self.config.temperature);
        let reply = self.llm.complete(request).await.map_err(ExtractorError::llm)?;
        self.finish(field, &reply, shown.len())
    }

    async fn run_tool(
        &self,
        call: &ToolCall,
        document_id: &str,
        collection: &str,
        shown: &mut HashSet<String>,
    ) -> Result<String, ExtractorError> {
        if call.name != RETRIEVE_TOOL {
            return Ok(format!(
                "Unknown tool '{}'. Only '{}' is available.",
                call.name, RETRIEVE_TOOL
            ));
        }
        let Some(query) = call.argument_str("query").filter(|q| !q.trim().is_empty()) else {
            return Ok("The retrieve tool needs a non-empty 'query' argument.".to_string());
        };

        let hits = self.retrieve(query, document_id, collection).await?;
        debug!("Tool query '{}' returned {} passages", query, hits.len());
        for hit in &hits {
            shown.insert(hit.content.clone());
        }
        Ok(format_passages(&hits))
    }

    fn finish(
        &self,
        field: &FieldSpec,
        reply: &CompletionReply,
        passages_used: usize,
    ) -> Result<FieldSummary, ExtractorError> {
        let text = reply.answer().ok_or_else(|| {
            ExtractorError::MalformedOutput(format!("empty summary for field '{}'", field.name))
        })?;
        Ok(FieldSummary {
            field_name: field.name.clone(),
            kind: field.kind,
            summary_text: text.to_string(),
            passages_used,
        })
    }
}
