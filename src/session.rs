//! One interactive analysis session.
//!
//! A [`Session`] owns the conversation buffer and the three collaborators
//! of the pipeline. Each user action is one method:
//!
//! - [`Session::analyze`]: search → fetch → prompt → model
//! - [`Session::follow_up`]: ask another question on the same conversation
//! - [`Session::report`]: render the latest answer as a PDF report
//!
//! Only the control task mutates the conversation. A failed stage never
//! appends a partial entry: on a model error the user messages stay and no
//! assistant reply is added.

use crate::api::ChatModel;
use crate::conversation::ConversationState;
use crate::error::{FetchError, ModelError, ReportError, SearchError};
use crate::models::{ConversationMessage, ReportRequest};
use crate::outputs::render_report;
use crate::prompt::build_prompt;
use crate::scrapers::Extractor;
use crate::scrapers::batch::fetch_all;
use crate::search::NewsSearch;
use crate::utils::report_filename;
use chrono::{DateTime, Local};
use tracing::{info, instrument, warn};

/// What happened during one [`Session::analyze`] call.
#[derive(Debug)]
pub struct Analysis {
    /// Set when the search provider failed; `links` is then empty.
    pub search_error: Option<SearchError>,
    /// Article links in search order.
    pub links: Vec<String>,
    /// Number of articles that produced text.
    pub fetched: usize,
    /// One entry per link that could not be fetched, in completion order.
    pub fetch_errors: Vec<FetchError>,
    /// `None` when no links were found and the model was not called.
    pub reply: Option<Result<String, ModelError>>,
}

/// A rendered report ready to be saved.
#[derive(Debug)]
pub struct RenderedReport {
    /// `relatorio_executivo_YYYYMMDD_HHMM.pdf`
    pub filename: String,
    /// The PDF file contents.
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
struct AnalysisContext {
    topic: String,
    directive: String,
    sources: Vec<String>,
}

/// Conversation plus the search, extraction and model collaborators.
///
/// # Examples
///
/// ```ignore
/// let mut session = Session::new(search, extractor, model);
/// let analysis = session.analyze("taxa Selic", "resuma em 3 pontos", |_| {}).await;
/// let reply = session.follow_up("E o impacto no crédito?").await?;
/// let report = session.report(Local::now())?;
/// ```
pub struct Session<S, E, M> {
    search: S,
    extractor: E,
    model: M,
    conversation: ConversationState,
    last_analysis: Option<AnalysisContext>,
}

impl<S, E, M> Session<S, E, M>
where
    S: NewsSearch,
    E: Extractor,
    M: ChatModel,
{
    /// Start a session with an empty conversation and no analysis yet.
    pub fn new(search: S, extractor: E, model: M) -> Self {
        Self {
            search,
            extractor,
            model,
            conversation: ConversationState::new(),
            last_analysis: None,
        }
    }

    /// Read-only view of the conversation.
    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    /// Name of the model answering this session.
    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Run the full pipeline for `topic` and `directive`.
    ///
    /// # Arguments
    ///
    /// * `topic` - News search query
    /// * `directive` - What the analyst should focus on
    /// * `on_progress` - Receives the completed fraction of the article
    ///   fetches, once per finished fetch
    ///
    /// # Returns
    ///
    /// An [`Analysis`] describing every stage. When no links are found the
    /// conversation is left untouched and `reply` is `None`.
    #[instrument(level = "info", skip(self, on_progress))]
    pub async fn analyze<P>(&mut self, topic: &str, directive: &str, on_progress: P) -> Analysis
    where
        P: FnMut(f64),
    {
        let (links, search_error) = match self.search.search(topic).await {
            Ok(results) => (results.into_iter().map(|r| r.url).collect::<Vec<_>>(), None),
            Err(e) => {
                warn!(error = %e, "Search failed; treating as no results");
                (Vec::new(), Some(e))
            }
        };

        if links.is_empty() {
            info!("No links found; skipping fetch and model call");
            return Analysis {
                search_error,
                links,
                fetched: 0,
                fetch_errors: Vec::new(),
                reply: None,
            };
        }

        let report = fetch_all(&self.extractor, &links, on_progress).await;
        let prompt = build_prompt(topic, directive, &report.combined_text());

        self.conversation.append(ConversationMessage::hidden_user(prompt));
        self.conversation
            .append(ConversationMessage::user(format!("Diretriz: {directive}")));
        let context = AnalysisContext {
            topic: topic.to_string(),
            directive: directive.to_string(),
            sources: report.documents.iter().map(|d| d.source.clone()).collect(),
        };

        let reply = self.ask().await;
        // the report pairs the latest answer with the analysis that produced it
        if reply.is_ok() {
            self.last_analysis = Some(context);
        }
        Analysis {
            search_error,
            links,
            fetched: report.documents.len(),
            fetch_errors: report.errors,
            reply: Some(reply),
        }
    }

    /// Append `question` and ask the model with the full history.
    ///
    /// On error the question stays in the conversation and no reply is added.
    #[instrument(level = "info", skip_all)]
    pub async fn follow_up(&mut self, question: &str) -> Result<String, ModelError> {
        self.conversation.append(ConversationMessage::user(question));
        self.ask().await
    }

    /// Render the latest assistant message as a report generated at `now`.
    ///
    /// Topic, directive and sources come from the most recent analysis whose
    /// model call succeeded.
    ///
    /// # Errors
    ///
    /// [`ReportError::NothingToReport`] before the first answer, or a PDF
    /// rendering error.
    #[instrument(level = "info", skip_all)]
    pub fn report(&self, now: DateTime<Local>) -> Result<RenderedReport, ReportError> {
        let analysis = self
            .conversation
            .last_assistant()
            .filter(|a| !a.trim().is_empty())
            .ok_or(ReportError::NothingToReport)?;

        let context = self.last_analysis.clone().unwrap_or_else(|| AnalysisContext {
            topic: "—".to_string(),
            directive: "—".to_string(),
            sources: Vec::new(),
        });
        let request = ReportRequest {
            topic: context.topic,
            directive: context.directive,
            analysis: analysis.to_string(),
            sources: context.sources,
            model: self.model.model_name().to_string(),
        };

        let bytes = render_report(&request, &now.format("%d/%m/%Y %H:%M").to_string())?;
        Ok(RenderedReport {
            filename: report_filename(&now),
            bytes,
        })
    }

    async fn ask(&mut self) -> Result<String, ModelError> {
        let reply = self.model.complete(self.conversation.messages()).await?;
        self.conversation
            .append(ConversationMessage::assistant(reply.clone()));
        Ok(reply)
    }
}
