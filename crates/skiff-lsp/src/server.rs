//! The tower-lsp server surface.
//!
//! Handlers translate between protocol types and the query engine;
//! resolution policy lives in [`crate::query`], not here.

use crate::config::ServerConfig;
use crate::document::{DocumentStore, SharedDocumentStore};
use crate::query::{Candidate, CandidateKind, QueryEngine, QueryError};
use crate::workspace::{SharedWorkspaceManager, WorkspaceManager, canonical};
use skiff_syntax::{ParseError, SourceText, TextRange};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_lsp::jsonrpc;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, info};

pub struct SkiffLanguageServer {
    client: Client,
    documents: SharedDocumentStore,
    workspace: SharedWorkspaceManager,
    engine: QueryEngine,
}

impl SkiffLanguageServer {
    pub fn new(client: Client) -> Self {
        let documents: SharedDocumentStore = Arc::new(DocumentStore::new());
        let workspace: SharedWorkspaceManager = Arc::new(WorkspaceManager::new());
        let engine = QueryEngine::new(workspace.clone(), documents.clone());
        Self {
            client,
            documents,
            workspace,
            engine,
        }
    }

    /// Parse the open document and publish its errors as diagnostics.
    async fn publish_parse_diagnostics(&self, uri: Url, path: &PathBuf) {
        let published = self.documents.with_document_mut(path, |doc| {
            let version = doc.version;
            let text = doc.text.clone();
            let diagnostics = doc
                .parse()
                .errors
                .iter()
                .filter_map(|err| parse_error_diagnostic(err, &text))
                .collect::<Vec<_>>();
            (version, diagnostics)
        });

        if let Some((version, diagnostics)) = published {
            self.client
                .publish_diagnostics(uri, diagnostics, Some(version))
                .await;
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for SkiffLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> jsonrpc::Result<InitializeResult> {
        self.workspace
            .set_config(ServerConfig::from_value(params.initialization_options));

        let mut roots: Vec<PathBuf> = params
            .workspace_folders
            .unwrap_or_default()
            .iter()
            .filter_map(|folder| folder.uri.to_file_path().ok())
            .collect();
        if roots.is_empty() {
            #[allow(deprecated)]
            if let Some(root) = params.root_uri.and_then(|uri| uri.to_file_path().ok()) {
                roots.push(root);
            }
        }
        self.workspace.set_roots(roots);
        self.workspace.reload();

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        save: Some(TextDocumentSyncSaveOptions::Supported(true)),
                        ..Default::default()
                    },
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![".".into(), "\"".into()]),
                    ..Default::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "skiff-lsp".into(),
                version: Some(env!("CARGO_PKG_VERSION").into()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("Server initialized");
        self.client
            .log_message(MessageType::INFO, "Skiff language server ready")
            .await;
    }

    async fn shutdown(&self) -> jsonrpc::Result<()> {
        info!("Shutting down");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        let Some(path) = uri_path(&doc.uri) else { return };
        self.documents
            .open(path.clone(), doc.uri.to_string(), doc.version, doc.text);
        self.publish_parse_diagnostics(doc.uri, &path).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let Some(path) = uri_path(&params.text_document.uri) else {
            return;
        };
        // Full sync; the last change carries the whole text.
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        self.documents
            .update(&path, params.text_document.version, change.text);
        self.publish_parse_diagnostics(params.text_document.uri, &path)
            .await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        if let Some(path) = uri_path(&params.text_document.uri) {
            self.documents.close(&path);
        }
        self.client
            .publish_diagnostics(params.text_document.uri, Vec::new(), None)
            .await;
    }

    async fn did_save(&self, _: DidSaveTextDocumentParams) {
        self.workspace.reload();
    }

    async fn did_change_watched_files(&self, _: DidChangeWatchedFilesParams) {
        self.workspace.reload();
    }

    async fn completion(
        &self,
        params: CompletionParams,
    ) -> jsonrpc::Result<Option<CompletionResponse>> {
        let position = params.text_document_position;
        let Some(path) = uri_path(&position.text_document.uri) else {
            return Ok(None);
        };

        let cancel = CancellationToken::new();
        let result = self
            .engine
            .completion_at(&path, from_lsp(position.position), true, &cancel)
            .await;

        match result {
            Ok(candidates) => Ok(Some(CompletionResponse::Array(
                candidates.into_iter().map(completion_item).collect(),
            ))),
            Err(err) => query_error_response(err),
        }
    }

    async fn hover(&self, params: HoverParams) -> jsonrpc::Result<Option<Hover>> {
        let position = params.text_document_position_params;
        let Some(path) = uri_path(&position.text_document.uri) else {
            return Ok(None);
        };

        let cancel = CancellationToken::new();
        match self
            .engine
            .hover_at(&path, from_lsp(position.position), &cancel)
            .await
        {
            Ok(info) => Ok(info.map(|info| {
                let mut value = format!("```skiff\n{}", info.name);
                if !info.detail.is_empty() {
                    value.push(' ');
                    value.push_str(&info.detail);
                }
                value.push_str(&format!("\n```\n*{}*", info.kind.as_str()));
                Hover {
                    contents: HoverContents::Markup(MarkupContent {
                        kind: MarkupKind::Markdown,
                        value,
                    }),
                    range: Some(Range {
                        start: to_lsp(info.start),
                        end: to_lsp(info.end),
                    }),
                }
            })),
            Err(err) => query_error_response(err),
        }
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> jsonrpc::Result<Option<GotoDefinitionResponse>> {
        let position = params.text_document_position_params;
        let Some(path) = uri_path(&position.text_document.uri) else {
            return Ok(None);
        };

        let cancel = CancellationToken::new();
        match self
            .engine
            .definition_at(&path, from_lsp(position.position), &cancel)
            .await
        {
            Ok(target) => {
                let location = target.and_then(|target| {
                    let uri = Url::from_file_path(&target.unit.path).ok()?;
                    let (start, end) = target.unit.text.range_positions(target.range).ok()?;
                    Some(Location {
                        uri,
                        range: Range {
                            start: to_lsp(start),
                            end: to_lsp(end),
                        },
                    })
                });
                Ok(location.map(GotoDefinitionResponse::Scalar))
            }
            Err(err) => query_error_response(err),
        }
    }
}

/// Canonical filesystem path of a `file:` URI.
fn uri_path(uri: &Url) -> Option<PathBuf> {
    uri.to_file_path().ok().map(|p| canonical(&p))
}

fn from_lsp(position: Position) -> skiff_syntax::Position {
    skiff_syntax::Position::new(position.line, position.character)
}

fn to_lsp(position: skiff_syntax::Position) -> Position {
    Position {
        line: position.line,
        character: position.column,
    }
}

/// Map a failed query onto the protocol: analysis failures are an empty
/// response, bad requests are errors.
fn query_error_response<T>(err: QueryError) -> jsonrpc::Result<Option<T>> {
    match err {
        QueryError::Resolution { .. } => {
            debug!("Query found nothing: {err}");
            Ok(None)
        }
        QueryError::Cancelled => Err(jsonrpc::Error::request_cancelled()),
        QueryError::UnsupportedLocation { .. } | QueryError::OutOfRange(_) => {
            Err(jsonrpc::Error::invalid_params(err.to_string()))
        }
    }
}

fn parse_error_diagnostic(err: &ParseError, text: &SourceText) -> Option<Diagnostic> {
    let range = clamp_range(err.range, text);
    let (start, end) = text.range_positions(range).ok()?;
    Some(Diagnostic {
        range: Range {
            start: to_lsp(start),
            end: to_lsp(end),
        },
        severity: Some(DiagnosticSeverity::ERROR),
        source: Some("skiff".into()),
        message: err.message.clone(),
        ..Default::default()
    })
}

/// Parse error ranges can point at the EOF sentinel; keep them inside
/// the text.
fn clamp_range(range: TextRange, text: &SourceText) -> TextRange {
    let len = text.len();
    TextRange::new(range.start().min(len), range.end().min(len))
}

fn completion_item(candidate: Candidate) -> CompletionItem {
    let range = Range {
        start: to_lsp(candidate.start),
        end: to_lsp(candidate.end),
    };
    CompletionItem {
        label: candidate.label.to_string(),
        kind: Some(completion_kind(candidate.kind)),
        detail: (!candidate.detail.is_empty()).then_some(candidate.detail),
        text_edit: Some(CompletionTextEdit::Edit(TextEdit {
            range,
            new_text: candidate.label.to_string(),
        })),
        ..Default::default()
    }
}

fn completion_kind(kind: CandidateKind) -> CompletionItemKind {
    match kind {
        CandidateKind::Function => CompletionItemKind::FUNCTION,
        CandidateKind::Method => CompletionItemKind::METHOD,
        CandidateKind::Field => CompletionItemKind::FIELD,
        CandidateKind::Variable => CompletionItemKind::VARIABLE,
        CandidateKind::Constant => CompletionItemKind::CONSTANT,
        CandidateKind::Class => CompletionItemKind::CLASS,
        CandidateKind::Module => CompletionItemKind::MODULE,
        CandidateKind::Keyword => CompletionItemKind::KEYWORD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_item_carries_shared_range() {
        let candidate = Candidate {
            label: Arc::from("Println"),
            kind: CandidateKind::Function,
            detail: "func(a ...any)".into(),
            start: skiff_syntax::Position::new(0, 40),
            end: skiff_syntax::Position::new(0, 47),
        };

        let item = completion_item(candidate);
        assert_eq!(item.label, "Println");
        assert_eq!(item.kind, Some(CompletionItemKind::FUNCTION));
        assert_eq!(item.detail.as_deref(), Some("func(a ...any)"));
        let Some(CompletionTextEdit::Edit(edit)) = item.text_edit else {
            panic!("expected a text edit");
        };
        assert_eq!(edit.range.start.character, 40);
        assert_eq!(edit.range.end.character, 47);
        assert_eq!(edit.new_text, "Println");
    }

    #[test]
    fn empty_detail_is_omitted() {
        let candidate = Candidate {
            label: Arc::from("fmt"),
            kind: CandidateKind::Module,
            detail: String::new(),
            start: skiff_syntax::Position::new(0, 19),
            end: skiff_syntax::Position::new(0, 20),
        };
        let item = completion_item(candidate);
        assert_eq!(item.detail, None);
        assert_eq!(item.kind, Some(CompletionItemKind::MODULE));
    }

    #[test]
    fn query_errors_map_to_protocol() {
        let missing: jsonrpc::Result<Option<()>> = query_error_response(QueryError::Resolution {
            path: PathBuf::from("/ws/a.sk"),
            source: crate::query::AnalysisError::MissingPackage {
                path: PathBuf::from("/ws/a.sk"),
            },
        });
        assert_eq!(missing, Ok(None));

        let cancelled: jsonrpc::Result<Option<()>> = query_error_response(QueryError::Cancelled);
        assert!(cancelled.is_err());

        let outside: jsonrpc::Result<Option<()>> =
            query_error_response(QueryError::UnsupportedLocation {
                path: PathBuf::from("/elsewhere/a.sk"),
            });
        assert_eq!(outside.unwrap_err().code, jsonrpc::ErrorCode::InvalidParams);
    }

    #[test]
    fn parse_errors_become_diagnostics() {
        let text = SourceText::new("func f() {}\n");
        let parse = skiff_syntax::parse(text.as_str());
        assert!(parse.has_errors());

        let diagnostics: Vec<_> = parse
            .errors
            .iter()
            .filter_map(|err| parse_error_diagnostic(err, &text))
            .collect();
        assert!(!diagnostics.is_empty());
        assert_eq!(diagnostics[0].source.as_deref(), Some("skiff"));
        assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::ERROR));
    }
}
