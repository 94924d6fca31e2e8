//! End-to-end completion queries against on-disk workspaces.

use skiff_lsp::document::DocumentStore;
use skiff_lsp::query::{QueryEngine, QueryError, render_candidates};
use skiff_lsp::workspace::{WorkspaceManager, canonical};
use skiff_syntax::Position;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
    documents: Arc<DocumentStore>,
    engine: QueryEngine,
}

impl Fixture {
    fn new(files: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = canonical(dir.path());
        for (rel, content) in files {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, content).unwrap();
        }

        let documents = Arc::new(DocumentStore::new());
        let workspace = Arc::new(WorkspaceManager::new());
        workspace.set_roots(vec![root.clone()]);
        workspace.reload();
        let engine = QueryEngine::new(workspace, documents.clone());

        Self {
            _dir: dir,
            root,
            documents,
            engine,
        }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    fn open(&self, rel: &str, content: &str) {
        let path = self.path(rel);
        let uri = format!("file://{}", path.display());
        self.documents.open(path, uri, 1, content.to_string());
    }

    async fn render_at(&self, rel: &str, line: u32, column: u32) -> String {
        let candidates = self
            .engine
            .completion_at(
                &self.path(rel),
                Position::new(line, column),
                true,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        render_candidates(&candidates)
    }
}

#[tokio::test]
async fn completes_symbol_from_sibling_file() {
    let fx = Fixture::new(&[
        ("p/b.sk", "package p; func B() { A() }"),
        ("p/a.sk", "package p\n\nfunc A() {}\n"),
    ]);

    let rendered = fx.render_at("p/b.sk", 0, 23).await;
    assert_eq!(rendered, "1:23-1:24 A function func()");
}

#[tokio::test]
async fn completes_exported_symbol_of_imported_package() {
    let fx = Fixture::new(&[
        (
            "p/a.sk",
            "package p; import \"fmt\"; func f() { fmt.Println() }",
        ),
        (
            "fmt/fmt.sk",
            "package fmt\n\nfunc Println(a ...any) (n int, err error) {}\n",
        ),
    ]);

    let rendered = fx.render_at("p/a.sk", 0, 47).await;
    assert_eq!(
        rendered,
        "1:41-1:48 Println function func(a ...any) (n int, err error)"
    );
}

#[tokio::test]
async fn completes_import_paths_by_prefix() {
    let fx = Fixture::new(&[
        ("p/a.sk", "package p; import \"f\""),
        ("flag/flag.sk", "package flag\n"),
        ("fmt/fmt.sk", "package fmt\n"),
    ]);

    let rendered = fx.render_at("p/a.sk", 0, 20).await;
    assert_eq!(rendered, "1:20-1:21 flag module , fmt module ");
}

#[tokio::test]
async fn completes_vendored_import_path() {
    let fx = Fixture::new(&[
        ("p/a.sk", "package p; import \"github.com/example/dep\""),
        ("vendor/github.com/example/dep/dep.sk", "package dep\n"),
    ]);

    let rendered = fx.render_at("p/a.sk", 0, 41).await;
    assert_eq!(rendered, "1:20-1:42 github.com/example/dep module ");
}

#[tokio::test]
async fn unsaved_overlay_shapes_completion() {
    let disk = "package p\n\nvar alpha = 1\n\nfunc f() {\n    pla\n}\n";
    let fx = Fixture::new(&[("p/a.sk", disk)]);
    fx.open(
        "p/a.sk",
        "package p\n\nvar plan1 = 1\n\nfunc f() {\n    pla\n}\n",
    );

    // Live overlay: the unsaved `plan1` is offered.
    let candidates = fx
        .engine
        .completion_at(
            &fx.path("p/a.sk"),
            Position::new(5, 7),
            true,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    let labels: Vec<_> = candidates.iter().map(|c| &*c.label).collect();
    assert_eq!(labels, vec!["plan1"]);

    // Cached index: the stale on-disk view wins over the overlay.
    let candidates = fx
        .engine
        .completion_at(
            &fx.path("p/a.sk"),
            Position::new(5, 7),
            false,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(candidates.iter().all(|c| &*c.label != "plan1"));
}

#[tokio::test]
async fn repeated_queries_are_idempotent() {
    let fx = Fixture::new(&[("p/a.sk", "package p\n\nvar alpha int\n\nfunc f() {\n    al\n}\n")]);

    let first = fx.render_at("p/a.sk", 5, 6).await;
    let second = fx.render_at("p/a.sk", 5, 6).await;
    assert_eq!(first, second);
    assert!(first.contains("alpha variable int"));
}

#[tokio::test]
async fn candidates_share_one_range_ending_at_the_cursor() {
    let fx = Fixture::new(&[("p/a.sk", "package p; func f() { p }")]);

    let position = Position::new(0, 23);
    let candidates = fx
        .engine
        .completion_at(&fx.path("p/a.sk"), position, true, &CancellationToken::new())
        .await
        .unwrap();

    assert!(!candidates.is_empty());
    let start = candidates[0].start;
    let end = candidates[0].end;
    assert_eq!(end, position);
    assert!(candidates.iter().all(|c| c.start == start && c.end == end));
}

#[tokio::test]
async fn concurrent_completions_run_one_analysis() {
    let fx = Fixture::new(&[(
        "p/a.sk",
        "package p\n\nvar alpha int\n\nfunc f() {\n    al\n}\n",
    )]);

    let path = fx.path("p/a.sk");
    let at = || {
        let path = path.clone();
        let engine = &fx.engine;
        async move {
            engine
                .completion_at(&path, Position::new(5, 6), true, &CancellationToken::new())
                .await
        }
    };

    let (a, b, c, d, e, f, g, h) =
        tokio::join!(at(), at(), at(), at(), at(), at(), at(), at());
    let first = a.unwrap();
    for other in [b, c, d, e, f, g, h] {
        assert_eq!(other.unwrap(), first);
    }

    assert_eq!(fx.engine.analysis_runs(), 1);
}

#[tokio::test]
async fn pre_cancelled_query_reports_cancelled() {
    let fx = Fixture::new(&[("p/a.sk", "package p\n")]);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = fx
        .engine
        .completion_at(&fx.path("p/a.sk"), Position::new(0, 0), true, &cancel)
        .await
        .unwrap_err();
    assert_eq!(err, QueryError::Cancelled);
}

#[tokio::test]
async fn file_outside_workspace_is_unsupported() {
    let fx = Fixture::new(&[("p/a.sk", "package p\n")]);

    let elsewhere = tempfile::tempdir().unwrap();
    let outside = elsewhere.path().join("a.sk");
    std::fs::write(&outside, "package q\n").unwrap();

    let err = fx
        .engine
        .completion_at(
            &outside,
            Position::new(0, 0),
            true,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::UnsupportedLocation { .. }));
}

#[tokio::test]
async fn typing_a_new_import_completes_while_unresolved() {
    let fx = Fixture::new(&[
        ("p/a.sk", "package p\n"),
        ("net/http/http.sk", "package http\n"),
    ]);
    // Unterminated string, exactly as it looks mid-keystroke.
    fx.open("p/a.sk", "package p\n\nimport \"net/h");

    let candidates = fx
        .engine
        .completion_at(
            &fx.path("p/a.sk"),
            Position::new(2, 13),
            true,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    let labels: Vec<_> = candidates.iter().map(|c| &*c.label).collect();
    assert_eq!(labels, vec!["net/http"]);
}
