use std::io::{Cursor, Read, Write};
use std::sync::mpsc as std_mpsc;
use std::time::Duration;

use kommissar_cli::feed::FeedFormat;
use kommissar_cli::{run, run_blocking};
use kommissar_index::SharedTree;
use tempfile::NamedTempFile;
use tokio::io::{AsyncWriteExt, BufReader};

fn pod_line(rv: &str) -> String {
    format!(
        r#"{{"type":"MODIFIED","object":{{"kind":"Pod","apiVersion":"v1","metadata":{{"name":"my-pod-1","namespace":"default","resourceVersion":"{rv}"}}}}}}"#
    )
}

fn node_line(name: &str, rv: &str) -> String {
    format!(
        r#"{{"type":"ADDED","object":{{"kind":"Node","apiVersion":"v1","metadata":{{"name":"{name}","resourceVersion":"{rv}"}}}}}}"#
    )
}

/// A blocking reader that yields `data` once, then blocks like an idle pipe
/// until `gate`'s sender is dropped.
struct IdlePipe {
    data: Option<Vec<u8>>,
    gate: std_mpsc::Receiver<()>,
}

impl Read for IdlePipe {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if let Some(data) = self.data.take() {
            let n = data.len().min(buf.len());
            buf[..n].copy_from_slice(&data[..n]);
            return Ok(n);
        }
        let _ = self.gate.recv();
        Ok(0)
    }
}

#[tokio::test]
async fn bad_lines_are_skipped_not_fatal() {
    let mut feed = String::new();
    for rv in ["1", "2", "3", "4"] {
        feed.push_str(&pod_line(rv));
        feed.push('\n');
    }
    feed.push_str("{ this is not json\n");
    feed.push_str(r#"{"type":"ADDED","object":{"apiVersion":"v1","metadata":{"name":"kindless"}}}"#);
    feed.push('\n');
    feed.push_str(&pod_line("4"));
    feed.push('\n');

    let tree = SharedTree::new();
    let summary = run(
        &tree,
        Cursor::new(feed.into_bytes()),
        FeedFormat::Watch,
        2,
        std::future::pending(),
    )
    .await
    .expect("run should succeed");

    assert_eq!(summary.ingested, 5);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.decode_failures, 1);
    assert_eq!(summary.leaves, 4);
    // root, v1, Pod, default, my-pod-1, four leaves
    assert_eq!(summary.nodes, 9);

    let children = tree
        .read(|t| {
            t.find(&["v1", "Pod", "default", "my-pod-1"])
                .map(|n| n.children().map(|c| c.label().to_string()).collect::<Vec<_>>())
        })
        .expect("read should succeed")
        .expect("name node should exist");
    assert_eq!(children, vec!["#1", "#2", "#3", "#4"]);
}

#[tokio::test]
async fn reads_feed_from_file() {
    let mut file = NamedTempFile::new().expect("should create temp file");
    writeln!(file, "{}", node_line("node-a", "1")).expect("write");
    writeln!(file, "{}", node_line("node-b", "1")).expect("write");
    file.flush().expect("flush");

    let handle = tokio::fs::File::open(file.path())
        .await
        .expect("should open feed file");
    let tree = SharedTree::new();
    let summary = run(
        &tree,
        BufReader::new(handle),
        FeedFormat::Watch,
        16,
        std::future::pending(),
    )
    .await
    .expect("run should succeed");

    assert_eq!(summary.ingested, 2);
    let outline = tree
        .read(|t| t.render_outline())
        .expect("read should succeed");
    assert_eq!(
        outline,
        "*\n  v1\n    Node\n      node-a\n        #1\n      node-b\n        #1\n"
    );
}

#[tokio::test]
async fn shutdown_stops_an_open_feed() {
    let (mut writer, reader) = tokio::io::duplex(1024);
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let tree = SharedTree::new();
    let task_tree = tree.clone();
    let task = tokio::spawn(async move {
        run(
            &task_tree,
            BufReader::new(reader),
            FeedFormat::Watch,
            4,
            async move {
                let _ = stop_rx.await;
            },
        )
        .await
    });

    writer
        .write_all(format!("{}\n", node_line("node-a", "1")).as_bytes())
        .await
        .expect("write should succeed");

    // Wait until the event is indexed, then stop while the writer stays open.
    for _ in 0..100 {
        let leaves = tree.read(|t| t.leaf_count()).expect("read should succeed");
        if leaves == 1 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    stop_tx.send(()).expect("run should still be waiting");

    let summary = task
        .await
        .expect("task should not panic")
        .expect("run should succeed");
    assert_eq!(summary.ingested, 1);
    assert_eq!(summary.leaves, 1);
    drop(writer);
}

#[tokio::test]
async fn object_format_feed() {
    let feed = concat!(
        r#"{"kind":"Namespace","apiVersion":"v1","metadata":{"name":"default","resourceVersion":"3"}}"#,
        "\n",
        r#"{"kind":"Deployment","apiVersion":"apps/v1","metadata":{"name":"coredns","namespace":"kube-system","resourceVersion":"9"}}"#,
        "\n",
    );

    let tree = SharedTree::new();
    let summary = run(
        &tree,
        Cursor::new(feed.as_bytes().to_vec()),
        FeedFormat::Object,
        8,
        std::future::pending(),
    )
    .await
    .expect("run should succeed");

    assert_eq!(summary.ingested, 2);
    let paths = tree
        .read(|t| t.leaves().map(|l| t.path_of(l.id())).collect::<Vec<_>>())
        .expect("read should succeed");
    assert_eq!(
        paths,
        vec![
            vec!["*", "v1", "Namespace", "default", "#3"],
            vec!["*", "apps/v1", "Deployment", "kube-system", "coredns", "#9"],
        ]
    );
}

#[tokio::test]
async fn bookmark_and_error_events_are_not_indexed() {
    let feed = [
        node_line("node-a", "1"),
        r#"{"type":"BOOKMARK","object":{"kind":"Node","apiVersion":"v1","metadata":{"resourceVersion":"12"}}}"#.to_string(),
        r#"{"type":"ERROR","object":{"kind":"Status","apiVersion":"v1","metadata":{},"code":410}}"#.to_string(),
        node_line("node-b", "2"),
    ]
    .join("\n");

    let tree = SharedTree::new();
    let summary = run(
        &tree,
        Cursor::new(feed.into_bytes()),
        FeedFormat::Watch,
        4,
        std::future::pending(),
    )
    .await
    .expect("run should succeed");

    assert_eq!(summary.ingested, 2);
    assert_eq!(summary.ignored, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.leaves, 2);
    let outline = tree
        .read(|t| t.render_outline())
        .expect("read should succeed");
    assert_eq!(
        outline,
        "*\n  v1\n    Node\n      node-a\n        #1\n      node-b\n        #2\n"
    );
}

#[tokio::test]
async fn blocking_reader_feed_runs_to_end() {
    let feed = format!("{}\nnot json\n{}\n", node_line("node-a", "1"), pod_line("7"));

    let tree = SharedTree::new();
    let summary = run_blocking(
        &tree,
        std::io::BufReader::new(Cursor::new(feed.into_bytes())),
        FeedFormat::Watch,
        1,
        std::future::pending(),
    )
    .await
    .expect("run should succeed");

    assert_eq!(summary.ingested, 2);
    assert_eq!(summary.decode_failures, 1);
    assert_eq!(summary.leaves, 2);
}

#[tokio::test]
async fn shutdown_returns_while_blocking_reader_is_idle() {
    let (gate_tx, gate_rx) = std_mpsc::channel::<()>();
    let pipe = IdlePipe {
        data: Some(format!("{}\n", node_line("node-a", "1")).into_bytes()),
        gate: gate_rx,
    };
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let tree = SharedTree::new();
    let watcher = tree.clone();
    tokio::spawn(async move {
        for _ in 0..200 {
            let leaves = watcher.read(|t| t.leaf_count()).expect("read should succeed");
            if leaves == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let _ = stop_tx.send(());
    });

    // The reader thread is still blocked in `read` when shutdown fires.
    let summary = tokio::time::timeout(
        Duration::from_secs(5),
        run_blocking(
            &tree,
            std::io::BufReader::new(pipe),
            FeedFormat::Watch,
            4,
            async move {
                let _ = stop_rx.await;
            },
        ),
    )
    .await
    .expect("shutdown should not wait for the idle reader")
    .expect("run should succeed");

    assert_eq!(summary.ingested, 1);
    assert_eq!(summary.leaves, 1);
    drop(gate_tx);
}
