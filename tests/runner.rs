//! End-to-end tests driving the runner with line-printing jobs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use jobtail::{Job, JobError, JobId, JobRunner, OutputReader, OutputWriter, RunnerError};

const LINE_PERIOD: Duration = Duration::from_millis(25);

/// Emits `Job Start`, then `line: N` on a fixed period until stopped.
struct TickerJob {
    halt: CancellationToken,
}

impl TickerJob {
    fn new() -> Self {
        Self {
            halt: CancellationToken::new(),
        }
    }
}

#[async_trait]
impl Job for TickerJob {
    async fn start(&self, _ctx: CancellationToken, writer: OutputWriter) -> Result<(), JobError> {
        writer.write_all(b"Job Start\n").await?;

        let halt = self.halt.clone();
        tokio::spawn(async move {
            let mut count = 0u32;
            loop {
                let line = format!("line: {count}\n");
                if writer.write_all(line.as_bytes()).await.is_err() {
                    return;
                }
                count += 1;
                tokio::select! {
                    _ = halt.cancelled() => {
                        let _ = writer.write_all(b"Job Stop\n").await;
                        return;
                    }
                    _ = sleep(LINE_PERIOD) => {}
                }
            }
        });
        Ok(())
    }

    async fn stop(&self, _ctx: CancellationToken) -> Result<(), JobError> {
        self.halt.cancel();
        Ok(())
    }
}

/// Writes a fixed payload and closes its writer: terminates on its own.
struct PrinterJob {
    payload: &'static [u8],
}

#[async_trait]
impl Job for PrinterJob {
    async fn start(&self, _ctx: CancellationToken, writer: OutputWriter) -> Result<(), JobError> {
        writer.write_all(self.payload).await?;
        writer.close().await;
        Ok(())
    }

    async fn stop(&self, _ctx: CancellationToken) -> Result<(), JobError> {
        Ok(())
    }
}

/// Starts like a ticker but refuses to stop.
struct StubbornJob {
    inner: TickerJob,
}

#[async_trait]
impl Job for StubbornJob {
    async fn start(&self, ctx: CancellationToken, writer: OutputWriter) -> Result<(), JobError> {
        self.inner.start(ctx, writer).await
    }

    async fn stop(&self, _ctx: CancellationToken) -> Result<(), JobError> {
        Err(JobError::Fail {
            reason: "refusing to stop".into(),
        })
    }
}

/// Fails before producing anything.
struct BrokenJob;

#[async_trait]
impl Job for BrokenJob {
    async fn start(&self, _ctx: CancellationToken, _writer: OutputWriter) -> Result<(), JobError> {
        Err(JobError::Fail {
            reason: "no such binary".into(),
        })
    }

    async fn stop(&self, _ctx: CancellationToken) -> Result<(), JobError> {
        Ok(())
    }
}

/// Polls `status` until `running` matches `want`, with a deadline.
async fn wait_for_running(runner: &JobRunner, id: &JobId, want: bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if runner
            .status(id)
            .await
            .is_some_and(|s| s.running == want)
        {
            return true;
        }
        sleep(Duration::from_millis(20)).await;
    }
    false
}

/// Reads up to `n` lines from the stream, stopping early on EOF.
async fn read_lines(reader: OutputReader, n: usize) -> Vec<String> {
    let mut lines = BufReader::new(reader).lines();
    let mut out = Vec::new();
    while out.len() < n {
        match lines.next_line().await {
            Ok(Some(line)) => out.push(line),
            _ => break,
        }
    }
    out
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn lifecycle_with_two_readers() {
    let runner = JobRunner::new(20);
    let ctx = CancellationToken::new();

    let id = runner
        .run(ctx.clone(), Arc::new(TickerJob::new()))
        .await
        .expect("run should succeed");

    // The job becomes observably running, with a start time and no
    // stop time.
    assert!(wait_for_running(&runner, &id, true).await);
    let status = runner.status(&id).await.expect("status should be present");
    assert_eq!(status.id, id);
    assert!(status.running);
    assert!(status.stopped_at.is_none());

    // Multiple readers for the same job, attached at different times,
    // observe the same byte sequence from the start.
    let early = runner.new_reader(&id).await.expect("reader should attach");
    sleep(Duration::from_millis(200)).await;
    let late = runner.new_reader(&id).await.expect("reader should attach");

    let (a, b) = tokio::join!(
        timeout(Duration::from_secs(5), read_lines(early, 7)),
        timeout(Duration::from_secs(5), read_lines(late, 7)),
    );
    let a = a.expect("early reader should produce lines in time");
    let b = b.expect("late reader should produce lines in time");

    assert_eq!(a.len(), 7);
    assert_eq!(a, b);
    assert_eq!(a[0], "Job Start");
    for (i, line) in a[1..].iter().enumerate() {
        assert_eq!(line, &format!("line: {i}"));
    }

    runner.stop(ctx.clone(), &id).await.expect("stop should succeed");

    // The record settles: not running, stop time after start time.
    assert!(wait_for_running(&runner, &id, false).await);
    let status = runner.status(&id).await.expect("status should be present");
    let stopped_at = status.stopped_at.expect("stopped_at should be set");
    assert!(stopped_at >= status.started_at);

    // Stopping a terminated job is a state error.
    assert!(matches!(
        runner.stop(ctx, &id).await,
        Err(RunnerError::JobNotRunning)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reader_attached_after_termination_gets_a_snapshot() {
    let runner = JobRunner::new(4);
    let ctx = CancellationToken::new();

    let id = runner
        .run(ctx, Arc::new(PrinterJob { payload: b"A\nB\nC\n" }))
        .await
        .expect("run should succeed");

    // The printer closes its own writer, so the job terminates without
    // an explicit stop.
    assert!(wait_for_running(&runner, &id, false).await);

    let mut reader = runner.new_reader(&id).await.expect("reader should attach");
    let mut out = Vec::new();
    timeout(Duration::from_secs(2), reader.read_to_end(&mut out))
        .await
        .expect("snapshot should be immediately readable")
        .expect("snapshot read should succeed");
    assert_eq!(out, b"A\nB\nC\n");

    // Snapshots are independent: a second reader sees the same bytes.
    let mut reader = runner.new_reader(&id).await.expect("reader should attach");
    let mut again = Vec::new();
    reader.read_to_end(&mut again).await.expect("read should succeed");
    assert_eq!(again, out);
}

#[tokio::test]
async fn unknown_ids_are_reported() {
    let runner = JobRunner::new(4);
    let ctx = CancellationToken::new();
    let id = JobId::from("nonexistent");

    assert!(matches!(
        runner.stop(ctx, &id).await,
        Err(RunnerError::JobNotFound)
    ));
    assert!(matches!(
        runner.new_reader(&id).await,
        Err(RunnerError::JobNotFound)
    ));
    assert!(runner.status(&id).await.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn overflowing_the_index_evicts_the_oldest_record() {
    let runner = JobRunner::new(2);
    let ctx = CancellationToken::new();

    let mut ids = Vec::new();
    for _ in 0..3 {
        let id = runner
            .run(ctx.clone(), Arc::new(PrinterJob { payload: b"x\n" }))
            .await
            .expect("run should succeed");
        ids.push(id);
    }

    // The first record was the least recently accessed when the third
    // arrived.
    assert!(runner.status(&ids[0]).await.is_none());
    assert!(runner.status(&ids[1]).await.is_some());
    assert!(runner.status(&ids[2]).await.is_some());
    assert_eq!(runner.list().await.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn list_enumerates_every_record_once() {
    let runner = JobRunner::new(10);
    let ctx = CancellationToken::new();

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(
            runner
                .run(ctx.clone(), Arc::new(TickerJob::new()))
                .await
                .expect("run should succeed"),
        );
    }

    let listed = runner.list().await;
    assert_eq!(listed.len(), 3);
    let mut listed_ids: Vec<_> = listed.iter().map(|s| s.id.clone()).collect();
    listed_ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    let mut expected = ids.clone();
    expected.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    assert_eq!(listed_ids, expected);

    runner.close(ctx).await.expect("close should succeed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn close_stops_every_running_job() {
    let runner = JobRunner::new(10);
    let ctx = CancellationToken::new();

    let a = runner
        .run(ctx.clone(), Arc::new(TickerJob::new()))
        .await
        .expect("run should succeed");
    let b = runner
        .run(ctx.clone(), Arc::new(TickerJob::new()))
        .await
        .expect("run should succeed");

    runner.close(ctx.clone()).await.expect("close should succeed");

    assert!(wait_for_running(&runner, &a, false).await);
    assert!(wait_for_running(&runner, &b, false).await);

    // With nothing left running, close is a no-op.
    runner.close(ctx).await.expect("close should stay idempotent");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failing_stop_leaves_the_job_intact() {
    let runner = JobRunner::new(4);
    let ctx = CancellationToken::new();

    let id = runner
        .run(
            ctx.clone(),
            Arc::new(StubbornJob {
                inner: TickerJob::new(),
            }),
        )
        .await
        .expect("run should succeed");
    assert!(wait_for_running(&runner, &id, true).await);

    match runner.stop(ctx.clone(), &id).await {
        Err(RunnerError::Job(JobError::Fail { reason })) => {
            assert_eq!(reason, "refusing to stop");
        }
        other => panic!("expected the job's stop error, got {other:?}"),
    }

    // The writer was not closed: the job keeps running and streaming.
    sleep(Duration::from_millis(100)).await;
    let status = runner.status(&id).await.expect("status should be present");
    assert!(status.running);

    let reader = runner.new_reader(&id).await.expect("reader should attach");
    let lines = timeout(Duration::from_secs(5), read_lines(reader, 3))
        .await
        .expect("live reader should still produce output");
    assert_eq!(lines[0], "Job Start");

    // Close reports the stubborn job by id.
    match runner.close(ctx).await {
        Err(RunnerError::StopFailed { id: failed, .. }) => assert_eq!(failed, id),
        other => panic!("expected close to report the stubborn job, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropping_a_reader_detaches_it_silently() {
    let runner = JobRunner::new(4);
    let ctx = CancellationToken::new();

    let id = runner
        .run(ctx.clone(), Arc::new(TickerJob::new()))
        .await
        .expect("run should succeed");

    let reader = runner.new_reader(&id).await.expect("reader should attach");
    let lines = timeout(Duration::from_secs(5), read_lines(reader, 2))
        .await
        .expect("reader should produce output");
    assert_eq!(lines.len(), 2);
    // `read_lines` consumed and dropped the stream; the job is
    // unaffected.
    sleep(Duration::from_millis(100)).await;
    let status = runner.status(&id).await.expect("status should be present");
    assert!(status.running);

    runner.stop(ctx, &id).await.expect("stop should succeed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn start_failures_propagate_but_stay_observable() {
    let runner = JobRunner::new(4);
    let ctx = CancellationToken::new();

    match runner.run(ctx, Arc::new(BrokenJob)).await {
        Err(RunnerError::Job(JobError::Fail { reason })) => {
            assert_eq!(reason, "no such binary");
        }
        other => panic!("expected the job's start error, got {other:?}"),
    }

    // The record was registered before start and settles terminated.
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let listed = runner.list().await;
        if listed.len() == 1 && !listed[0].running && listed[0].stopped_at.is_some() {
            break;
        }
        assert!(Instant::now() < deadline, "failed record should settle, got {listed:?}");
        sleep(Duration::from_millis(20)).await;
    }
}
