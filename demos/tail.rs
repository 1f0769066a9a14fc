use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use jobtail::{Job, JobError, JobRunner, OutputReader, OutputWriter};

struct CounterJob {
    halt: CancellationToken,
}

#[async_trait]
impl Job for CounterJob {
    async fn start(&self, _ctx: CancellationToken, writer: OutputWriter) -> Result<(), JobError> {
        writer.write_all(b"counter starting\n").await?;

        let halt = self.halt.clone();
        tokio::spawn(async move {
            let mut n = 0u32;
            loop {
                let line = format!("count = {n}\n");
                if writer.write_all(line.as_bytes()).await.is_err() {
                    return;
                }
                n += 1;
                tokio::select! {
                    _ = halt.cancelled() => {
                        let _ = writer.write_all(b"counter stopping\n").await;
                        return;
                    }
                    _ = tokio::time::sleep(Duration::from_millis(300)) => {}
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

async fn print_lines(prefix: &str, reader: OutputReader) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        println!("{prefix} {line}");
    }
    println!("{prefix} <eof>");
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobtail=debug".into()),
        )
        .init();

    let runner = JobRunner::new(16);
    let ctx = CancellationToken::new();

    let id = runner
        .run(
            ctx.clone(),
            Arc::new(CounterJob {
                halt: CancellationToken::new(),
            }),
        )
        .await?;
    println!("submitted job {id}");

    // Two independent tails of the same job.
    let one = runner.new_reader(&id).await?;
    let two = runner.new_reader(&id).await?;
    let tails = tokio::join!(
        tokio::spawn(print_lines("+", one)),
        tokio::spawn(print_lines("-", two)),
        async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            runner.stop(ctx.clone(), &id).await
        },
    );
    tails.2?;

    // After termination a new reader gets a finite snapshot.
    let mut snapshot = runner.new_reader(&id).await?;
    let mut out = Vec::new();
    snapshot.read_to_end(&mut out).await?;
    println!("snapshot after stop:\n{}", String::from_utf8_lossy(&out));

    match runner.status(&id).await {
        Some(status) => println!("final status: {status:?}"),
        None => println!("record already evicted"),
    }

    Ok(())
}
