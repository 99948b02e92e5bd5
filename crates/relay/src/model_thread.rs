use std::thread::JoinHandle;

use futures::{FutureExt, Stream, StreamExt, stream};
use lith_model::BufferDirectory;
use snafu::ResultExt;
use tokio::sync::{mpsc, oneshot};

use super::error::{
    ModelRuntimeInitSnafu, ModelThreadPanickedSnafu, ModelThreadSpawnSnafu, RelayResult,
};
use super::event::RelayEvent;

pub const MODEL_THREAD_NAME: &str = "lith-model";

/// Cloneable handle the connection layer uses to hand decoded events to the model.
#[derive(Debug, Clone)]
pub struct EventSender {
    events: mpsc::UnboundedSender<RelayEvent>,
}

impl EventSender {
    /// Queues an event. Returns false once the model thread has stopped.
    pub fn send(&self, event: RelayEvent) -> bool {
        self.events.send(event).is_ok()
    }
}

/// Owns the [`BufferDirectory`] on a dedicated thread and applies relay events in arrival order.
///
/// All model mutation and observer callbacks happen on that one thread.
pub struct ModelThread {
    events: EventSender,
    shutdown_tx: Option<oneshot::Sender<()>>,
    worker: Option<JoinHandle<RelayResult<BufferDirectory>>>,
}

impl ModelThread {
    pub fn spawn(directory: BufferDirectory) -> RelayResult<Self> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        // The directory is single-owner state, so it gets its own thread and a current-thread
        // runtime instead of a task on a shared pool.
        let worker = std::thread::Builder::new()
            .name(MODEL_THREAD_NAME.to_string())
            .spawn(move || -> RelayResult<BufferDirectory> {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .context(ModelRuntimeInitSnafu {
                        stage: "model-thread-runtime-build",
                    })?;
                let events = receiver_stream(event_rx);
                Ok(runtime.block_on(run_model_loop(directory, events, shutdown_rx)))
            })
            .context(ModelThreadSpawnSnafu {
                stage: "model-thread-spawn",
            })?;

        Ok(Self {
            events: EventSender { events: event_tx },
            shutdown_tx: Some(shutdown_tx),
            worker: Some(worker),
        })
    }

    pub fn sender(&self) -> EventSender {
        self.events.clone()
    }

    /// Stops the thread after the events already queued are applied, and returns the model.
    pub fn shutdown(mut self) -> RelayResult<BufferDirectory> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        let Some(worker) = self.worker.take() else {
            return ModelThreadPanickedSnafu {
                stage: "model-thread-missing-worker",
            }
            .fail();
        };
        match worker.join() {
            Ok(result) => result,
            Err(_) => ModelThreadPanickedSnafu {
                stage: "model-thread-join",
            }
            .fail(),
        }
    }
}

impl Drop for ModelThread {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

fn receiver_stream(
    mut events: mpsc::UnboundedReceiver<RelayEvent>,
) -> impl Stream<Item = RelayEvent> + Unpin {
    stream::poll_fn(move |cx| events.poll_recv(cx))
}

async fn run_model_loop<S>(
    mut directory: BufferDirectory,
    mut events: S,
    mut shutdown_rx: oneshot::Receiver<()>,
) -> BufferDirectory
where
    S: Stream<Item = RelayEvent> + Unpin,
{
    tracing::info!("model thread started");
    let mut applied = 0usize;

    loop {
        tokio::select! {
            biased;
            next_event = events.next() => {
                let Some(event) = next_event else {
                    tracing::debug!("all event senders dropped");
                    break;
                };
                apply_event(&mut directory, event);
                applied += 1;
            }
            _ = &mut shutdown_rx => {
                // Anything queued before the shutdown request still gets applied.
                while let Some(Some(event)) = events.next().now_or_never() {
                    apply_event(&mut directory, event);
                    applied += 1;
                }
                break;
            }
        }
    }

    tracing::info!(applied, buffers = directory.len(), "model thread stopped");
    directory
}

fn apply_event(directory: &mut BufferDirectory, event: RelayEvent) {
    tracing::trace!(kind = event.kind(), buffer = %event.buffer(), "applying relay event");
    event.apply(directory);
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::DateTime;
    use lith_model::{BufferFields, BufferHandle, LineData, LineHandle, ModelEvent};

    use super::*;
    use crate::command::{RelayCommand, make_command_channel};

    fn opened(raw: u64) -> RelayEvent {
        RelayEvent::BufferOpened {
            buffer: BufferHandle::new(raw),
            fields: BufferFields {
                number: Some(1),
                name: Some("core.weechat".to_string()),
                ..BufferFields::default()
            },
        }
    }

    fn line(buffer: u64, raw: u64, seconds: i64) -> RelayEvent {
        let date = DateTime::from_timestamp(seconds, 0).unwrap();
        RelayEvent::Line {
            buffer: BufferHandle::new(buffer),
            line: LineData::new(LineHandle::new(raw))
                .at(date)
                .with_message(format!("line {raw}")),
        }
    }

    #[test]
    fn applies_queued_events_before_shutdown() {
        let (relay, _commands) = make_command_channel();
        let thread = ModelThread::spawn(BufferDirectory::new(Arc::new(relay))).unwrap();
        let sender = thread.sender();

        assert!(sender.send(opened(1)));
        for (raw, seconds) in [(1, 30), (2, 10), (3, 20)] {
            assert!(sender.send(line(1, raw, seconds)));
        }

        let directory = thread.shutdown().unwrap();
        let buffer = directory.buffer(BufferHandle::new(1)).unwrap();
        let order = buffer
            .lines()
            .iter()
            .map(|line| line.handle().0)
            .collect::<Vec<_>>();
        assert_eq!(order, vec![1, 3, 2]);
        assert!(!sender.send(opened(2)));
    }

    #[test]
    fn observers_run_on_the_model_thread() {
        let (relay, _commands) = make_command_channel();
        let mut directory = BufferDirectory::new(Arc::new(relay));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        directory.subscribe(move |event: &ModelEvent| {
            let thread_name = std::thread::current().name().map(str::to_string);
            sink.lock().unwrap().push((*event, thread_name));
        });

        let thread = ModelThread::spawn(directory).unwrap();
        thread.sender().send(opened(7));
        thread.shutdown().unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, ModelEvent::BufferOpened(BufferHandle::new(7)));
        assert_eq!(seen[0].1.as_deref(), Some(MODEL_THREAD_NAME));
    }

    #[tokio::test]
    async fn backfill_requests_reach_the_command_channel() {
        let (relay, mut commands) = make_command_channel();
        let mut directory = BufferDirectory::new(Arc::new(relay));
        opened(3).apply(&mut directory);
        assert!(directory.request_more_lines(BufferHandle::new(3)));

        assert_eq!(
            commands.recv().await,
            Some(RelayCommand::FetchLines {
                buffer: BufferHandle::new(3),
                count: 25
            })
        );
    }

    #[tokio::test]
    async fn loop_ends_when_senders_are_gone() {
        let (relay, _commands) = make_command_channel();
        let directory = BufferDirectory::new(Arc::new(relay));
        let (_shutdown_tx, shutdown_rx) = oneshot::channel();
        let events = stream::iter(vec![opened(1), line(1, 1, 5)]);

        let directory = run_model_loop(directory, events, shutdown_rx).await;
        assert_eq!(directory.buffer(BufferHandle::new(1)).unwrap().line_count(), 1);
    }
}
