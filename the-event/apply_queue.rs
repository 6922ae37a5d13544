//! Single-consumer apply queue for engine updates.
//!
//! Updates arrive from the engine transport in order, possibly for many
//! buffers at once. The queue funnels them through one dispatcher task which
//! owns a worker task per registered buffer. Each worker is the only consumer
//! for its buffer: it reconciles updates strictly in arrival order while
//! holding the document lock, so a buffer and its windows never observe a
//! half-applied update. Different buffers reconcile concurrently. A worker
//! that replaces an earlier route for the same buffer waits for the earlier
//! worker to drain before it takes its first update.
//!
//! Registration travels over the same channel as updates, so an update
//! submitted after [`ApplyQueue::register`] always finds its route.

use std::ops::Range;

use hashbrown::HashMap;
use the_lib::{
  buffer::BufferId,
  document::SharedDocument,
  line_cache::{
    ReconcileError,
    Update,
  },
};
use tokio::{
  sync::{
    mpsc::{
      self,
      UnboundedReceiver,
      UnboundedSender,
    },
    watch,
  },
  task::JoinHandle,
};


/// Outcome of one submitted update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyEvent {
  Applied {
    buffer:   BufferId,
    revision: u64,
    /// Rows that need repainting.
    invalid:  Vec<Range<usize>>,
  },
  Rejected {
    buffer: BufferId,
    error:  ReconcileError,
  },
  /// The buffer had no registered document.
  Unrouted { buffer: BufferId },
}

impl ApplyEvent {
  pub fn buffer(&self) -> BufferId {
    match self {
      Self::Applied { buffer, .. } | Self::Rejected { buffer, .. } | Self::Unrouted { buffer } => {
        *buffer
      },
    }
  }
}

enum Command {
  Register {
    buffer:   BufferId,
    document: SharedDocument,
  },
  Unregister {
    buffer: BufferId,
  },
  Update {
    buffer: BufferId,
    update: Update,
  },
}

/// Handle for submitting updates. Cheap to clone.
///
/// The dispatcher runs until every handle has been dropped, then finishes the
/// updates already queued and exits.
#[derive(Debug, Clone)]
pub struct ApplyQueue {
  commands: UnboundedSender<Command>,
  finished: watch::Receiver<bool>,
}

impl std::fmt::Debug for Command {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Register { buffer, .. } => write!(f, "Register({})", buffer.get()),
      Self::Unregister { buffer } => write!(f, "Unregister({})", buffer.get()),
      Self::Update { buffer, update } => write!(f, "Update({}, rev {})", buffer.get(), update.rev),
    }
  }
}

impl ApplyQueue {
  /// Starts the dispatcher on the current tokio runtime.
  ///
  /// # Panics
  ///
  /// Panics when called outside a tokio runtime.
  pub fn spawn() -> (Self, UnboundedReceiver<ApplyEvent>) {
    let (commands, command_rx) = mpsc::unbounded_channel();
    let (events, event_rx) = mpsc::unbounded_channel();
    let (finished_tx, finished) = watch::channel(false);

    tokio::spawn(
      Dispatcher {
        commands: command_rx,
        events,
        workers: HashMap::new(),
        retired: HashMap::new(),
      }
      .run(finished_tx),
    );

    (Self { commands, finished }, event_rx)
  }

  /// Routes updates for `buffer` to `document`, replacing any earlier route.
  pub fn register(&self, buffer: BufferId, document: SharedDocument) {
    self.send(Command::Register { buffer, document });
  }

  /// Stops routing updates for `buffer` once the ones already queued ran.
  pub fn unregister(&self, buffer: BufferId) {
    self.send(Command::Unregister { buffer });
  }

  /// Queues an update. Never blocks and never drops while the dispatcher
  /// is alive.
  pub fn submit(&self, buffer: BufferId, update: Update) {
    self.send(Command::Update { buffer, update });
  }

  /// Drops this handle and waits until the dispatcher and every worker have
  /// finished.
  ///
  /// Only returns once all other handles have been dropped too.
  pub async fn shutdown(self) {
    let Self {
      commands,
      mut finished,
    } = self;
    drop(commands);
    // an error means the dispatcher is already gone
    let _ = finished.wait_for(|done| *done).await;
  }

  fn send(&self, command: Command) {
    if let Err(err) = self.commands.send(command) {
      log::warn!("apply queue is closed, dropping {:?}", err.0);
    }
  }
}

struct Worker {
  updates: UnboundedSender<Update>,
  handle:  JoinHandle<()>,
}

struct Dispatcher {
  commands: UnboundedReceiver<Command>,
  events:   UnboundedSender<ApplyEvent>,
  workers:  HashMap<BufferId, Worker>,
  /// Workers that were unregistered but may still be draining.
  retired:  HashMap<BufferId, JoinHandle<()>>,
}

impl Dispatcher {
  async fn run(mut self, finished: watch::Sender<bool>) {
    while let Some(command) = self.commands.recv().await {
      self.handle_command(command);
    }

    // closing the worker channels lets every worker drain and exit
    let handles: Vec<_> = self
      .workers
      .drain()
      .map(|(_, worker)| worker.handle)
      .chain(self.retired.drain().map(|(_, handle)| handle))
      .collect();
    for handle in handles {
      if let Err(err) = handle.await {
        log::error!("apply worker failed: {err}");
      }
    }
    let _ = finished.send(true);
  }

  fn handle_command(&mut self, command: Command) {
    match command {
      Command::Register { buffer, document } => {
        // dropping the old sender lets the previous worker drain and exit
        let previous = self
          .workers
          .remove(&buffer)
          .map(|worker| worker.handle)
          .or_else(|| self.retired.remove(&buffer));
        let (updates, update_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(
          BufferWorker {
            buffer,
            document,
            updates: update_rx,
            events: self.events.clone(),
          }
          .run(previous),
        );
        log::debug!("registered buffer {}", buffer.get());
        self.workers.insert(buffer, Worker { updates, handle });
      },
      Command::Unregister { buffer } => {
        if let Some(worker) = self.workers.remove(&buffer) {
          log::debug!("unregistered buffer {}", buffer.get());
          self.retired.insert(buffer, worker.handle);
        }
      },
      Command::Update { buffer, update } => {
        let Some(worker) = self.workers.get(&buffer) else {
          log::warn!("no document registered for buffer {}, rev {}", buffer.get(), update.rev);
          self.emit(ApplyEvent::Unrouted { buffer });
          return;
        };
        if worker.updates.send(update).is_err() {
          // the worker only stops once its channel closes, so this is a bug
          log::error!("apply worker for buffer {} exited early", buffer.get());
          self.emit(ApplyEvent::Unrouted { buffer });
        }
      },
    }
  }

  fn emit(&self, event: ApplyEvent) {
    if self.events.send(event).is_err() {
      log::debug!("apply event receiver dropped");
    }
  }
}

struct BufferWorker {
  buffer:   BufferId,
  document: SharedDocument,
  updates:  UnboundedReceiver<Update>,
  events:   UnboundedSender<ApplyEvent>,
}

impl BufferWorker {
  /// Applies updates until the dispatcher drops the sender. `previous` is the
  /// worker this one replaces; it must finish first.
  async fn run(mut self, previous: Option<JoinHandle<()>>) {
    if let Some(previous) = previous
      && let Err(err) = previous.await
    {
      log::error!("apply worker for buffer {} failed: {err}", self.buffer.get());
    }
    while let Some(update) = self.updates.recv().await {
      let result = self.document.lock().apply(&update);
      let event = match result {
        Ok(applied) => {
          ApplyEvent::Applied {
            buffer:   self.buffer,
            revision: applied.revision,
            invalid:  applied.invalid,
          }
        },
        Err(error) => {
          log::warn!(
            "rejected update rev {} for buffer {}: {error}",
            update.rev,
            self.buffer.get()
          );
          ApplyEvent::Rejected {
            buffer: self.buffer,
            error,
          }
        },
      };
      if self.events.send(event).is_err() {
        log::debug!("apply event receiver dropped");
      }
    }
  }
}
