//! The session manager: all mutable application state and the generation
//! lifecycle.
//!
//! One `SessionManager` instance owns the chat history, todo list, file
//! bucket, and the single generation slot. Commands mutate state under one
//! lock; observers either clone a [`SessionManager::snapshot`] or subscribe
//! to [`SessionEvent`]s. Generation streams from a [`GenerationProvider`]
//! and is cancelled cooperatively through a token the provider checks
//! between chunks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use providers::{GenerationProvider, ProgressFn};
use shared::error::SessionError;
use shared::events::SessionEvent;
use shared::generation_api::{SamplingConfig, StreamChunk};
use shared::items::{FileEntry, FileKind, HistoryEntry, SessionState, TodoEntry};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// The generation currently holding the slot. The id lets a cancelled
/// generation that drains late recognize it was superseded and leave the
/// replacement's state alone.
struct GenerationSlot {
    id: u64,
    token: CancellationToken,
}

pub struct SessionManager {
    state: RwLock<SessionState>,
    provider: Arc<dyn GenerationProvider>,
    model: String,
    sampling: SamplingConfig,
    events: broadcast::Sender<SessionEvent>,
    /// The generation in flight, if any
    cancel_slot: Mutex<Option<GenerationSlot>>,
    generation_seq: AtomicU64,
}

impl SessionManager {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        model: impl Into<String>,
        sampling: SamplingConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            state: RwLock::new(SessionState::default()),
            provider,
            model: model.into(),
            sampling,
            events,
            cancel_slot: Mutex::new(None),
            generation_seq: AtomicU64::new(0),
        }
    }

    /// Clone of the current state for the presentation layer.
    pub fn snapshot(&self) -> SessionState {
        self.state.read().clone()
    }

    /// A slow subscriber can lag behind a fast token stream and miss
    /// events; display through events is best-effort, `snapshot()` is
    /// authoritative.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }

    // --- Generation lifecycle ---

    /// Run one generation to completion.
    ///
    /// Resolves the model, streams chunks into `current_output` in arrival
    /// order, and on success appends a frozen `HistoryEntry`. Cancellation
    /// keeps whatever output accumulated but commits nothing. Failure
    /// replaces `current_output` with an error message, commits nothing, and
    /// is also returned to the caller.
    ///
    /// The future completes only after the generation settles; observers see
    /// incremental output meanwhile. A second call while one is in flight is
    /// rejected with [`SessionError::AlreadyGenerating`]. A generation whose
    /// slot was taken over after cancellation settles without touching state.
    pub async fn start_generation(&self, prompt: &str) -> Result<(), SessionError> {
        {
            let mut state = self.state.write();
            if state.is_generating {
                return Err(SessionError::AlreadyGenerating);
            }
            state.is_generating = true;
            state.current_output.clear();
        }
        let cancel = CancellationToken::new();
        let generation_id = self.generation_seq.fetch_add(1, Ordering::Relaxed);
        *self.cancel_slot.lock() = Some(GenerationSlot {
            id: generation_id,
            token: cancel.clone(),
        });
        self.emit(SessionEvent::GenerationStarted {
            prompt: prompt.to_string(),
        });
        tracing::info!(prompt_len = prompt.len(), "generation started");

        let outcome = self.run_stream(prompt, &cancel).await;

        // Only the generation still holding the slot may tear down shared
        // state; after cancel-then-restart the stale future settles without
        // touching its successor.
        let owns_slot = {
            let mut slot = self.cancel_slot.lock();
            if slot.as_ref().map_or(false, |s| s.id == generation_id) {
                slot.take();
                true
            } else {
                false
            }
        };
        if !owns_slot {
            tracing::debug!(generation_id, "superseded generation settled");
            return Ok(());
        }

        // Cancellation wins over any error the dying stream reported
        if cancel.is_cancelled() {
            self.state.write().is_generating = false;
            tracing::info!("generation cancelled");
            self.emit(SessionEvent::GenerationCancelled);
            return Ok(());
        }

        match outcome {
            Ok(()) => {
                let entry_id = {
                    let mut state = self.state.write();
                    let entry = HistoryEntry::new(prompt, state.current_output.clone());
                    let id = entry.id;
                    state.history.push(entry);
                    state.is_generating = false;
                    id
                };
                tracing::info!(%entry_id, "generation completed");
                self.emit(SessionEvent::HistoryChanged);
                self.emit(SessionEvent::GenerationCompleted { entry_id });
                Ok(())
            }
            Err(err) => {
                {
                    let mut state = self.state.write();
                    state.current_output = format!("Error: {}", err);
                    state.is_generating = false;
                }
                tracing::warn!(error = %err, "generation failed");
                self.emit(SessionEvent::GenerationFailed {
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn run_stream(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        let progress_events = self.events.clone();
        let progress: ProgressFn = Box::new(move |fraction| {
            let _ = progress_events.send(SessionEvent::ModelProgress { fraction });
        });
        let handle = self
            .provider
            .resolve_model(&self.model, progress)
            .await
            .map_err(|e| SessionError::ModelResolution(e.to_string()))?;

        if cancel.is_cancelled() {
            return Ok(());
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let provider = Arc::clone(&self.provider);
        let sampling = self.sampling.clone();
        let owned_prompt = prompt.to_string();
        let stream_cancel = cancel.clone();
        let worker = tokio::spawn(async move {
            provider
                .generate_stream(&handle, &owned_prompt, &sampling, tx, stream_cancel)
                .await
        });

        let mut stream_error = None;
        while let Some(chunk) = rx.recv().await {
            match chunk {
                StreamChunk::Text(text) => {
                    if cancel.is_cancelled() {
                        break;
                    }
                    self.state.write().current_output.push_str(&text);
                    self.emit(SessionEvent::OutputChunk { text });
                }
                StreamChunk::Done { .. } => break,
                StreamChunk::Error(message) => {
                    stream_error = Some(message);
                    break;
                }
            }
        }
        drop(rx);

        let joined = worker.await;
        if let Some(message) = stream_error {
            return Err(SessionError::Generation(message));
        }
        match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SessionError::Generation(e.to_string())),
            Err(e) => Err(SessionError::Generation(format!(
                "stream task failed: {}",
                e
            ))),
        }
    }

    /// Signal cooperative cancellation and mark the session idle right away,
    /// without waiting for the provider to acknowledge.
    pub fn cancel_generation(&self) {
        if let Some(slot) = self.cancel_slot.lock().as_ref() {
            slot.token.cancel();
        }
        self.state.write().is_generating = false;
    }

    /// Re-run with a replacement prompt. The history entry that prompted the
    /// edit is left untouched.
    pub async fn edit_and_resubmit(&self, prompt: &str) -> Result<(), SessionError> {
        self.start_generation(prompt).await
    }

    /// Overwrite a committed response in place. No-op if the id is unknown;
    /// never re-runs generation.
    pub fn edit_history_output(&self, id: Uuid, new_output: impl Into<String>) {
        let mut state = self.state.write();
        if let Some(pos) = state.history.iter().position(|e| e.id == id) {
            state.history[pos].output = new_output.into();
            drop(state);
            self.emit(SessionEvent::HistoryChanged);
        } else {
            tracing::debug!(%id, "edit_history_output: no such entry");
        }
    }

    // --- Todo list ---

    pub fn add_todo(&self, title: impl Into<String>) -> Uuid {
        let entry = TodoEntry::new(title);
        let id = entry.id;
        self.state.write().todos.push(entry);
        self.emit(SessionEvent::TodosChanged);
        id
    }

    pub fn toggle_todo(&self, id: Uuid) {
        let mut state = self.state.write();
        if let Some(pos) = state.todos.iter().position(|t| t.id == id) {
            state.todos[pos].is_completed = !state.todos[pos].is_completed;
            drop(state);
            self.emit(SessionEvent::TodosChanged);
        } else {
            tracing::debug!(%id, "toggle_todo: no such todo");
        }
    }

    pub fn rename_todo(&self, id: Uuid, new_title: impl Into<String>) {
        let mut state = self.state.write();
        if let Some(pos) = state.todos.iter().position(|t| t.id == id) {
            state.todos[pos].title = new_title.into();
            drop(state);
            self.emit(SessionEvent::TodosChanged);
        } else {
            tracing::debug!(%id, "rename_todo: no such todo");
        }
    }

    pub fn delete_todo(&self, id: Uuid) {
        let mut state = self.state.write();
        let before = state.todos.len();
        state.todos.retain(|t| t.id != id);
        if state.todos.len() != before {
            drop(state);
            self.emit(SessionEvent::TodosChanged);
        }
    }

    // --- File bucket ---

    pub fn add_file(
        &self,
        name: impl Into<String>,
        content: impl Into<String>,
        kind: FileKind,
    ) -> Uuid {
        let entry = FileEntry::new(name, content, kind);
        let id = entry.id;
        self.state.write().files.push(entry);
        self.emit(SessionEvent::FilesChanged);
        id
    }

    pub fn update_file(&self, id: Uuid, name: impl Into<String>, content: impl Into<String>) {
        let mut state = self.state.write();
        if let Some(pos) = state.files.iter().position(|f| f.id == id) {
            state.files[pos].name = name.into();
            state.files[pos].content = content.into();
            drop(state);
            self.emit(SessionEvent::FilesChanged);
        } else {
            tracing::debug!(%id, "update_file: no such file");
        }
    }

    pub fn delete_file(&self, id: Uuid) {
        let mut state = self.state.write();
        let before = state.files.len();
        state.files.retain(|f| f.id != id);
        if state.files.len() != before {
            drop(state);
            self.emit(SessionEvent::FilesChanged);
        }
    }

    // --- UI chrome ---

    pub fn set_sidebar_visible(&self, visible: bool) {
        self.state.write().sidebar_visible = visible;
        self.emit(SessionEvent::SidebarToggled { visible });
    }
}
