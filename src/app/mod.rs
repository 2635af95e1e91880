mod state;
mod ui;

use crate::adapters::{AdapterId, AdapterRegistry, DriveEntry, LocalAdapter};
use crate::config::WidgetConfig;
use crate::error::UploaderError;
use crate::events::{EventSink, UploaderEvent};
use crate::files::{BlobStore, ManagedFile, Normalizer, RawItem};
use crate::preview::{PreviewLoader, PreviewState};
use crate::selection::{AppendOutcome, DragController, SelectionState};
use crate::upload::{UploadHandles, UploadOrchestrator};
use eframe::{egui, App};
pub use state::{ActionProgress, BrowserState, JobResult, UploadState};
use std::collections::HashMap;
use std::future::Future;
use std::sync::mpsc::{self as std_mpsc, Receiver, Sender};

/// The desktop host: adapter selector, drop zone, browser, previews and upload progress.
pub struct DropzoneApp {
    config: WidgetConfig,
    registry: AdapterRegistry,
    normalizer: Normalizer,
    local: LocalAdapter,
    selection: SelectionState,
    drag: DragController,
    orchestrator: UploadOrchestrator,
    handles: UploadHandles,
    previews: HashMap<String, PreviewState>,
    browser: BrowserState,
    state: UploadState,
    drop_rect: Option<egui::Rect>,
    sink: EventSink,
    event_receiver: Receiver<UploaderEvent>,
    job_sender: Sender<JobResult>,
    job_receiver: Receiver<JobResult>,
}

impl DropzoneApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: WidgetConfig) -> Self {
        egui_extras::install_image_loaders(&cc.egui_ctx);
        cc.egui_ctx.set_visuals(if config.dark {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        });
        Self::with_config(config)
    }

    /// Builds the widget state without touching any UI context.
    pub fn with_config(config: WidgetConfig) -> Self {
        tracing::info!("Initializing Dropzone Uploader");
        let blobs = BlobStore::new();
        let (sink, event_receiver) = EventSink::channel();
        let (job_sender, job_receiver) = std_mpsc::channel();
        let orchestrator = UploadOrchestrator::new(&config, blobs.clone());

        Self {
            registry: AdapterRegistry::from_config(&config),
            normalizer: Normalizer::new(&config, blobs.clone()),
            local: LocalAdapter::new(
                crate::files::AcceptPattern::from_config(config.accept.as_deref()),
                config.allows_multiple(),
            )
            .with_root(config.local_root.clone()),
            selection: SelectionState::new(&config, blobs, sink.clone()),
            drag: DragController::new(config.allows_multiple(), sink.clone()),
            handles: orchestrator.handles(),
            orchestrator,
            previews: HashMap::new(),
            browser: BrowserState::default(),
            state: UploadState::default(),
            drop_rect: None,
            sink,
            event_receiver,
            job_sender,
            job_receiver,
            config,
        }
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn upload_state(&self) -> &UploadState {
        &self.state
    }

    /// Runs `job` on its own thread with a fresh runtime and posts the result back.
    fn spawn_job<F, Fut>(&self, job: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = JobResult>,
    {
        let sender = self.job_sender.clone();
        let events = self.sink.clone();
        std::thread::spawn(move || match tokio::runtime::Runtime::new() {
            Ok(rt) => {
                let result = rt.block_on(job());
                let _ = sender.send(result);
            }
            Err(e) => events.error(format!("Failed to start background runtime: {}", e)),
        });
    }

    fn add_items(&mut self, items: Vec<RawItem>) -> AppendOutcome {
        let files = self.normalizer.normalize_all(items, &self.sink);
        let outcome = self.selection.confirm(files);
        self.track_previews(&outcome);
        outcome
    }

    fn track_previews(&mut self, outcome: &AppendOutcome) {
        for id in &outcome.accepted {
            if let Some(file) = self.selection.get(id) {
                self.previews.insert(id.clone(), PreviewState::for_file(file));
            }
        }
        let selection = &self.selection;
        self.previews.retain(|id, preview| {
            let keep = selection.get(id).is_some();
            if !keep {
                preview.release();
            }
            keep
        });
    }

    /// The device source opens the native dialog right away; every other source opens its browser.
    pub fn choose_adapter(&mut self, id: AdapterId) {
        if !self.registry.is_enabled(id) {
            return;
        }

        if id == AdapterId::Internal {
            let paths = self.local.pick();
            if !paths.is_empty() {
                self.add_items(LocalAdapter::to_raw_items(&paths));
            }
            return;
        }

        self.browser.reset();
        self.browser.adapter = self.registry.build(id);
        if let Some(token) = self
            .config
            .drive_credentials(id)
            .and_then(|c| c.access_token.clone())
        {
            self.browser.token_input = token;
        }
        self.selection.choose(id);

        if id != AdapterId::Link {
            self.browse(None);
        }
    }

    pub fn add_folder(&mut self) {
        let paths = self.local.pick_folder();
        if !paths.is_empty() {
            self.add_items(LocalAdapter::to_raw_items(&paths));
        }
    }

    pub fn close_browser(&mut self) {
        self.browser.reset();
        self.selection.cancel();
    }

    /// Lists `folder` of the open adapter in the background.
    pub fn browse(&mut self, folder: Option<String>) {
        let Some(adapter) = self.browser.adapter.clone() else {
            return;
        };
        self.browser.loading = true;
        self.browser.error = None;

        self.spawn_job(move || async move {
            let result = adapter.browse(folder.as_deref()).await;
            JobResult::Listing {
                adapter: adapter.id(),
                result,
            }
        });
    }

    pub fn open_folder(&mut self, entry: &DriveEntry) {
        self.browser.trail.push((entry.id.clone(), entry.name.clone()));
        self.browser.selected.clear();
        self.browse(Some(entry.id.clone()));
    }

    /// Goes back to the trail position `depth` (0 is the root).
    pub fn jump_to(&mut self, depth: usize) {
        self.browser.trail.truncate(depth);
        self.browser.selected.clear();
        let folder = self.browser.current_folder().map(str::to_string);
        self.browse(folder);
    }

    pub fn sign_in(&mut self) {
        let token = self.browser.token_input.trim().to_string();
        if let Some(adapter) = self.browser.adapter.as_mut() {
            adapter.set_access_token(token);
        }
        self.browser.needs_sign_in = false;
        self.browser.trail.clear();
        self.browse(None);
    }

    pub fn submit_link(&mut self) {
        let url = self.browser.link_input.trim().to_string();
        if !url.is_empty() {
            self.browser.selected.clear();
            self.browse(Some(url));
        }
    }

    /// Downloads the checked entries and hands them to the selection.
    pub fn confirm_browser(&mut self) {
        let Some(adapter) = self.browser.adapter.clone() else {
            return;
        };
        let entries = std::mem::take(&mut self.browser.selected);
        if entries.is_empty() {
            return;
        }
        self.browser.loading = true;

        self.spawn_job(move || async move {
            let batch = adapter.fetch_all(&entries).await;
            JobResult::Fetched {
                adapter: adapter.id(),
                batch,
            }
        });
    }

    pub fn remove_file(&mut self, file_id: &str) {
        self.handles.cancel(file_id);
        self.selection.remove(file_id);
        if let Some(mut preview) = self.previews.remove(file_id) {
            preview.release();
        }
    }

    pub fn toggle_preview(&mut self, file_id: &str) {
        let needs_load = self
            .previews
            .get_mut(file_id)
            .is_some_and(|preview| preview.toggle());
        if !needs_load {
            return;
        }
        let Some(file) = self.selection.get(file_id).cloned() else {
            return;
        };

        let loader = PreviewLoader::new(self.normalizer.blobs().clone(), self.config.preview_text_limit);
        self.spawn_job(move || async move {
            let result = loader.load(&file).await;
            JobResult::Preview {
                file_id: file.id.clone(),
                result,
            }
        });
    }

    /// Selected files that have no public URL yet.
    pub fn pending_files(&self) -> Vec<ManagedFile> {
        self.selection
            .files()
            .iter()
            .filter(|f| !f.is_uploaded())
            .cloned()
            .collect()
    }

    /// A finished batch left some files behind.
    pub fn can_retry(&self) -> bool {
        matches!(self.state.progress, ActionProgress::Completed { .. })
            && !self.state.is_uploading
            && !self.pending_files().is_empty()
    }

    /// Uploads every selected file not uploaded yet. Handles are registered before the job starts.
    pub fn start_upload(&mut self) {
        if self.state.is_uploading {
            return;
        }
        let files = self.pending_files();
        if files.is_empty() {
            return;
        }
        tracing::info!(count = files.len(), "Starting upload process");
        self.state.begin(files.len());

        let batch = self.orchestrator.prepare(files);
        let events = self.sink.clone();
        self.spawn_job(move || async move { JobResult::Uploaded(batch.run(&events).await) });
    }

    pub fn retry_failed(&mut self) {
        if self.can_retry() {
            tracing::info!("Retrying files left by the last batch");
            self.start_upload();
        }
    }

    pub fn reset(&mut self) {
        tracing::info!("Resetting application state");
        for file in self.selection.files() {
            self.handles.cancel(&file.id);
        }
        self.selection.reset();
        self.normalizer.blobs().revoke_all();
        self.release_previews();
        self.browser.reset();
        self.state.clear();
    }

    fn release_previews(&mut self) {
        for preview in self.previews.values_mut() {
            preview.release();
        }
        self.previews.clear();
    }

    /// Feeds OS drag-and-drop input through the drag controller.
    fn handle_file_drop(&mut self, ctx: &egui::Context) {
        let (hovering, pointer, dropped) = ctx.input(|i| {
            (
                !i.raw.hovered_files.is_empty(),
                i.pointer.hover_pos(),
                i.raw.dropped_files.clone(),
            )
        });
        let Some(rect) = self.drop_rect else {
            return;
        };

        if hovering {
            match pointer {
                Some(pos) if !rect.contains(pos) => self.drag.on_drag_leave(&rect, Some(&pos)),
                _ => self.drag.on_drag_enter(),
            }
        } else if dropped.is_empty() && self.drag.is_dragging() {
            self.drag.on_drag_leave::<egui::Pos2, _>(&rect, None);
        }

        if dropped.is_empty() {
            return;
        }

        let mut items = Vec::with_capacity(dropped.len());
        for file in dropped {
            if let Some(path) = file.path {
                items.extend(LocalAdapter::to_raw_items(&[path]));
            } else if let Some(bytes) = file.bytes {
                items.push(RawItem::from_bytes(file.name, None, bytes, AdapterId::Internal));
            }
        }

        let outcome = self.drag.on_drop(items, &self.normalizer, &mut self.selection);
        self.track_previews(&outcome);
        ctx.request_repaint();
    }

    fn handle_job(&mut self, job: JobResult) {
        match job {
            JobResult::Listing { adapter, result } => {
                if self.selection.active_adapter() != Some(adapter) {
                    return;
                }
                self.browser.loading = false;
                match result {
                    Ok(listing) => {
                        self.browser.needs_sign_in = false;
                        self.browser.listing = Some(listing);
                    }
                    Err(e) => self.browser_error(e),
                }
            }
            JobResult::Fetched { adapter, batch } => {
                if self.selection.active_adapter() != Some(adapter) {
                    tracing::debug!(adapter = adapter.as_str(), "dropping downloads for a closed browser");
                    return;
                }
                self.browser.loading = false;
                tracing::info!(
                    adapter = adapter.as_str(),
                    count = batch.items.len(),
                    failed = batch.failures.len(),
                    "fetched files"
                );
                for failure in &batch.failures {
                    self.sink
                        .error(format!("Could not download {}: {}", failure.name, failure.error));
                }
                if batch.items.is_empty() {
                    let needs_sign_in = batch.needs_sign_in();
                    if let Some(failure) = batch.failures.into_iter().next() {
                        self.browser_error(failure.error);
                    }
                    self.browser.needs_sign_in |= needs_sign_in;
                    return;
                }
                self.browser.reset();
                self.add_items(batch.items);
            }
            JobResult::Preview { file_id, result } => {
                let Some(preview) = self.previews.get_mut(&file_id) else {
                    return;
                };
                match result {
                    Ok(content) => preview.content = Some(content),
                    Err(e) => {
                        preview.show_preview_portal = false;
                        self.sink.warn(format!("Preview failed: {}", e));
                    }
                }
            }
            JobResult::Uploaded(files) => {
                for uploaded in files {
                    if let Some(file) = self.selection.get_mut(&uploaded.id) {
                        file.key = uploaded.key;
                        file.public_url = uploaded.public_url;
                    }
                }
            }
        }
    }

    fn browser_error(&mut self, error: UploaderError) {
        if matches!(error, UploaderError::AdapterAuth { .. }) {
            self.browser.needs_sign_in = true;
        }
        tracing::warn!("adapter error: {}", error);
        self.browser.error = Some(error.to_string());
    }

    pub fn update_state(&mut self, ctx: &egui::Context) {
        self.handle_file_drop(ctx);

        let mut had_updates = false;
        while let Ok(event) = self.event_receiver.try_recv() {
            had_updates = true;
            self.state.apply(&event);
        }
        while let Ok(job) = self.job_receiver.try_recv() {
            had_updates = true;
            self.handle_job(job);
        }

        if had_updates || self.state.is_uploading || self.browser.loading {
            ctx.request_repaint();
        }
    }
}

impl Drop for DropzoneApp {
    fn drop(&mut self) {
        self.release_previews();
        self.normalizer.blobs().revoke_all();
    }
}

impl App for DropzoneApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_state(ctx);
        self.render(ctx);
    }
}
