// src/handlers/editor.rs

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::api::ApiClient;
use crate::error::AppError;
use crate::handlers::busy::{BusyFlag, Generation};
use crate::models::assignment::{Assignment, AssignmentForm, filter_assignments};
use crate::models::attempt::Attempt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorMode {
    Closed,
    Create,
    /// Editing an existing assignment, addressed by its real id.
    Edit { id: String },
}

#[derive(Debug)]
struct EditorState {
    mode: EditorMode,
    form: AssignmentForm,
    assignments: Vec<Assignment>,
}

/// The admin assignments screen: the list plus the create/edit dialog.
///
/// Cloning gives another handle on the same screen, so a second trigger
/// racing the first sees the same busy flags.
#[derive(Clone)]
pub struct AssignmentEditor {
    api: ApiClient,
    state: Arc<RwLock<EditorState>>,
    loading: BusyFlag,
    saving: BusyFlag,
    deleting: BusyFlag,
    list_generation: Generation,
}

impl AssignmentEditor {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Arc::new(RwLock::new(EditorState {
                mode: EditorMode::Closed,
                form: AssignmentForm::new(),
                assignments: Vec::new(),
            })),
            loading: BusyFlag::new("Loading assignments"),
            saving: BusyFlag::new("Save"),
            deleting: BusyFlag::new("Delete"),
            list_generation: Generation::new(),
        }
    }

    /// Reloads the list. Returns `false` when a newer load or a navigation
    /// made this response stale.
    ///
    /// Loads after a save or delete skip the busy flag and take a fresh
    /// ticket, so a load that started before the write can never land
    /// after it.
    pub async fn refresh(&self) -> Result<bool, AppError> {
        let _guard = self.loading.try_begin()?;
        self.load().await
    }

    async fn load(&self) -> Result<bool, AppError> {
        let ticket = self.list_generation.issue();
        let assignments = self.api.list_assignments().await?;

        match self.list_generation.accept(ticket, assignments) {
            Some(assignments) => {
                tracing::debug!(count = assignments.len(), "Assignment list loaded");
                self.state.write().await.assignments = assignments;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The user left the screen; in-flight loads must not land.
    pub fn leave(&self) {
        self.list_generation.invalidate();
    }

    pub async fn assignments(&self) -> Vec<Assignment> {
        self.state.read().await.assignments.clone()
    }

    pub async fn search(&self, needle: &str) -> Vec<Assignment> {
        let state = self.state.read().await;
        filter_assignments(&state.assignments, needle)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn mode(&self) -> EditorMode {
        self.state.read().await.mode.clone()
    }

    pub async fn form(&self) -> AssignmentForm {
        self.state.read().await.form.clone()
    }

    pub fn is_saving(&self) -> bool {
        self.saving.is_busy()
    }

    pub async fn open_create(&self) {
        let mut state = self.state.write().await;
        state.mode = EditorMode::Create;
        state.form = AssignmentForm::new();
    }

    /// Opens the dialog on the full record (list entries may omit questions).
    pub async fn open_edit(&self, id: &str) -> Result<(), AppError> {
        let assignment = self.api.get_assignment(id).await?;
        let mut state = self.state.write().await;
        state.form = AssignmentForm::from_assignment(&assignment);
        state.mode = EditorMode::Edit { id: assignment.id };
        Ok(())
    }

    pub async fn close(&self) {
        let mut state = self.state.write().await;
        state.mode = EditorMode::Closed;
        state.form = AssignmentForm::new();
    }

    /// Applies a change to the edit buffer.
    pub async fn edit<R>(&self, change: impl FnOnce(&mut AssignmentForm) -> R) -> R {
        let mut state = self.state.write().await;
        change(&mut state.form)
    }

    /// Creates or updates depending on the mode.
    ///
    /// On failure the dialog stays open with the buffer untouched so the
    /// user can retry. On success the dialog closes and the list reloads;
    /// a failed reload is reported as such, with the save already done.
    pub async fn save(&self) -> Result<Option<Assignment>, AppError> {
        let _guard = self.saving.try_begin()?;

        let (mode, request) = {
            let state = self.state.read().await;
            if state.mode == EditorMode::Closed {
                return Err(AppError::Validation("No assignment is being edited".to_string()));
            }
            (state.mode.clone(), state.form.to_request()?)
        };

        let saved = match &mode {
            EditorMode::Edit { id } => self.api.update_assignment(id, &request).await,
            _ => self.api.create_assignment(&request).await,
        }
        .inspect_err(|e| tracing::warn!("Save failed, keeping the edit buffer: {}", e))?;

        self.close().await;
        self.load().await?;
        Ok(saved)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let _guard = self.deleting.try_begin()?;
        self.api.delete_assignment(id).await?;

        let editing_deleted = matches!(&self.state.read().await.mode, EditorMode::Edit { id: open } if open == id);
        if editing_deleted {
            self.close().await;
        }
        self.load().await.map(|_| ())
    }

    /// Attempts for one assignment, for the admin attempts dialog.
    pub async fn attempts(&self, id: &str) -> Result<Vec<Attempt>, AppError> {
        self.api.assignment_attempts(id).await
    }
}
