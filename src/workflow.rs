use crate::modal::{ModalController, ModalKind};
use crate::model::{NoteId, NoteState};
use crate::remote::{note_from_response, ApiError, RemoteClient, Transport};
use crate::storage::{PreferenceStore, Theme};
use crate::urgency::to_minute_precision;
use crate::view::{render, ListView};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long a notification stays visible.
pub const NOTICE_TTL: Duration = Duration::from_millis(1600);

/// Every user intent the controller understands, keyed by its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetCreateText(String),
    SetCreateDeadline(String),
    SubmitCreate,
    OpenEdit(NoteId),
    SetEditText(String),
    SetEditDeadline(String),
    SubmitEdit,
    CloseEdit,
    RequestDelete(NoteId),
    ConfirmDelete,
    CancelDelete,
    Search(String),
    ClearSearch,
    ToggleTheme,
    OpenAbout,
    CloseAbout,
    Escape,
    BackdropClick,
}

/// A remote call the adapter must run and hand back through
/// [`Workflow::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOp {
    Create {
        text: String,
        deadline: String,
    },
    Update {
        id: NoteId,
        text: String,
        deadline: String,
    },
    Delete {
        id: NoteId,
    },
}

impl RemoteOp {
    pub async fn execute<T: Transport>(&self, client: &RemoteClient<T>) -> Result<Value, ApiError> {
        match self {
            RemoteOp::Create { text, deadline } => client.create_note(text, deadline).await,
            RemoteOp::Update { id, text, deadline } => {
                client.update_note(*id, text, deadline).await
            }
            RemoteOp::Delete { id } => client.delete_note(*id).await,
        }
    }
}

#[derive(Debug)]
pub struct Completion {
    pub op: RemoteOp,
    pub result: Result<Value, ApiError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateForm {
    pub text: String,
    pub deadline: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditForm {
    pub id: NoteId,
    pub text: String,
    pub deadline: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
    shown_at: Instant,
}

/// Single-slot transient message; a newer notice replaces the older one.
#[derive(Debug, Default)]
pub struct Notifier {
    current: Option<Notice>,
}

impl Notifier {
    pub fn show(&mut self, message: impl Into<String>, kind: NoticeKind) {
        self.current = Some(Notice {
            message: message.into(),
            kind,
            shown_at: Instant::now(),
        });
    }

    pub fn visible(&self, now: Instant) -> Option<&Notice> {
        self.current
            .as_ref()
            .filter(|n| now.saturating_duration_since(n.shown_at) < NOTICE_TTL)
    }

    pub fn last(&self) -> Option<&Notice> {
        self.current.as_ref()
    }
}

pub struct Workflow {
    state: NoteState,
    view: ListView,
    create: CreateForm,
    edit: Option<EditForm>,
    confirm_delete: Option<NoteId>,
    create_pending: bool,
    edit_pending: Option<NoteId>,
    deleting: HashSet<NoteId>,
    modals: ModalController,
    notifier: Notifier,
    theme: Theme,
    prefs: PreferenceStore,
}

impl Workflow {
    pub fn new(state: NoteState, prefs: PreferenceStore) -> Self {
        let theme = prefs.get();
        let view = render(&state, Utc::now());
        Workflow {
            state,
            view,
            create: CreateForm::default(),
            edit: None,
            confirm_delete: None,
            create_pending: false,
            edit_pending: None,
            deleting: HashSet::new(),
            modals: ModalController::default(),
            notifier: Notifier::default(),
            theme,
            prefs,
        }
    }

    pub fn state(&self) -> &NoteState {
        &self.state
    }

    pub fn view(&self) -> &ListView {
        &self.view
    }

    pub fn create_form(&self) -> &CreateForm {
        &self.create
    }

    pub fn edit_form(&self) -> Option<&EditForm> {
        self.edit.as_ref()
    }

    pub fn pending_delete(&self) -> Option<NoteId> {
        self.confirm_delete
    }

    pub fn create_pending(&self) -> bool {
        self.create_pending
    }

    pub fn edit_pending(&self) -> bool {
        self.edit_pending.is_some()
    }

    pub fn is_deleting(&self, id: NoteId) -> bool {
        self.deleting.contains(&id)
    }

    pub fn modals(&self) -> &ModalController {
        &self.modals
    }

    pub fn modals_mut(&mut self) -> &mut ModalController {
        &mut self.modals
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Routes one action to its handler. Returns the remote call to issue,
    /// if the action needs one.
    pub fn dispatch(&mut self, action: Action) -> Option<RemoteOp> {
        match action {
            Action::SetCreateText(text) => self.create.text = text,
            Action::SetCreateDeadline(deadline) => self.create.deadline = deadline,
            Action::SubmitCreate => return self.submit_create(),
            Action::OpenEdit(id) => self.open_edit(id),
            Action::SetEditText(text) => {
                if let Some(form) = self.edit.as_mut() {
                    form.text = text;
                }
            }
            Action::SetEditDeadline(deadline) => {
                if let Some(form) = self.edit.as_mut() {
                    form.deadline = deadline;
                }
            }
            Action::SubmitEdit => return self.submit_edit(),
            Action::CloseEdit => self.modals.close(ModalKind::Edit),
            Action::RequestDelete(id) => self.request_delete(id),
            Action::ConfirmDelete => return self.confirm_delete(),
            Action::CancelDelete => self.confirm_delete = None,
            Action::Search(query) => {
                self.state.set_query(query);
                self.rerender();
            }
            Action::ClearSearch => {
                self.state.clear_query();
                self.rerender();
            }
            Action::ToggleTheme => self.set_theme(self.theme.toggle()),
            Action::OpenAbout => self.modals.open(ModalKind::About),
            Action::CloseAbout => self.modals.close(ModalKind::About),
            Action::Escape => {
                if self.confirm_delete.take().is_none() {
                    self.modals.escape();
                }
            }
            Action::BackdropClick => {
                self.modals.backdrop_click();
            }
        }
        None
    }

    /// Applies the outcome of a remote call. Guards set when the call was
    /// issued are always released here.
    pub fn complete(&mut self, completion: Completion) {
        let Completion { op, result } = completion;
        match op {
            RemoteOp::Create { .. } => self.finish_create(result),
            RemoteOp::Update { id, .. } => self.finish_edit(id, result),
            RemoteOp::Delete { id } => self.finish_delete(id, result),
        }
    }

    /// Dispatches an action and, when it issues a request, awaits it and
    /// reconciles in one go.
    pub async fn perform<T: Transport>(&mut self, action: Action, client: &RemoteClient<T>) {
        if let Some(op) = self.dispatch(action) {
            let result = op.execute(client).await;
            self.complete(Completion { op, result });
        }
    }

    pub fn refresh_urgency(&mut self, now: DateTime<Utc>) -> usize {
        self.view.refresh_urgency(now)
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.prefs.set(theme);
        self.notifier
            .show(format!("Theme: {}", theme), NoticeKind::Info);
    }

    fn rerender(&mut self) {
        self.view = render(&self.state, Utc::now());
    }

    fn submit_create(&mut self) -> Option<RemoteOp> {
        if self.create_pending {
            debug!("create already in flight");
            return None;
        }
        let text = self.create.text.trim();
        if text.is_empty() {
            return None;
        }
        self.create_pending = true;
        Some(RemoteOp::Create {
            text: text.to_string(),
            deadline: self.create.deadline.trim().to_string(),
        })
    }

    fn finish_create(&mut self, result: Result<Value, ApiError>) {
        self.create_pending = false;
        match result {
            Ok(data) => match note_from_response(&data) {
                Some(note) => {
                    info!(id = note.id, "note created");
                    self.state.insert_front(note);
                    self.create = CreateForm::default();
                    self.rerender();
                    self.notifier.show("Saved", NoticeKind::Success);
                }
                None => {
                    warn!("create succeeded without a note in the response");
                    self.notifier
                        .show("Server returned no note", NoticeKind::Error);
                }
            },
            Err(err) => self.notifier.show(err.to_string(), NoticeKind::Error),
        }
    }

    fn open_edit(&mut self, id: NoteId) {
        let note = match self.state.get(id) {
            Some(note) => note,
            None => return,
        };
        self.edit = Some(EditForm {
            id,
            text: note.text.clone(),
            deadline: to_minute_precision(note.deadline.as_deref()),
        });
        self.modals.open(ModalKind::Edit);
    }

    fn submit_edit(&mut self) -> Option<RemoteOp> {
        if self.edit_pending.is_some() || !self.modals.is_open(ModalKind::Edit) {
            return None;
        }
        let form = self.edit.as_ref()?;
        self.state.get(form.id)?;
        let text = form.text.trim();
        if text.is_empty() {
            return None;
        }
        self.edit_pending = Some(form.id);
        Some(RemoteOp::Update {
            id: form.id,
            text: text.to_string(),
            deadline: form.deadline.trim().to_string(),
        })
    }

    fn finish_edit(&mut self, id: NoteId, result: Result<Value, ApiError>) {
        self.edit_pending = None;
        let data = match result {
            Ok(data) => data,
            Err(err) => {
                self.notifier.show(err.to_string(), NoticeKind::Error);
                return;
            }
        };
        match note_from_response(&data) {
            Some(note) => {
                info!(id, "note updated");
                self.state.replace(id, note);
                self.rerender();
            }
            None => {
                warn!(id, "update succeeded without a note in the response");
                self.notifier
                    .show("Server returned no note", NoticeKind::Error);
                return;
            }
        }
        if self.edit.as_ref().map(|f| f.id) == Some(id) {
            self.modals.close(ModalKind::Edit);
            self.edit = None;
        }
        self.notifier.show("Updated", NoticeKind::Success);
    }

    fn request_delete(&mut self, id: NoteId) {
        if self.deleting.contains(&id) || self.state.get(id).is_none() {
            return;
        }
        self.confirm_delete = Some(id);
    }

    fn confirm_delete(&mut self) -> Option<RemoteOp> {
        let id = self.confirm_delete.take()?;
        if !self.deleting.insert(id) {
            return None;
        }
        Some(RemoteOp::Delete { id })
    }

    fn finish_delete(&mut self, id: NoteId, result: Result<Value, ApiError>) {
        self.deleting.remove(&id);
        match result {
            Ok(_) => {
                info!(id, "note deleted");
                self.state.remove_by_id(id);
                self.rerender();
                self.notifier.show("Deleted", NoticeKind::Success);
            }
            Err(err) => self.notifier.show(err.to_string(), NoticeKind::Error),
        }
    }
}
