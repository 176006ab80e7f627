#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalKind {
    Edit,
    About,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModalState {
    #[default]
    Closed,
    Open,
}

/// Visibility of the dialogs layered over the note list.
#[derive(Debug, Default)]
pub struct ModalController {
    edit: ModalState,
    about: ModalState,
    scroll_locked: bool,
    focus_request: FocusRequest,
}

/// Deferred focus: armed by `open(Edit)`, visible only after the current turn
/// ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum FocusRequest {
    #[default]
    Idle,
    Armed,
    Ready,
}

impl ModalController {
    pub fn open(&mut self, kind: ModalKind) {
        *self.slot(kind) = ModalState::Open;
        self.scroll_locked = true;
        if kind == ModalKind::Edit {
            self.focus_request = FocusRequest::Armed;
        }
    }

    pub fn close(&mut self, kind: ModalKind) {
        *self.slot(kind) = ModalState::Closed;
        if kind == ModalKind::Edit {
            self.focus_request = FocusRequest::Idle;
        }
        self.scroll_locked = self.any_open();
    }

    pub fn is_open(&self, kind: ModalKind) -> bool {
        match kind {
            ModalKind::Edit => self.edit == ModalState::Open,
            ModalKind::About => self.about == ModalState::Open,
        }
    }

    pub fn any_open(&self) -> bool {
        self.is_open(ModalKind::Edit) || self.is_open(ModalKind::About)
    }

    pub fn scroll_locked(&self) -> bool {
        self.scroll_locked
    }

    /// Backdrop clicks only dismiss the edit dialog.
    pub fn backdrop_click(&mut self) -> Option<ModalKind> {
        if self.is_open(ModalKind::Edit) {
            self.close(ModalKind::Edit);
            return Some(ModalKind::Edit);
        }
        None
    }

    /// Escape closes the edit dialog first, then the about dialog.
    pub fn escape(&mut self) -> Option<ModalKind> {
        let target = if self.is_open(ModalKind::Edit) {
            ModalKind::Edit
        } else if self.is_open(ModalKind::About) {
            ModalKind::About
        } else {
            return None;
        };
        self.close(target);
        Some(target)
    }

    /// Marks the end of a scheduling turn; an armed focus request becomes
    /// takeable.
    pub fn end_turn(&mut self) {
        if self.focus_request == FocusRequest::Armed {
            self.focus_request = FocusRequest::Ready;
        }
    }

    /// True once per open of the edit dialog, no earlier than the turn after
    /// it was opened.
    pub fn take_focus_request(&mut self) -> bool {
        if self.focus_request == FocusRequest::Ready && self.is_open(ModalKind::Edit) {
            self.focus_request = FocusRequest::Idle;
            return true;
        }
        false
    }

    fn slot(&mut self, kind: ModalKind) -> &mut ModalState {
        match kind {
            ModalKind::Edit => &mut self.edit,
            ModalKind::About => &mut self.about,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_and_close_toggle_scroll_lock() {
        let mut modals = ModalController::default();
        assert!(!modals.scroll_locked());
        modals.open(ModalKind::About);
        assert!(modals.is_open(ModalKind::About));
        assert!(modals.scroll_locked());
        modals.close(ModalKind::About);
        assert!(!modals.scroll_locked());
    }

    #[test]
    fn scroll_stays_locked_while_another_modal_is_open() {
        let mut modals = ModalController::default();
        modals.open(ModalKind::About);
        modals.open(ModalKind::Edit);
        modals.close(ModalKind::Edit);
        assert!(modals.scroll_locked());
    }

    #[test]
    fn escape_prefers_edit_dialog() {
        let mut modals = ModalController::default();
        modals.open(ModalKind::About);
        modals.open(ModalKind::Edit);
        assert_eq!(modals.escape(), Some(ModalKind::Edit));
        assert!(modals.is_open(ModalKind::About));
        assert_eq!(modals.escape(), Some(ModalKind::About));
        assert_eq!(modals.escape(), None);
    }

    #[test]
    fn backdrop_ignores_about_dialog() {
        let mut modals = ModalController::default();
        modals.open(ModalKind::About);
        assert_eq!(modals.backdrop_click(), None);
        assert!(modals.is_open(ModalKind::About));
        modals.open(ModalKind::Edit);
        assert_eq!(modals.backdrop_click(), Some(ModalKind::Edit));
        assert!(!modals.is_open(ModalKind::Edit));
    }

    #[test]
    fn focus_is_deferred_to_the_next_turn() {
        let mut modals = ModalController::default();
        modals.open(ModalKind::Edit);
        assert!(!modals.take_focus_request());
        modals.end_turn();
        assert!(modals.take_focus_request());
        assert!(!modals.take_focus_request());
    }

    #[test]
    fn closing_before_the_turn_ends_drops_focus() {
        let mut modals = ModalController::default();
        modals.open(ModalKind::Edit);
        modals.close(ModalKind::Edit);
        modals.end_turn();
        assert!(!modals.take_focus_request());
    }
}
