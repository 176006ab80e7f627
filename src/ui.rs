use crate::modal::ModalKind;
use crate::model::NoteId;
use crate::remote::{RemoteClient, Transport};
use crate::storage::Theme;
use crate::tasks::{local_clock_label, PeriodicTasks, Tick};
use crate::urgency::Urgency;
use crate::view::ItemView;
use crate::workflow::{Action, Completion, NoticeKind, RemoteOp, Workflow};
use anyhow::Result;
use chrono::Utc;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::debug;

pub async fn run<T>(workflow: Workflow, client: RemoteClient<T>) -> Result<()>
where
    T: Transport + Clone + Send + Sync + 'static,
{
    let mut terminal = setup_terminal()?;
    let mut app = App::new(workflow);
    let result = app.event_loop(&mut terminal, client).await;
    teardown_terminal(&mut terminal)?;
    result
}

enum AppMessage {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Completed(Completion),
    Tick(Tick),
}

impl From<Tick> for AppMessage {
    fn from(tick: Tick) -> Self {
        AppMessage::Tick(tick)
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Focus {
    List,
    Search,
    CreateText,
    CreateDeadline,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum EditField {
    Text,
    Deadline,
}

struct App {
    workflow: Workflow,
    focus: Focus,
    edit_field: Option<EditField>,
    selected: usize,
    search: FieldValue,
    create_text: FieldValue,
    create_deadline: FieldValue,
    edit_text: FieldValue,
    edit_deadline: FieldValue,
    clock: String,
    edit_area: Option<Rect>,
}

#[derive(Clone, Default)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    /// Adopts `value` when the controller changed it underneath us.
    fn sync(&mut self, value: &str) {
        if self.value != value {
            *self = FieldValue::new(value);
        }
    }

    fn move_left(&mut self) {
        self.cursor = prev_boundary(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        self.cursor = next_boundary(self.cursor, &self.value);
    }

    fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let prev = prev_boundary(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
        true
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }

    /// Applies an editing key. Returns true when the value changed.
    fn apply(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.len(),
            KeyCode::Backspace => return self.backspace(),
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.insert_char(c);
                return true;
            }
            _ => {}
        }
        false
    }
}

struct Palette {
    base: Style,
    dim: Color,
    accent: Color,
    text: Color,
    highlight: Style,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Palette {
                base: Style::default().bg(Color::Rgb(16, 18, 24)).fg(Color::Gray),
                dim: Color::DarkGray,
                accent: Color::Cyan,
                text: Color::White,
                highlight: Style::default()
                    .bg(Color::Rgb(44, 52, 70))
                    .add_modifier(Modifier::BOLD),
            },
            Theme::Light => Palette {
                base: Style::default().bg(Color::Rgb(246, 244, 238)).fg(Color::Black),
                dim: Color::Gray,
                accent: Color::Blue,
                text: Color::Black,
                highlight: Style::default()
                    .bg(Color::Rgb(252, 214, 112))
                    .add_modifier(Modifier::BOLD),
            },
        }
    }
}

impl App {
    fn new(workflow: Workflow) -> Self {
        let search = FieldValue::new(workflow.state().query());
        App {
            workflow,
            focus: Focus::List,
            edit_field: None,
            selected: 0,
            search,
            create_text: FieldValue::default(),
            create_deadline: FieldValue::default(),
            edit_text: FieldValue::default(),
            edit_deadline: FieldValue::default(),
            clock: local_clock_label(),
            edit_area: None,
        }
    }

    async fn event_loop<T>(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
        client: RemoteClient<T>,
    ) -> Result<()>
    where
        T: Transport + Clone + Send + Sync + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<AppMessage>();
        spawn_input_reader(tx.clone());
        let mut tasks = PeriodicTasks::spawn(tx.clone());

        loop {
            self.sync_fields();
            terminal.draw(|f| self.draw(f))?;

            let modals = self.workflow.modals_mut();
            modals.end_turn();
            if modals.take_focus_request() {
                self.edit_field = Some(EditField::Text);
                continue;
            }

            let msg = match rx.recv().await {
                Some(msg) => msg,
                None => break,
            };
            match msg {
                AppMessage::Key(key) => {
                    if self.quit_requested(key) {
                        break;
                    }
                    if let Some(op) = self.handle_key(key) {
                        spawn_op(&client, op, &tx);
                    }
                }
                AppMessage::Mouse(mouse) => self.handle_mouse(mouse),
                AppMessage::Completed(completion) => self.complete(completion),
                AppMessage::Tick(Tick::Clock) => self.clock = local_clock_label(),
                AppMessage::Tick(Tick::Urgency) => {
                    let changed = self.workflow.refresh_urgency(Utc::now());
                    debug!(changed, "refreshed deadline badges");
                }
            }
        }
        tasks.shutdown();
        Ok(())
    }

    /// Applies a finished request, keeping the cursor on the same note when
    /// it is still listed.
    fn complete(&mut self, completion: Completion) {
        let current = self.current_item().map(|item| item.id);
        self.workflow.complete(completion);
        if let Some(idx) = current.and_then(|id| self.workflow.view().position(id)) {
            self.selected = idx;
        }
    }

    fn quit_requested(&self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }
        key.code == KeyCode::Char('q')
            && self.focus == Focus::List
            && !self.workflow.modals().any_open()
            && self.workflow.pending_delete().is_none()
    }

    /// Pulls controller-owned input values back into the widgets.
    fn sync_fields(&mut self) {
        self.search.sync(self.workflow.state().query());
        let create = self.workflow.create_form();
        self.create_text.sync(&create.text);
        self.create_deadline.sync(&create.deadline);
        match self.workflow.edit_form() {
            Some(form) => {
                self.edit_text.sync(&form.text);
                self.edit_deadline.sync(&form.deadline);
            }
            None => self.edit_field = None,
        }
        let len = self.workflow.view().items.len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<RemoteOp> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        if self.workflow.pending_delete().is_some() {
            return self.handle_confirm_key(key);
        }
        if self.workflow.modals().is_open(ModalKind::Edit) {
            return self.handle_edit_key(key);
        }
        if self.workflow.modals().is_open(ModalKind::About) {
            match key.code {
                KeyCode::Esc => return self.workflow.dispatch(Action::Escape),
                KeyCode::Char('?') | KeyCode::Char('q') => {
                    return self.workflow.dispatch(Action::CloseAbout)
                }
                _ => return None,
            }
        }
        match self.focus {
            Focus::List => self.handle_list_key(key),
            Focus::Search => self.handle_search_key(key),
            Focus::CreateText | Focus::CreateDeadline => self.handle_create_key(key),
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent) -> Option<RemoteOp> {
        let current = self.current_item().map(|item| item.id);
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.selected += 1,
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(id) = current {
                    self.edit_text = FieldValue::default();
                    self.edit_deadline = FieldValue::default();
                    return self.workflow.dispatch(Action::OpenEdit(id));
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = current {
                    return self.workflow.dispatch(Action::RequestDelete(id));
                }
            }
            KeyCode::Char('/') => self.focus = Focus::Search,
            KeyCode::Char('n') => self.focus = Focus::CreateText,
            KeyCode::Char('c') => return self.workflow.dispatch(Action::ClearSearch),
            KeyCode::Char('t') => return self.workflow.dispatch(Action::ToggleTheme),
            KeyCode::Char('?') => return self.workflow.dispatch(Action::OpenAbout),
            KeyCode::Tab => self.focus = Focus::Search,
            _ => {}
        }
        None
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Option<RemoteOp> {
        match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Down => self.focus = Focus::List,
            KeyCode::Tab => self.focus = Focus::CreateText,
            KeyCode::BackTab => self.focus = Focus::List,
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return self.workflow.dispatch(Action::ClearSearch);
            }
            _ => {
                if self.search.apply(key) {
                    self.selected = 0;
                    return self
                        .workflow
                        .dispatch(Action::Search(self.search.value.clone()));
                }
            }
        }
        None
    }

    fn handle_create_key(&mut self, key: KeyEvent) -> Option<RemoteOp> {
        match key.code {
            KeyCode::Esc => self.focus = Focus::List,
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::CreateText => Focus::CreateDeadline,
                    _ => Focus::List,
                }
            }
            KeyCode::BackTab => {
                self.focus = match self.focus {
                    Focus::CreateDeadline => Focus::CreateText,
                    _ => Focus::Search,
                }
            }
            KeyCode::Enter => {
                // The submit control is disabled while a create is in flight.
                if !self.workflow.create_pending() {
                    return self.workflow.dispatch(Action::SubmitCreate);
                }
            }
            _ => {
                if self.focus == Focus::CreateText {
                    if self.create_text.apply(key) {
                        let value = self.create_text.value.clone();
                        return self.workflow.dispatch(Action::SetCreateText(value));
                    }
                } else if self.create_deadline.apply(key) {
                    let value = self.create_deadline.value.clone();
                    return self.workflow.dispatch(Action::SetCreateDeadline(value));
                }
            }
        }
        None
    }

    fn handle_edit_key(&mut self, key: KeyEvent) -> Option<RemoteOp> {
        match key.code {
            KeyCode::Esc => return self.workflow.dispatch(Action::Escape),
            KeyCode::Char('x') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return self.workflow.dispatch(Action::CloseEdit);
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.edit_field = match self.edit_field {
                    Some(EditField::Text) => Some(EditField::Deadline),
                    Some(EditField::Deadline) => Some(EditField::Text),
                    None => None,
                }
            }
            KeyCode::Enter => {
                if !self.workflow.edit_pending() {
                    return self.workflow.dispatch(Action::SubmitEdit);
                }
            }
            _ => match self.edit_field {
                Some(EditField::Text) => {
                    if self.edit_text.apply(key) {
                        let value = self.edit_text.value.clone();
                        return self.workflow.dispatch(Action::SetEditText(value));
                    }
                }
                Some(EditField::Deadline) => {
                    if self.edit_deadline.apply(key) {
                        let value = self.edit_deadline.value.clone();
                        return self.workflow.dispatch(Action::SetEditDeadline(value));
                    }
                }
                None => {}
            },
        }
        None
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Option<RemoteOp> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => self.workflow.dispatch(Action::ConfirmDelete),
            KeyCode::Char('n') => self.workflow.dispatch(Action::CancelDelete),
            KeyCode::Esc => self.workflow.dispatch(Action::Escape),
            _ => None,
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp | MouseEventKind::ScrollDown
                if self.workflow.modals().scroll_locked() => {}
            MouseEventKind::ScrollUp => self.selected = self.selected.saturating_sub(1),
            MouseEventKind::ScrollDown => self.selected += 1,
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(area) = self.edit_area {
                    if !rect_contains(area, mouse.column, mouse.row) {
                        self.workflow.dispatch(Action::BackdropClick);
                    }
                }
            }
            _ => {}
        }
    }

    fn current_item(&self) -> Option<&ItemView> {
        self.workflow.view().items.get(self.selected)
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let palette = Palette::for_theme(self.workflow.theme());
        f.render_widget(Block::default().style(palette.base), f.size());
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(3),
                Constraint::Length(4),
                Constraint::Min(5),
                Constraint::Length(3),
            ])
            .split(f.size());

        self.draw_header(f, layout[0], &palette);
        self.draw_search(f, layout[1], &palette);
        self.draw_create(f, layout[2], &palette);
        self.draw_list(f, layout[3], &palette);
        self.draw_footer(f, layout[4], &palette);

        self.edit_area = None;
        if self.workflow.modals().is_open(ModalKind::Edit) {
            self.draw_edit(f, &palette);
        }
        if self.workflow.modals().is_open(ModalKind::About) {
            self.draw_about(f, &palette);
        }
        if let Some(id) = self.workflow.pending_delete() {
            self.draw_confirm(f, id);
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect, palette: &Palette) {
        let theme_label = match self.workflow.theme() {
            Theme::Dark => "◐ Dark",
            Theme::Light => "☀ Light",
        };
        let title = Line::from(vec![
            Span::styled(
                "noteline ",
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{} notes", self.workflow.state().len()),
                Style::default().fg(palette.text),
            ),
            Span::raw("  •  "),
            Span::styled(theme_label, Style::default().fg(Color::Magenta)),
            Span::raw("  •  "),
            Span::styled(
                self.clock.clone(),
                Style::default()
                    .fg(palette.text)
                    .add_modifier(Modifier::BOLD),
            ),
        ]);
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(palette.dim));
        f.render_widget(
            Paragraph::new(title)
                .alignment(Alignment::Center)
                .block(block),
            area,
        );
    }

    fn draw_search(&self, f: &mut ratatui::Frame<'_>, area: Rect, palette: &Palette) {
        let active = self.focus == Focus::Search && !self.workflow.modals().any_open();
        let shown = if active {
            self.search.with_caret()
        } else if self.search.value.is_empty() {
            "type / to filter".to_string()
        } else {
            self.search.value.clone()
        };
        let style = if active || !self.search.value.is_empty() {
            Style::default().fg(palette.text)
        } else {
            Style::default().fg(palette.dim)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Search")
            .border_style(border_style(active, palette));
        f.render_widget(Paragraph::new(Span::styled(shown, style)).block(block), area);
    }

    fn draw_create(&self, f: &mut ratatui::Frame<'_>, area: Rect, palette: &Palette) {
        let open = !self.workflow.modals().any_open();
        let active = open && matches!(self.focus, Focus::CreateText | Focus::CreateDeadline);
        let mut lines = Vec::new();
        lines.push(field_line(
            "Note",
            &self.create_text,
            open && self.focus == Focus::CreateText,
            palette,
        ));
        lines.push(field_line(
            "Deadline (YYYY-MM-DDTHH:MM)",
            &self.create_deadline,
            open && self.focus == Focus::CreateDeadline,
            palette,
        ));
        let submit = if self.workflow.create_pending() {
            Span::styled(" Saving… ", Style::default().fg(palette.dim))
        } else {
            Span::styled(" Enter to save ", Style::default().fg(Color::LightGreen))
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(Line::from(vec![Span::raw("New note "), submit]))
            .border_style(border_style(active, palette));
        f.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_list(&self, f: &mut ratatui::Frame<'_>, area: Rect, palette: &Palette) {
        let view = self.workflow.view();
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Notes")
            .border_style(border_style(
                self.focus == Focus::List && !self.workflow.modals().any_open(),
                palette,
            ));
        if view.empty {
            let message = if self.workflow.state().query().trim().is_empty() {
                "No notes yet. Press n to write one."
            } else {
                "No notes match your search."
            };
            f.render_widget(
                Paragraph::new(message)
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(palette.dim))
                    .block(block),
                area,
            );
            return;
        }
        let width = area.width.saturating_sub(4) as usize;
        let items: Vec<ListItem> = view
            .items
            .iter()
            .map(|item| note_item(item, width, self.workflow.is_deleting(item.id), palette))
            .collect();
        let mut state = ListState::default();
        state.select(Some(self.selected));
        let list = List::new(items)
            .block(block)
            .highlight_style(palette.highlight);
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect, palette: &Palette) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(1)])
            .split(area);

        let help_bar = Paragraph::new(footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(palette.dim)),
            );
        f.render_widget(help_bar, rows[0]);

        if let Some(notice) = self.workflow.notifier().visible(Instant::now()) {
            let color = match notice.kind {
                NoticeKind::Success => Color::LightGreen,
                NoticeKind::Error => Color::LightRed,
                NoticeKind::Info => palette.accent,
            };
            let toast = Paragraph::new(Span::styled(
                notice.message.clone(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
            f.render_widget(toast, rows[1]);
        }
    }

    fn draw_edit(&mut self, f: &mut ratatui::Frame<'_>, palette: &Palette) {
        let area = centered_rect(70, 40, f.size());
        self.edit_area = Some(area);
        let mut lines = vec![
            field_line(
                "Text",
                &self.edit_text,
                self.edit_field == Some(EditField::Text),
                palette,
            ),
            field_line(
                "Deadline",
                &self.edit_deadline,
                self.edit_field == Some(EditField::Deadline),
                palette,
            ),
            Line::from(""),
        ];
        let hint = if self.workflow.edit_pending() {
            "Saving…"
        } else {
            "Enter to save • Ctrl+X, Esc or click outside to cancel • Tab to switch field"
        };
        lines.push(Line::from(Span::styled(hint, Style::default().fg(palette.dim))));
        let dialog = Paragraph::new(lines)
            .style(palette.base)
            .block(
                Block::default()
                    .title(Span::styled(
                        "Edit note",
                        Style::default()
                            .fg(palette.accent)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(palette.accent)),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_about(&self, f: &mut ratatui::Frame<'_>, palette: &Palette) {
        let area = centered_rect(60, 50, f.size());
        let lines = vec![
            Line::from(Span::styled(
                "noteline",
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("version {}", env!("CARGO_PKG_VERSION"))),
            Line::from(""),
            Line::from("A small note list kept in sync with a notes service."),
            Line::from("Deadlines within a day are marked soon; past ones overdue."),
            Line::from(""),
            Line::from(Span::styled(
                "Esc or ? to close",
                Style::default().fg(palette.dim),
            )),
        ];
        let dialog = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .style(palette.base)
            .block(
                Block::default()
                    .title("About")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(palette.accent)),
            );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>, id: NoteId) {
        let area = centered_rect(50, 30, f.size());
        let text = self
            .workflow
            .state()
            .get(id)
            .map(|n| truncate_text(&n.text, 40))
            .unwrap_or_else(|| id.to_string());
        let body = vec![
            Line::from(Span::styled(
                format!("Delete \"{}\"?", text),
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Press y to confirm, n or Esc to cancel"),
        ];
        let dialog = Paragraph::new(body).alignment(Alignment::Center).block(
            Block::default()
                .title(Span::styled(
                    "Confirm Delete",
                    Style::default()
                        .fg(Color::LightRed)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightRed)),
        );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

fn spawn_input_reader(tx: UnboundedSender<AppMessage>) {
    tokio::spawn(async move {
        let mut reader = EventStream::new();
        while let Some(event) = reader.next().await {
            let msg = match event {
                Ok(Event::Key(key)) => AppMessage::Key(key),
                Ok(Event::Mouse(mouse)) => AppMessage::Mouse(mouse),
                Ok(_) => continue,
                Err(_) => break,
            };
            if tx.send(msg).is_err() {
                break;
            }
        }
    });
}

fn spawn_op<T>(client: &RemoteClient<T>, op: RemoteOp, tx: &UnboundedSender<AppMessage>)
where
    T: Transport + Clone + Send + Sync + 'static,
{
    let client = client.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = op.execute(&client).await;
        let _ = tx.send(AppMessage::Completed(Completion { op, result }));
    });
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn rect_contains(area: Rect, x: u16, y: u16) -> bool {
    x >= area.x && x < area.x + area.width && y >= area.y && y < area.y + area.height
}

fn border_style(active: bool, palette: &Palette) -> Style {
    if active {
        Style::default().fg(palette.accent)
    } else {
        Style::default().fg(palette.dim)
    }
}

fn footer_help_line() -> Line<'static> {
    Line::from(vec![
        Span::styled("↑↓ / j k", Style::default().fg(Color::LightCyan)),
        Span::raw(" move  "),
        Span::styled("n", Style::default().fg(Color::LightMagenta)),
        Span::raw(" new  "),
        Span::styled("e", Style::default().fg(Color::LightYellow)),
        Span::raw(" edit  "),
        Span::styled("d", Style::default().fg(Color::LightRed)),
        Span::raw(" delete  "),
        Span::styled("/", Style::default().fg(Color::LightCyan)),
        Span::raw(" search  "),
        Span::styled("c", Style::default().fg(Color::LightCyan)),
        Span::raw(" clear  "),
        Span::styled("t", Style::default().fg(Color::LightGreen)),
        Span::raw(" theme  "),
        Span::styled("?", Style::default().fg(Color::LightGreen)),
        Span::raw(" about  "),
        Span::styled("q", Style::default().fg(Color::LightRed)),
        Span::raw(" quit"),
    ])
}

fn field_line(label: &str, field: &FieldValue, active: bool, palette: &Palette) -> Line<'static> {
    let label_style = Style::default()
        .fg(palette.dim)
        .add_modifier(Modifier::BOLD);
    let value_style = Style::default().fg(if active { palette.accent } else { palette.text });
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    Line::from(vec![
        Span::styled(format!("{}: ", label), label_style),
        Span::styled(text, value_style),
    ])
}

fn note_item(item: &ItemView, width: usize, deleting: bool, palette: &Palette) -> ListItem<'static> {
    let mut meta = vec![Span::styled(
        format!("created {}", item.created),
        Style::default().fg(palette.dim),
    )];
    if let Some(updated) = &item.updated {
        meta.push(Span::raw("  "));
        meta.push(Span::styled(
            format!("updated {}", updated),
            Style::default().fg(palette.dim),
        ));
    }
    if let Some(badge) = &item.deadline {
        let style = match badge.urgency {
            Urgency::Overdue => Style::default()
                .fg(Color::LightRed)
                .add_modifier(Modifier::BOLD),
            Urgency::Soon => Style::default()
                .fg(Color::LightYellow)
                .add_modifier(Modifier::BOLD),
            Urgency::None => Style::default().fg(palette.text),
        };
        let mut label = format!("due {}", badge.deadline);
        if badge.urgency != Urgency::None {
            label.push_str(&format!(" ({})", badge.urgency.label()));
        }
        meta.push(Span::raw("  "));
        meta.push(Span::styled(label, style));
    }
    if deleting {
        meta.push(Span::raw("  "));
        meta.push(Span::styled("deleting…", Style::default().fg(palette.dim)));
    }
    let title = Line::from(Span::styled(
        truncate_text(&item.text, width),
        Style::default()
            .fg(palette.text)
            .add_modifier(Modifier::BOLD),
    ));
    ListItem::new(vec![title, Line::from(meta)])
}

fn prev_boundary(cursor: usize, text: &str) -> usize {
    if cursor == 0 {
        return 0;
    }
    let mut prev = 0;
    for (idx, _) in text.char_indices() {
        if idx >= cursor {
            break;
        }
        prev = idx;
    }
    prev
}

fn next_boundary(cursor: usize, text: &str) -> usize {
    for (idx, ch) in text.char_indices() {
        if idx > cursor {
            return idx;
        }
        if idx == cursor {
            return cursor + ch.len_utf8();
        }
    }
    text.len()
}

fn truncate_text(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let first_line = text.lines().next().unwrap_or_default();
    if first_line.chars().count() <= max && first_line.len() == text.len() {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = first_line.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app(notes: Vec<crate::model::Note>) -> (App, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let prefs = crate::storage::PreferenceStore::at(dir.path().join("prefs.yml"));
        let workflow = Workflow::new(crate::model::NoteState::new(notes), prefs);
        (App::new(workflow), dir)
    }

    #[test]
    fn ctrl_x_closes_the_edit_dialog() {
        let (mut app, _dir) = app(vec![crate::model::note(1, "a")]);
        app.handle_key(key(KeyCode::Char('e')));
        assert!(app.workflow.modals().is_open(ModalKind::Edit));
        let op = app.handle_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL));
        assert_eq!(op, None);
        assert!(!app.workflow.modals().is_open(ModalKind::Edit));
    }

    #[test]
    fn selection_follows_the_note_after_a_completion() {
        use crate::model::note;
        let (mut app, _dir) = app(vec![note(1, "a"), note(2, "b"), note(3, "c")]);
        app.selected = 2;
        app.complete(Completion {
            op: RemoteOp::Delete { id: 1 },
            result: Ok(serde_json::json!({})),
        });
        assert_eq!(app.current_item().map(|item| item.id), Some(3));
        assert_eq!(app.selected, 1);
    }

    #[test]
    fn field_editing_handles_multibyte_chars() {
        let mut field = FieldValue::new("héllo");
        field.move_left();
        field.move_left();
        field.move_left();
        field.move_left();
        assert!(field.backspace());
        assert_eq!(field.value, "éllo");
        assert!(field.apply(key(KeyCode::Char('x'))));
        assert_eq!(field.value, "xéllo");
        assert!(!field.apply(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn sync_resets_only_on_change() {
        let mut field = FieldValue::new("abc");
        field.move_left();
        field.sync("abc");
        assert_eq!(field.cursor, 2);
        field.sync("");
        assert_eq!(field.value, "");
        assert_eq!(field.cursor, 0);
    }

    #[test]
    fn truncate_keeps_short_single_lines() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("a long line of text", 10), "a long ...");
        assert_eq!(truncate_text("two\nlines", 10), "two...");
    }

    #[test]
    fn rect_contains_is_half_open() {
        let area = Rect::new(2, 2, 4, 3);
        assert!(rect_contains(area, 2, 2));
        assert!(rect_contains(area, 5, 4));
        assert!(!rect_contains(area, 6, 4));
        assert!(!rect_contains(area, 1, 3));
    }
}
