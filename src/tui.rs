use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;
use std::time::Duration;

use crate::context::AppContext;
use crate::manager::CollectionManager;
use crate::models::{sample_applications, ApplicationPatch, ApplicationRecord, Status};
use crate::views::{self, KanbanBoard};

struct BoardState {
    manager: CollectionManager,
    column: usize,
    row: usize,
    message: Option<String>,
}

impl BoardState {
    fn new(manager: CollectionManager) -> Self {
        Self {
            manager,
            column: 0,
            row: 0,
            message: None,
        }
    }

    fn board(&self) -> KanbanBoard {
        views::kanban(&self.manager.records())
    }

    fn current_status(&self) -> Status {
        Status::ALL[self.column]
    }

    fn current(&self, board: &KanbanBoard) -> Option<ApplicationRecord> {
        board.column(self.current_status()).get(self.row).cloned()
    }

    /// Keep the cursor on a card after the list changed under it.
    fn clamp(&mut self) {
        let len = self.board().column(self.current_status()).len();
        self.row = self.row.min(len.saturating_sub(1));
    }

    fn left(&mut self) {
        if self.column > 0 {
            self.column -= 1;
            self.clamp();
        }
    }

    fn right(&mut self) {
        if self.column < Status::ALL.len() - 1 {
            self.column += 1;
            self.clamp();
        }
    }

    fn down(&mut self) {
        let len = self.board().column(self.current_status()).len();
        if len > 0 && self.row < len - 1 {
            self.row += 1;
        }
    }

    fn up(&mut self) {
        self.row = self.row.saturating_sub(1);
    }

    fn move_to(&mut self, status: Status) {
        let Some(record) = self.current(&self.board()) else { return };
        let patch = ApplicationPatch::default().status(status.label());
        if self.manager.update(record.id, &patch) {
            self.message = Some(format!("#{} moved to {}", record.id, status));
        }
        self.clamp();
    }

    fn delete(&mut self) {
        let Some(record) = self.current(&self.board()) else { return };
        if self.manager.remove(record.id) {
            self.message = Some(format!("Deleted #{} ({})", record.id, record.company));
        }
        self.clamp();
    }
}

pub fn run_board(ctx: &AppContext, demo: bool, poll_interval: Duration) -> Result<()> {
    let mut manager = ctx.manager();
    if demo {
        manager.initialize(&sample_applications());
    } else {
        manager.initialize(&[]);
    }

    let mut state = BoardState::new(manager);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, ctx, poll_interval);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut BoardState,
    ctx: &AppContext,
    poll_interval: Duration,
) -> Result<()> {
    loop {
        terminal.draw(|frame| draw(frame, state))?;

        if event::poll(poll_interval)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Left | KeyCode::Char('h') => state.left(),
                    KeyCode::Right | KeyCode::Char('l') => state.right(),
                    KeyCode::Down | KeyCode::Char('j') => state.down(),
                    KeyCode::Up | KeyCode::Char('k') => state.up(),
                    KeyCode::Char('a') => state.move_to(Status::Applied),
                    KeyCode::Char('s') => state.move_to(Status::Shortlisted),
                    KeyCode::Char('i') => state.move_to(Status::Interview),
                    KeyCode::Char('o') => state.move_to(Status::Offered),
                    KeyCode::Char('x') => state.move_to(Status::Rejected),
                    KeyCode::Char('d') => state.delete(),
                    _ => {}
                }
            }
        }

        // Another process may have written the slot meanwhile
        if ctx.pump() {
            state.message = Some("Updated from another session".to_string());
            state.clamp();
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &BoardState) {
    let board = state.board();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),
            Constraint::Length(10),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 5); 5])
        .split(rows[0]);

    for (index, (status, records)) in board.columns().enumerate() {
        let items: Vec<ListItem> = records
            .iter()
            .map(|r| {
                let title = if r.job_title.chars().count() > 24 {
                    format!("{}...", r.job_title.chars().take(21).collect::<String>())
                } else {
                    r.job_title.clone()
                };
                ListItem::new(vec![
                    Line::from(format!("#{} {}", r.id, r.company)),
                    Line::from(Span::styled(
                        format!("   {}", title),
                        Style::default().fg(Color::DarkGray),
                    )),
                ])
            })
            .collect();

        let focused = index == state.column;
        let border_style = if focused {
            status_style(status).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border_style)
                    .title(format!(" {} ({}) ", status, records.len())),
            )
            .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
            .highlight_symbol("> ");

        let mut list_state = ListState::default();
        if focused && !records.is_empty() {
            list_state.select(Some(state.row));
        }
        frame.render_stateful_widget(list, columns[index], &mut list_state);
    }

    let detail = Paragraph::new(build_detail(state.current(&board)))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false });
    frame.render_widget(detail, rows[1]);

    let footer = match &state.message {
        Some(message) => format!(" {}", message),
        None => " h/l:column  j/k:card  a/s/i/o/x:move  d:delete  q:quit".to_string(),
    };
    let help = Paragraph::new(footer).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[2]);
}

fn status_style(status: Status) -> Style {
    match status {
        Status::Applied => Style::default().fg(Color::Cyan),
        Status::Shortlisted => Style::default().fg(Color::Magenta),
        Status::Interview => Style::default().fg(Color::Yellow),
        Status::Offered => Style::default().fg(Color::Green),
        Status::Rejected => Style::default().fg(Color::Red),
    }
}

fn build_detail(record: Option<ApplicationRecord>) -> Text<'static> {
    let Some(record) = record else {
        return Text::raw("No application selected");
    };

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(Span::styled(
        format!("{} at {}", record.job_title, record.company),
        Style::default().add_modifier(Modifier::BOLD),
    )));

    let status = record.effective_status().to_string();
    let style = record
        .recognized_status()
        .map(status_style)
        .unwrap_or_default();
    lines.push(Line::from(Span::styled(format!("Status: {}", status), style)));

    let fields = [
        ("Platform", &record.platform),
        ("Applied", &record.applied_date),
        ("Offered", &record.offered_date),
        ("Location", &record.location),
        ("Salary", &record.salary),
        ("Resume", &record.resume),
    ];
    for (label, value) in fields {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            lines.push(Line::from(format!("{}: {}", label, value)));
        }
    }

    if let Some(notes) = record.notes.as_deref().filter(|n| !n.is_empty()) {
        lines.push(Line::from(""));
        for line in textwrap::fill(notes, 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
    }

    Text::from(lines)
}
