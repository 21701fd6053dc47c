use std::fs::OpenOptions;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind}, execute, terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen}};
use ratatui::{backend::CrosstermBackend, Terminal, widgets::{Block, Borders, List, ListItem, Paragraph, ListState}, layout::{Layout, Constraint, Direction}, style::{Style, Modifier, Color}};
use tracing_subscriber::EnvFilter;

use todo_sync::{
    application::{cache::PersistentCache, projection, session::Session, todo_store::{DeleteAllPolicy, TodoStore}},
    config::Settings,
    domain::{repository::KeyValueStore, todo::Todo},
    infrastructure::{http_remote::HttpCollection, sqlite_store::{prepare_sqlite_file, SqliteKeyValueStore}},
};

type Store = TodoStore<SqliteKeyValueStore, HttpCollection>;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env()?;
    // Logs go to a file; stdout belongs to the terminal UI.
    let log_file = OpenOptions::new().create(true).append(true).open(&settings.log_file)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .init();

    prepare_sqlite_file(&settings.database_url)?;
    let kv = SqliteKeyValueStore::connect(&settings.database_url).await?;
    kv.init().await?;
    let cache = PersistentCache::new(kv);
    let session = Session::restore(&cache).await?;
    let remote = HttpCollection::new(&settings.remote_base_url, settings.remote_timeout)?;
    let store = TodoStore::new(session, cache, remote).with_policy(settings.delete_all_policy);

    let status = match store.bootstrap().await {
        Ok(source) => format!("loaded from {source:?}"),
        Err(e) => format!("could not load todos: {e}"),
    };

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, store.clone(), status).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    store.teardown().await?;
    res
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode { View, Add, Search, Username }

struct App {
    store: Store,
    todos: Vec<Todo>,
    selected: usize,
    last_tick: Instant,
    mode: Mode,
    list_state: ListState,
    search: String,
    draft: String,
    status: String,
}

impl App {
    /// Re-reads the store; background creates may have backfilled ids since the last tick.
    fn refresh(&mut self) {
        self.todos = self.store.todos();
        let len = self.visible().len();
        if len == 0 { self.selected = 0; self.list_state.select(None); }
        else { if self.selected >= len { self.selected = len - 1; } self.list_state.select(Some(self.selected)); }
    }

    fn visible(&self) -> Vec<&Todo> { projection::filter(&self.todos, &self.search) }

    fn selected_todo(&self) -> Option<Todo> { self.visible().get(self.selected).map(|t| (*t).clone()) }

    async fn add(&mut self) {
        let title = self.draft.trim().to_string();
        if title.is_empty() {
            self.status = "title must not be empty".into();
            return;
        }
        // The pending create keeps running in the background; refresh picks up its id.
        self.status = match self.store.add(title).await {
            Ok(pending) => format!("added \"{}\"", pending.todo.title),
            Err(e) => format!("add failed: {e}"),
        };
    }

    async fn delete_selected(&mut self) {
        let Some(todo) = self.selected_todo() else { return };
        let Some(id) = todo.id else {
            self.status = format!("\"{}\" is not synced yet", todo.title);
            return;
        };
        self.status = match self.store.delete(id).await {
            Ok(_) => format!("deleted \"{}\"", todo.title),
            Err(e) => format!("delete failed: {e}"),
        };
        if self.selected > 0 { self.selected -= 1; }
    }

    async fn delete_all(&mut self) {
        self.status = match self.store.delete_all().await {
            Ok(report) if report.all_succeeded() => format!("deleted {} todos", report.removed),
            Ok(report) => {
                let failed = report.failures().count();
                match self.store.policy() {
                    DeleteAllPolicy::AllOrNothing => format!("{failed} todos could not be deleted remotely, nothing removed"),
                    DeleteAllPolicy::RemoveSucceeded => format!("{failed} todos could not be deleted remotely, removed {}", report.removed),
                }
            }
            Err(e) => format!("delete all failed: {e}"),
        };
    }

    async fn save_username(&mut self) {
        let name = std::mem::take(&mut self.draft);
        if let Err(e) = self.store.set_username(name).await {
            self.status = format!("saving username failed: {e}");
        }
    }
}

async fn run_app(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, store: Store, status: String) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut app = App { store, todos: vec![], selected: 0, last_tick: Instant::now(), mode: Mode::View, list_state: ListState::default(), search: String::new(), draft: String::new(), status };

    loop {
        app.refresh();
        let username = app.store.username();
        terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3),
                    Constraint::Min(1),
                    Constraint::Length(3),
                ])
                .split(f.size());

            let today = chrono::Local::now().format("%Y-%m-%d");
            let who = if username.is_empty() { "(no name)".to_string() } else { username.clone() };
            let header = Paragraph::new(format!("User: {who}  |  Date: {today}  |  a: add, d: delete, D: delete all, /: search, u: username, q: quit"))
                .block(Block::default().borders(Borders::ALL).title("To-Do List"));
            f.render_widget(header, chunks[0]);

            let visible = app.visible();
            let list_items: Vec<ListItem> = visible.iter().map(|t| {
                let mark = if t.completed { "[x]" } else { "[ ]" };
                let sync = if t.is_synced() { "" } else { "  (not synced)" };
                ListItem::new(format!("{} {}{}", mark, t.title, sync))
            }).collect();
            let title = if app.search.is_empty() { format!("items [{}]", visible.len()) } else { format!("items [{}] matching \"{}\"", visible.len(), app.search) };
            let list = List::new(list_items)
                .block(Block::default().borders(Borders::ALL).title(title))
                .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD | Modifier::REVERSED))
                .highlight_symbol(">> ");
            f.render_stateful_widget(list, chunks[1], &mut app.list_state);

            let footer_text = match app.mode {
                Mode::View => app.status.clone(),
                Mode::Add => format!("New todo: {}_  |  Enter to save, Esc to cancel", app.draft),
                Mode::Search => format!("Search: {}_  |  Enter to keep, Esc to clear", app.search),
                Mode::Username => format!("Username: {}_  |  Enter to save, Esc to cancel", app.draft),
            };
            let footer = Paragraph::new(footer_text)
                .block(Block::default().borders(Borders::ALL).title(match app.mode { Mode::View => "status", Mode::Add => "add", Mode::Search => "search", Mode::Username => "username" }));
            f.render_widget(footer, chunks[2]);
        })?;

        let timeout = tick_rate.saturating_sub(app.last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                // Only act on key presses; ignore repeats and releases to prevent duplicate input
                if key.kind != KeyEventKind::Press { continue; }
                match app.mode {
                    Mode::View => match key.code {
                        KeyCode::Char('q') => break,
                        KeyCode::Up => { if app.selected > 0 { app.selected -= 1; } }
                        KeyCode::Down => { let len = app.visible().len(); if app.selected + 1 < len { app.selected += 1; } }
                        KeyCode::Char('a') => { app.mode = Mode::Add; app.draft.clear(); }
                        KeyCode::Char('d') => app.delete_selected().await,
                        KeyCode::Char('D') => app.delete_all().await,
                        KeyCode::Char('/') => { app.mode = Mode::Search; }
                        KeyCode::Char('u') => { app.mode = Mode::Username; app.draft = app.store.username(); }
                        _ => {}
                    },
                    Mode::Add => match key.code {
                        KeyCode::Esc => { app.mode = Mode::View; app.draft.clear(); }
                        KeyCode::Enter => { app.add().await; app.mode = Mode::View; app.draft.clear(); }
                        KeyCode::Backspace => { app.draft.pop(); }
                        KeyCode::Char(c) => app.draft.push(c),
                        _ => {}
                    },
                    Mode::Search => match key.code {
                        KeyCode::Esc => { app.mode = Mode::View; app.search.clear(); }
                        KeyCode::Enter => { app.mode = Mode::View; }
                        KeyCode::Backspace => { app.search.pop(); app.selected = 0; }
                        KeyCode::Char(c) => { app.search.push(c); app.selected = 0; }
                        _ => {}
                    },
                    Mode::Username => match key.code {
                        KeyCode::Esc => { app.mode = Mode::View; app.draft.clear(); }
                        KeyCode::Enter => { app.save_username().await; app.mode = Mode::View; }
                        KeyCode::Backspace => { app.draft.pop(); }
                        KeyCode::Char(c) => app.draft.push(c),
                        _ => {}
                    },
                }
            }
        }
        if app.last_tick.elapsed() >= tick_rate {
            app.last_tick = Instant::now();
        }
    }
    Ok(())
}
