//! Interactive event loop: owns the terminal, forwards key events into the
//! application state, and drains stream/query channels between redraws.
//!
//! All transcript mutation happens here, on this single task; background
//! tasks only ever send over channels.

use std::error::Error;
use std::io;
use std::time::Duration;

use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::Terminal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::api::{AdvisorClient, ClientConfig, QueryResponse};
use crate::cli::Args;
use crate::core::app::App;
use crate::core::chat_stream::{QueryStreamService, StreamParams};
use crate::ui;

type QueryResult = (u64, Result<QueryResponse, String>);

pub async fn run_chat(args: Args) -> Result<(), Box<dyn Error>> {
    let client = AdvisorClient::new(
        reqwest::Client::new(),
        ClientConfig {
            base_url: args.base_url.clone(),
            max_context_docs: args.max_context_docs,
        },
    );
    let idle_timeout =
        (args.idle_timeout_secs > 0).then(|| Duration::from_secs(args.idle_timeout_secs));

    let mut app = App::new(client.base_url().to_string());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, event::EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Probe once behind the connecting screen. The verdict is final: on an
    // unreachable backend the loop below only ever draws the error screen.
    terminal.draw(|f| ui::draw(f, &app))?;
    app.apply_health(client.health_check().await);

    let (stream_service, mut stream_rx) = QueryStreamService::new();
    let (query_tx, mut query_rx) = mpsc::unbounded_channel::<QueryResult>();
    let cancel_token = CancellationToken::new();

    let result = loop {
        terminal.draw(|f| ui::draw(f, &app))?;

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        break Ok(());
                    }
                    KeyCode::Enter => submit_current_input(
                        &mut app,
                        &client,
                        &stream_service,
                        &query_tx,
                        &cancel_token,
                        idle_timeout,
                        args.no_stream,
                    ),
                    KeyCode::Char(c) if !app.is_loading => app.input.push(c),
                    KeyCode::Backspace if !app.is_loading => {
                        app.input.pop();
                    }
                    KeyCode::Up => scroll_up(&mut app, &terminal, 1),
                    KeyCode::Down => scroll_down(&mut app, &terminal, 1),
                    _ => {}
                },
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollUp => scroll_up(&mut app, &terminal, 3),
                    MouseEventKind::ScrollDown => scroll_down(&mut app, &terminal, 3),
                    _ => {}
                },
                _ => {}
            }
        }

        // Apply everything the background tasks produced since the last
        // frame, in arrival order.
        while let Ok((message, stream_id)) = stream_rx.try_recv() {
            app.apply_stream_message(stream_id, message);
        }
        while let Ok((request_id, query_result)) = query_rx.try_recv() {
            app.complete_query(request_id, query_result);
        }
    };

    cancel_token.cancel();

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        event::DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn submit_current_input(
    app: &mut App,
    client: &AdvisorClient,
    stream_service: &QueryStreamService,
    query_tx: &mpsc::UnboundedSender<QueryResult>,
    cancel_token: &CancellationToken,
    idle_timeout: Option<Duration>,
    no_stream: bool,
) {
    let text = app.input.clone();

    if no_stream {
        if let Some((query, request_id)) = app.begin_query_submission(&text) {
            app.input.clear();
            let client = client.clone();
            let query_tx = query_tx.clone();
            tokio::spawn(async move {
                let result = client.query(&query).await.map_err(|e| e.to_string());
                let _ = query_tx.send((request_id, result));
            });
        }
    } else if let Some((query, stream_id)) = app.begin_streaming_submission(&text) {
        app.input.clear();
        stream_service.spawn_stream(StreamParams {
            client: client.http_client().clone(),
            base_url: client.base_url().to_string(),
            query,
            max_context_docs: client.max_context_docs(),
            idle_timeout,
            cancel_token: cancel_token.clone(),
            stream_id,
        });
    }
}

fn transcript_height(terminal: &Terminal<CrosstermBackend<io::Stdout>>) -> u16 {
    let terminal_height = terminal.size().map(|s| s.height).unwrap_or_default();
    terminal_height
        .saturating_sub(ui::INPUT_PANE_HEIGHT)
        .saturating_sub(ui::TRANSCRIPT_TITLE_HEIGHT)
}

fn max_scroll_offset(app: &App, terminal: &Terminal<CrosstermBackend<io::Stdout>>) -> u16 {
    ui::transcript_line_count(app).saturating_sub(transcript_height(terminal))
}

fn scroll_up(app: &mut App, terminal: &Terminal<CrosstermBackend<io::Stdout>>, lines: u16) {
    let max_offset = max_scroll_offset(app, terminal);
    let current = if app.auto_scroll {
        max_offset
    } else {
        app.scroll_offset.min(max_offset)
    };
    app.scroll_offset = current.saturating_sub(lines);
    app.auto_scroll = false;
}

fn scroll_down(app: &mut App, terminal: &Terminal<CrosstermBackend<io::Stdout>>, lines: u16) {
    let max_offset = max_scroll_offset(app, terminal);
    app.scroll_offset = app.scroll_offset.saturating_add(lines).min(max_offset);
    // Reaching the bottom re-engages follow mode.
    if app.scroll_offset >= max_offset {
        app.auto_scroll = true;
    }
}
