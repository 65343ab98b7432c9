//! Main chat event loop.
//!
//! The loop owns the [`App`] outright: terminal events and transport events
//! are both drained here and applied on this one context, so log mutation is
//! single-threaded by construction. A spawned reader task forwards crossterm
//! events over a channel; transport tasks forward exchange events over
//! another; the loop interleaves the two, redraws when something changed,
//! and sleeps briefly when nothing did.

use std::error::Error;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::{
    event::{
        self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste,
        EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::Terminal;
use tokio::sync::mpsc;

use crate::core::app::App;
use crate::core::log::{LogObserver, Turn};
use crate::core::session::SessionSettings;
use crate::core::transport::{ExchangeEvent, TransportService};
use crate::ui::renderer::ui;
use crate::utils::input::sanitize_text_input;

/// Wheel scroll step, in transcript lines.
const WHEEL_SCROLL_LINES: u16 = 3;

/// Dirty bit connecting the log to the draw cadence: the observer sets it on
/// every log change, the loop takes it when deciding whether to redraw.
#[derive(Clone, Default)]
pub struct RedrawFlag(Arc<AtomicBool>);

impl RedrawFlag {
    pub fn mark(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::Relaxed)
    }
}

impl LogObserver for RedrawFlag {
    fn log_changed(&mut self, _turns: &[Turn]) {
        self.mark();
    }
}

enum LoopControl {
    Continue,
    Quit,
}

pub async fn run_chat(settings: SessionSettings) -> Result<(), Box<dyn Error>> {
    let mut app = App::new(settings);
    let redraw = RedrawFlag::default();
    app.log.set_observer(Box::new(redraw.clone()));

    // Setup terminal only after successful app creation
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableBracketedPaste,
        EnableMouseCapture
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (transport, mut exchange_rx) = TransportService::new();

    // Crossterm reads block, so they live on their own task.
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<Event>();
    let reader = tokio::spawn(async move {
        loop {
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if input_tx.send(ev).is_err() {
                            break;
                        }
                    }
                    Err(_) => continue,
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    });

    let result = event_loop(
        &mut terminal,
        &mut app,
        &transport,
        &mut exchange_rx,
        &mut input_rx,
        &redraw,
    )
    .await;

    reader.abort();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    transport: &TransportService,
    exchange_rx: &mut mpsc::UnboundedReceiver<(ExchangeEvent, u64)>,
    input_rx: &mut mpsc::UnboundedReceiver<Event>,
    redraw: &RedrawFlag,
) -> Result<(), Box<dyn Error>> {
    const MAX_FPS: u64 = 60;
    let frame_duration = Duration::from_millis(1000 / MAX_FPS);
    let mut last_draw = Instant::now() - frame_duration;
    let mut request_redraw = true;

    loop {
        if request_redraw && last_draw.elapsed() >= frame_duration {
            terminal.draw(|f| ui(f, app))?;
            last_draw = Instant::now();
            request_redraw = false;
        }

        let page = terminal.size().map(|size| size.height).unwrap_or(24);

        let mut saw_input = false;
        while let Ok(ev) = input_rx.try_recv() {
            saw_input = true;
            match ev {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if let LoopControl::Quit = handle_key(app, transport, key, page) {
                        return Ok(());
                    }
                }
                Event::Paste(text) => {
                    app.ui.insert_input(&sanitize_text_input(&text));
                }
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollUp => scroll_up(app, WHEEL_SCROLL_LINES),
                    MouseEventKind::ScrollDown => scroll_down(app, WHEEL_SCROLL_LINES),
                    _ => {}
                },
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
        if saw_input {
            request_redraw = true;
        }

        if drain_exchange_events(app, exchange_rx) {
            request_redraw = true;
        }
        if redraw.take() {
            request_redraw = true;
        }

        // Keep the pulse indicator animating between fragments.
        if app.ui.is_streaming {
            request_redraw = true;
        }

        if !request_redraw {
            tokio::time::sleep(Duration::from_millis(16)).await;
        } else {
            let since_draw = last_draw.elapsed();
            if since_draw < frame_duration {
                tokio::time::sleep(frame_duration - since_draw).await;
            }
        }
    }
}

fn handle_key(
    app: &mut App,
    transport: &TransportService,
    key: KeyEvent,
    page: u16,
) -> LoopControl {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.exchange().cancel();
            return LoopControl::Quit;
        }
        KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.exchange().reset_conversation();
            app.ui.auto_scroll = true;
            app.ui.scroll_offset = 0;
        }
        KeyCode::Esc => {
            app.exchange().cancel();
        }
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
            app.ui.insert_input("\n");
        }
        KeyCode::Enter => {
            submit_input(app, transport);
        }
        KeyCode::PageUp => scroll_up(app, page.saturating_sub(4).max(1)),
        KeyCode::PageDown => scroll_down(app, page.saturating_sub(4).max(1)),
        _ => {
            app.ui.input_event(tui_textarea::Input::from(key));
        }
    }
    LoopControl::Continue
}

fn submit_input(app: &mut App, transport: &TransportService) {
    if app.stream_in_flight() {
        app.ui
            .set_status("A reply is still streaming (Esc interrupts it)");
        return;
    }
    if app.ui.input_text().trim().is_empty() {
        return;
    }

    let text = app.ui.take_input();
    app.ui.auto_scroll = true;
    if let Some(params) = app.exchange().submit(&text) {
        transport.spawn_call(params);
    }
}

fn scroll_up(app: &mut App, lines: u16) {
    app.ui.auto_scroll = false;
    app.ui.scroll_offset = app.ui.scroll_offset.saturating_sub(lines);
}

// Saturating add only; the renderer clamps to the bottom and re-enables
// auto-scroll when the clamp lands there.
fn scroll_down(app: &mut App, lines: u16) {
    app.ui.scroll_offset = app.ui.scroll_offset.saturating_add(lines);
}

/// Drains every queued transport event, coalescing runs of consecutive
/// fragments from the same exchange into one application. Ordering across
/// event kinds is preserved exactly as they arrived.
fn drain_exchange_events(
    app: &mut App,
    exchange_rx: &mut mpsc::UnboundedReceiver<(ExchangeEvent, u64)>,
) -> bool {
    let mut received_any = false;
    let mut pending: Option<(String, u64)> = None;

    while let Ok((event, exchange_id)) = exchange_rx.try_recv() {
        received_any = true;
        match event {
            ExchangeEvent::Fragment(text) => match &mut pending {
                Some((buffer, id)) if *id == exchange_id => buffer.push_str(&text),
                Some(_) => {
                    flush_pending(app, &mut pending);
                    pending = Some((text, exchange_id));
                }
                None => pending = Some((text, exchange_id)),
            },
            other => {
                flush_pending(app, &mut pending);
                app.exchange().apply_event(other, exchange_id);
            }
        }
    }

    flush_pending(app, &mut pending);
    received_any
}

fn flush_pending(app: &mut App, pending: &mut Option<(String, u64)>) {
    if let Some((buffer, exchange_id)) = pending.take() {
        app.exchange()
            .apply_event(ExchangeEvent::Fragment(buffer), exchange_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log::TurnStatus;
    use crate::utils::test_utils::{create_test_app, RecordingObserver};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn redraw_flag_is_one_shot() {
        let flag = RedrawFlag::default();
        assert!(!flag.take());
        flag.mark();
        assert!(flag.take());
        assert!(!flag.take());
    }

    #[test]
    fn log_changes_mark_the_redraw_flag() {
        let mut app = create_test_app();
        let flag = RedrawFlag::default();
        app.log.set_observer(Box::new(flag.clone()));

        app.log.append(Turn::user("hi")).unwrap();
        assert!(flag.take());
        assert!(!flag.take());
    }

    #[test]
    fn drain_coalesces_consecutive_fragments() {
        let mut app = create_test_app();
        let recorder = RecordingObserver::install(&mut app);
        let params = app.exchange().submit("hi").unwrap();
        let id = params.exchange_id;
        let baseline = recorder.event_count();

        let (transport, mut rx) = TransportService::new();
        transport.send_for_test(ExchangeEvent::Fragment("Hel".into()), id);
        transport.send_for_test(ExchangeEvent::Fragment("lo, ".into()), id);
        transport.send_for_test(ExchangeEvent::Fragment("world".into()), id);
        transport.send_for_test(ExchangeEvent::Closed, id);

        assert!(drain_exchange_events(&mut app, &mut rx));

        let last = app.log.last().unwrap();
        assert_eq!(last.content, "Hello, world");
        assert_eq!(last.status, TurnStatus::Committed);
        // One coalesced fragment application plus the closing transition.
        assert_eq!(recorder.event_count(), baseline + 2);
    }

    #[test]
    fn drain_does_not_coalesce_across_exchange_ids() {
        let mut app = create_test_app();
        let params = app.exchange().submit("hi").unwrap();
        let id = params.exchange_id;

        let (transport, mut rx) = TransportService::new();
        transport.send_for_test(ExchangeEvent::Fragment("stale".into()), id + 1);
        transport.send_for_test(ExchangeEvent::Fragment("fresh".into()), id);
        transport.send_for_test(ExchangeEvent::Closed, id);

        drain_exchange_events(&mut app, &mut rx);

        // The stale run is applied separately and dropped by the controller.
        assert_eq!(app.log.last().unwrap().content, "fresh");
        assert_eq!(app.log.last().unwrap().status, TurnStatus::Committed);
    }

    #[test]
    fn drain_with_an_empty_channel_reports_nothing() {
        let mut app = create_test_app();
        let (_transport, mut rx) = TransportService::new();
        assert!(!drain_exchange_events(&mut app, &mut rx));
    }

    #[test]
    fn escape_requests_cancellation() {
        let mut app = create_test_app();
        let (transport, _rx) = TransportService::new();
        let params = app.exchange().submit("hi").unwrap();

        handle_key(&mut app, &transport, key(KeyCode::Esc), 24);
        assert!(params.cancel_token.is_cancelled());
    }

    #[test]
    fn ctrl_l_resets_the_conversation() {
        let mut app = create_test_app();
        let (transport, _rx) = TransportService::new();
        let params = app.exchange().submit("hi").unwrap();
        app.exchange()
            .apply_event(ExchangeEvent::Fragment("partial".into()), params.exchange_id);

        handle_key(&mut app, &transport, ctrl('l'), 24);

        assert!(params.cancel_token.is_cancelled());
        assert!(app.log.is_empty());
        assert!(app.ui.auto_scroll);
    }

    #[test]
    fn ctrl_c_cancels_and_quits() {
        let mut app = create_test_app();
        let (transport, _rx) = TransportService::new();
        let params = app.exchange().submit("hi").unwrap();

        let control = handle_key(&mut app, &transport, ctrl('c'), 24);
        assert!(matches!(control, LoopControl::Quit));
        assert!(params.cancel_token.is_cancelled());
    }

    #[test]
    fn submit_while_streaming_keeps_the_draft_and_sets_a_status() {
        let mut app = create_test_app();
        let (transport, _rx) = TransportService::new();
        app.exchange().submit("first").unwrap();

        app.ui.insert_input("second");
        submit_input(&mut app, &transport);

        assert_eq!(app.ui.input_text(), "second");
        assert!(app.ui.status.is_some());
        assert_eq!(app.log.len(), 2);
    }

    #[test]
    fn stream_end_clears_the_streaming_notice() {
        let mut app = create_test_app();
        let (transport, _rx) = TransportService::new();
        let params = app.exchange().submit("first").unwrap();

        app.ui.insert_input("second");
        submit_input(&mut app, &transport);
        assert!(app.ui.status.is_some());

        app.exchange()
            .apply_event(ExchangeEvent::Closed, params.exchange_id);

        // The committed stream takes the notice with it; the kept draft can
        // now be sent with a plain Enter.
        assert_eq!(app.ui.status, None);
        assert!(!app.ui.is_streaming);
        assert!(!app.stream_in_flight());
        assert_eq!(app.ui.input_text(), "second");
    }

    #[test]
    fn blank_submit_is_ignored() {
        let mut app = create_test_app();
        let (transport, _rx) = TransportService::new();

        app.ui.insert_input("   ");
        submit_input(&mut app, &transport);

        assert!(app.log.is_empty());
        assert_eq!(app.ui.input_text(), "   ");
    }

    #[tokio::test]
    async fn submit_spawns_the_exchange_and_clears_the_input() {
        let mut app = create_test_app();
        let (transport, _rx) = TransportService::new();

        app.ui.insert_input("hello");
        submit_input(&mut app, &transport);

        assert_eq!(app.ui.input_text(), "");
        assert!(app.stream_in_flight());
        assert_eq!(app.log.len(), 2);
        assert_eq!(app.log.turns()[0].content, "hello");
        assert_eq!(app.log.turns()[1].status, TurnStatus::Pending);
    }

    #[test]
    fn scrolling_up_unsticks_auto_scroll() {
        let mut app = create_test_app();
        app.ui.scroll_offset = 10;

        scroll_up(&mut app, 3);
        assert_eq!(app.ui.scroll_offset, 7);
        assert!(!app.ui.auto_scroll);

        scroll_down(&mut app, 5);
        assert_eq!(app.ui.scroll_offset, 12);
    }

    #[test]
    fn typed_characters_reach_the_input_widget() {
        let mut app = create_test_app();
        let (transport, _rx) = TransportService::new();

        handle_key(&mut app, &transport, key(KeyCode::Char('h')), 24);
        handle_key(&mut app, &transport, key(KeyCode::Char('i')), 24);
        assert_eq!(app.ui.input_text(), "hi");
    }

    #[test]
    fn alt_enter_inserts_a_newline() {
        let mut app = create_test_app();
        let (transport, _rx) = TransportService::new();

        handle_key(&mut app, &transport, key(KeyCode::Char('a')), 24);
        handle_key(
            &mut app,
            &transport,
            KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT),
            24,
        );
        handle_key(&mut app, &transport, key(KeyCode::Char('b')), 24);
        assert_eq!(app.ui.input_text(), "a\nb");
    }
}
