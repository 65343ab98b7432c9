//! Frame rendering: the transcript pane and the input box.
//!
//! The transcript is a plain-text view over the conversation log. Each turn
//! becomes a run of styled lines; the trailing turn additionally shows its
//! lifecycle (a placeholder ellipsis before the first fragment, an
//! `[interrupted]` marker after a cancel, the error line after a failure).

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::core::app::App;
use crate::core::log::{Turn, TurnRole, TurnStatus};

/// Tallest the input box grows before it scrolls internally.
const MAX_INPUT_LINES: u16 = 6;

pub fn ui(f: &mut Frame, app: &mut App) {
    let input_area_height = input_area_height(app);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(input_area_height + 2), // +2 for borders
        ])
        .split(f.area());

    let lines = build_display_lines(app.log.turns());

    // Scroll bookkeeping. The height estimate assumes hard wrapping; word
    // wrap can come out a line or two longer, which the clamp absorbs.
    let available_height = chunks[0].height.saturating_sub(1); // title row
    let total_lines = wrapped_line_count(&lines, chunks[0].width);
    let max_offset = total_lines.saturating_sub(available_height);
    if app.ui.auto_scroll {
        app.ui.scroll_offset = max_offset;
    } else {
        app.ui.scroll_offset = app.ui.scroll_offset.min(max_offset);
        if app.ui.scroll_offset >= max_offset {
            // Scrolled back to the bottom by hand; stick there again.
            app.ui.auto_scroll = true;
        }
    }

    let title = format!(
        "Confab v{} - {} @ {}",
        env!("CARGO_PKG_VERSION"),
        app.session.model,
        app.session.endpoint
    );

    let transcript = Paragraph::new(lines)
        .block(Block::default().title(title))
        .wrap(Wrap { trim: true })
        .scroll((app.ui.scroll_offset, 0));

    f.render_widget(transcript, chunks[0]);

    let input_title = input_title(app);
    let textarea = app.ui.textarea_mut();
    textarea.set_block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Reset))
            .title(input_title),
    );
    textarea.set_cursor_line_style(Style::default());
    f.render_widget(&*textarea, chunks[1]);
}

fn input_area_height(app: &App) -> u16 {
    (app.ui.textarea().lines().len() as u16).clamp(1, MAX_INPUT_LINES)
}

fn input_title(app: &App) -> String {
    if app.ui.is_streaming {
        // Pulse at two cycles per second: ○ → ◐ → ● and back.
        let elapsed = app.ui.pulse_start.elapsed().as_millis() as f32 / 1000.0;
        let pulse_phase = (elapsed * 2.0) % 2.0;
        let pulse_intensity = if pulse_phase < 1.0 {
            pulse_phase
        } else {
            2.0 - pulse_phase
        };
        let symbol = if pulse_intensity < 0.33 {
            "○"
        } else if pulse_intensity < 0.66 {
            "◐"
        } else {
            "●"
        };
        format!("{symbol} Streaming... (Esc to interrupt, Ctrl+C to quit)")
    } else if let Some(status) = &app.ui.status {
        status.clone()
    } else {
        "Type your message (Enter to send, Alt+Enter for new line, Ctrl+C to quit)".to_string()
    }
}

/// Builds the transcript lines for a slice of turns.
pub fn build_display_lines(turns: &[Turn]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for turn in turns {
        match turn.role {
            TurnRole::User => push_user_lines(&mut lines, turn),
            TurnRole::Assistant => push_assistant_lines(&mut lines, turn),
        }
        lines.push(Line::from(""));
    }

    lines
}

fn push_user_lines(lines: &mut Vec<Line<'static>>, turn: &Turn) {
    let style = Style::default().fg(Color::Cyan);
    for (i, content_line) in turn.content.lines().enumerate() {
        if i == 0 {
            lines.push(Line::from(vec![
                Span::styled("You: ", style.add_modifier(Modifier::BOLD)),
                Span::styled(content_line.to_owned(), style),
            ]));
        } else {
            lines.push(Line::from(Span::styled(content_line.to_owned(), style)));
        }
    }
}

fn push_assistant_lines(lines: &mut Vec<Line<'static>>, turn: &Turn) {
    if turn.status == TurnStatus::Pending {
        lines.push(Line::from(Span::styled(
            "…",
            Style::default().fg(Color::DarkGray),
        )));
        return;
    }

    let content_lines: Vec<&str> = turn.content.lines().collect();
    for (i, content_line) in content_lines.iter().enumerate() {
        if content_line.trim().is_empty() {
            lines.push(Line::from(""));
        } else if turn.status == TurnStatus::Errored && i == content_lines.len() - 1 {
            // The failure description is always the final line of an errored
            // turn; everything before it is preserved partial output.
            lines.push(Line::from(Span::styled(
                (*content_line).to_owned(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                (*content_line).to_owned(),
                Style::default().fg(Color::White),
            )));
        }
    }

    if turn.status == TurnStatus::Aborted {
        lines.push(Line::from(Span::styled(
            "[interrupted]",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
    }
}

fn wrapped_line_count(lines: &[Line], width: u16) -> u16 {
    if width == 0 {
        return lines.len().min(u16::MAX as usize) as u16;
    }
    let width = width as usize;
    let total: usize = lines
        .iter()
        .map(|line| {
            let w = line.width();
            if w == 0 {
                1
            } else {
                w.div_ceil(width)
            }
        })
        .sum();
    total.min(u16::MAX as usize) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log::Turn;

    fn rendered(turns: &[Turn]) -> Vec<String> {
        build_display_lines(turns)
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn user_turns_get_a_prefix_and_a_spacer() {
        let turns = vec![Turn::user("hello")];
        assert_eq!(rendered(&turns), vec!["You: hello", ""]);
    }

    #[test]
    fn multiline_user_turns_prefix_only_the_first_line() {
        let turns = vec![Turn::user("first\nsecond")];
        assert_eq!(rendered(&turns), vec!["You: first", "second", ""]);
    }

    #[test]
    fn pending_turns_show_an_ellipsis() {
        let turns = vec![Turn::user("hi"), Turn::assistant_placeholder()];
        assert_eq!(rendered(&turns), vec!["You: hi", "", "…", ""]);
    }

    #[test]
    fn streaming_content_replaces_the_ellipsis() {
        let mut placeholder = Turn::assistant_placeholder();
        placeholder.content.push_str("partial answer");
        placeholder.status = TurnStatus::Streaming;

        assert_eq!(rendered(&[placeholder]), vec!["partial answer", ""]);
    }

    #[test]
    fn aborted_turns_end_with_the_interrupted_marker() {
        let mut turn = Turn::assistant_placeholder();
        turn.content.push_str("cut off");
        turn.status = TurnStatus::Aborted;

        assert_eq!(rendered(&[turn]), vec!["cut off", "[interrupted]", ""]);
    }

    #[test]
    fn errored_turns_color_the_final_line_red() {
        let mut turn = Turn::assistant_placeholder();
        turn.content
            .push_str("partial\n\nError: request failed: 503 Service Unavailable");
        turn.status = TurnStatus::Errored;

        let lines = build_display_lines(&[turn]);
        let error_line = &lines[lines.len() - 2];
        assert_eq!(
            error_line.spans[0].style.fg,
            Some(Color::Red),
            "error line should be styled red"
        );
        assert_eq!(
            error_line.spans[0].content,
            "Error: request failed: 503 Service Unavailable"
        );
    }

    #[test]
    fn committed_empty_turns_render_as_spacing_only() {
        let mut turn = Turn::assistant_placeholder();
        turn.status = TurnStatus::Committed;
        assert_eq!(rendered(&[turn]), vec![""]);
    }

    #[test]
    fn wrapped_count_accounts_for_width() {
        let lines = vec![Line::from("a".repeat(100)), Line::from("")];
        assert_eq!(wrapped_line_count(&lines, 40), 4); // ceil(100/40) + 1
        assert_eq!(wrapped_line_count(&lines, 0), 2);
    }
}
