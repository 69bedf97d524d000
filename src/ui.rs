use crate::app::App;
use crate::audio::AudioEngine;
use crate::core::PlaybackController;
use crate::model::Track;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use std::time::Duration;

const APP_TITLE_WITH_VERSION: &str = concat!("playdeck v", env!("CARGO_PKG_VERSION"), "  ");

#[derive(Clone, Copy)]
struct Palette {
    bg: Color,
    panel_bg: Color,
    panel_alt_bg: Color,
    border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    alert: Color,
    queued: Color,
    removing: Color,
    selected_bg: Color,
}

const PALETTE: Palette = Palette {
    bg: Color::Rgb(10, 15, 24),
    panel_bg: Color::Rgb(19, 29, 43),
    panel_alt_bg: Color::Rgb(24, 38, 58),
    border: Color::Rgb(69, 121, 176),
    text: Color::Rgb(214, 228, 248),
    muted: Color::Rgb(149, 173, 204),
    accent: Color::Rgb(100, 203, 184),
    alert: Color::Rgb(249, 174, 88),
    queued: Color::Rgb(156, 186, 255),
    removing: Color::Rgb(255, 122, 165),
    selected_bg: Color::Rgb(34, 55, 82),
};

fn vertical_layout(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(area)
}

fn body_layout(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(66), Constraint::Percentage(34)])
        .split(area)
}

pub fn library_rect(area: Rect) -> Rect {
    body_layout(vertical_layout(area)[1])[0]
}

pub fn draw(frame: &mut Frame, core: &PlaybackController, audio: &dyn AudioEngine, app: &App) {
    let colors = PALETTE;
    frame.render_widget(
        Block::default().style(Style::default().bg(colors.bg)),
        frame.area(),
    );

    let vertical = vertical_layout(frame.area());
    let body = body_layout(vertical[1]);

    frame.render_widget(header(core, app, &colors), vertical[0]);

    let items: Vec<ListItem> = core
        .tracks()
        .iter()
        .map(|track| track_item(core, track, &colors))
        .collect();

    let mut state = ListState::default();
    state.select((!core.is_empty()).then_some(app.selected));

    let list = List::new(items)
        .block(panel_block(
            &format!("Library / {}", app.library_dir.display()),
            colors.panel_bg,
            colors.text,
            colors.border,
        ))
        .highlight_style(
            Style::default()
                .bg(colors.selected_bg)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("-> ");
    frame.render_stateful_widget(list, body[0], &mut state);

    frame.render_widget(info_panel(core, app, &colors), body[1]);

    let timeline = Paragraph::new(Span::styled(
        timeline_line(audio, 26, 14),
        Style::default().fg(colors.text),
    ))
    .block(panel_block(
        "Timeline",
        colors.panel_bg,
        colors.text,
        colors.border,
    ))
    .wrap(Wrap { trim: true });
    frame.render_widget(timeline, vertical[2]);

    frame.render_widget(footer(core, app, &colors), vertical[3]);
}

fn header<'a>(core: &PlaybackController, app: &App, colors: &Palette) -> Paragraph<'a> {
    let mut spans = vec![
        Span::styled(
            APP_TITLE_WITH_VERSION,
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("Tracks {}", core.len()),
            Style::default().fg(colors.text),
        ),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(
            if core.is_shuffling() {
                "Shuffle on"
            } else {
                "Shuffle off"
            },
            Style::default().fg(colors.alert),
        ),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(
            format!("Vol {}%", core.volume()),
            Style::default().fg(colors.text),
        ),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(core.phase().label(), Style::default().fg(colors.accent)),
    ];
    if !app.downloads.is_empty() {
        spans.push(Span::styled("  |  ", Style::default().fg(colors.muted)));
        spans.push(Span::styled(
            format!("Downloading {}", app.downloads.len()),
            Style::default().fg(colors.queued),
        ));
    }

    Paragraph::new(Line::from(spans)).block(panel_block(
        "Status",
        colors.panel_bg,
        colors.text,
        colors.border,
    ))
}

fn track_item<'a>(core: &PlaybackController, track: &'a Track, colors: &Palette) -> ListItem<'a> {
    let marker = if core.current_id() == Some(track.id) {
        Span::styled("  > ", Style::default().fg(colors.accent))
    } else if let Some(position) = core.queue_position(track.id) {
        Span::styled(
            format!("{:>3} ", position + 1),
            Style::default().fg(colors.queued),
        )
    } else {
        Span::styled("    ", Style::default().fg(colors.muted))
    };

    let name_style = if core.is_pending_removal(track.id) {
        Style::default()
            .fg(colors.removing)
            .add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default().fg(colors.text)
    };

    ListItem::new(Line::from(vec![
        marker,
        Span::styled(track.name.as_str(), name_style),
    ]))
}

fn info_panel<'a>(core: &'a PlaybackController, app: &App, colors: &Palette) -> Paragraph<'a> {
    let now_playing = core
        .current_track()
        .map_or("-", |track| track.name.as_str());
    let selected = core
        .tracks()
        .get(app.selected)
        .map_or("-", |track| track.name.as_str());
    let queued = core.queued().count();

    let lines = vec![
        Line::from(vec![
            Span::styled(
                "Now",
                Style::default()
                    .fg(colors.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  {now_playing}"), Style::default().fg(colors.text)),
        ]),
        Line::from(Span::styled(
            format!("Queue   {queued}"),
            Style::default().fg(colors.alert),
        )),
        Line::from(Span::styled(
            format!(
                "History {}/{}",
                core.history_len(),
                core.history().capacity()
            ),
            Style::default().fg(colors.muted),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled(
                "Selected",
                Style::default()
                    .fg(colors.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  {selected}"), Style::default().fg(colors.text)),
        ]),
    ];

    Paragraph::new(lines)
        .block(panel_block(
            "Now Playing",
            colors.panel_alt_bg,
            colors.text,
            colors.border,
        ))
        .wrap(Wrap { trim: true })
}

fn footer<'a>(core: &'a PlaybackController, app: &App, colors: &Palette) -> Paragraph<'a> {
    let line = if app.command_mode {
        Line::from(vec![
            Span::styled(":", Style::default().fg(colors.accent)),
            Span::styled(app.command_buffer.clone(), Style::default().fg(colors.text)),
        ])
    } else {
        Line::from(vec![
            Span::styled(
                "Keys: Enter play, Space pause, n/b next/prev, s shuffle, q queue, d remove, : commands, Ctrl+C quit",
                Style::default().fg(colors.muted),
            ),
            Span::styled("  |  ", Style::default().fg(colors.muted)),
            Span::styled(core.status.as_str(), Style::default().fg(colors.text)),
        ])
    };

    Paragraph::new(line).block(panel_block(
        "Message",
        colors.panel_bg,
        colors.text,
        colors.border,
    ))
}

fn panel_block(title: &str, bg: Color, text: Color, border: Color) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(text).add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(bg))
}

fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{minutes:02}:{seconds:02}")
}

fn progress_bar(ratio: Option<f64>, width: usize) -> String {
    let clamped = ratio.unwrap_or(0.0).clamp(0.0, 1.0);
    let filled = (clamped * width as f64).round() as usize;
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    bar.push_str(&"#".repeat(filled));
    bar.push_str(&"-".repeat(width.saturating_sub(filled)));
    bar.push(']');
    bar
}

fn timeline_line(
    audio: &dyn AudioEngine,
    timeline_bar_width: usize,
    volume_bar_width: usize,
) -> String {
    let elapsed = audio.position().unwrap_or(Duration::from_secs(0));
    let total = audio.duration();
    let ratio = total.and_then(|duration| {
        let total_secs = duration.as_secs_f64();
        (total_secs > 0.0).then_some((elapsed.as_secs_f64() / total_secs).clamp(0.0, 1.0))
    });

    let volume_percent = (audio.volume() * 100.0).round() as u16;
    let volume_ratio = f64::from(audio.volume().clamp(0.0, 1.0));

    format!(
        "{} / {} {}  |  Vol {} {:>3}%  +/- adjust  Left/Right seek",
        format_duration(elapsed),
        total
            .map(format_duration)
            .unwrap_or_else(|| String::from("--:--")),
        progress_bar(ratio, timeline_bar_width),
        progress_bar(Some(volume_ratio), volume_bar_width),
        volume_percent
    )
}
