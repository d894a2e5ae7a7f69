// =============================================================================
// Dashboard Rendering — three chart panes plus a status line
// =============================================================================
//
// Layout (top to bottom):
//   status   : ticker, range, last close, RSI zone, band width, refresh timer
//   pane (a) : candlestick chart
//   pane (b) : candles + moving average + Bollinger bands
//   pane (c) : RSI with 70 / 30 reference lines
//   help     : key bindings
//
// A `ChartView` is rebuilt from each published DashboardState; nothing is
// kept from the previous tick.
// =============================================================================

pub mod candles;
pub mod rsi;

use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, Utc};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph, Wrap},
    Frame,
};

use crate::analysis::IndicatorFrame;
use crate::config::AppConfig;
use crate::indicators::RsiZone;
use crate::refresh::{next_refresh_in, DashboardState};

pub use candles::CandlestickChart;
pub use rsi::RsiChart;

/// Everything needed to draw one dashboard frame.
#[derive(Debug, Clone)]
pub struct ChartView {
    symbol: String,
    start: NaiveDate,
    end: NaiveDate,
    refresh_interval: Duration,
    state: DashboardState,
}

impl ChartView {
    pub fn new(config: &AppConfig, state: DashboardState) -> Self {
        Self {
            symbol: config.symbol.clone(),
            start: config.start_date,
            end: config.end_date,
            refresh_interval: config.refresh_interval(),
            state,
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }
}

/// Draw the whole dashboard for `view`.
pub fn draw(f: &mut Frame, view: &ChartView, now: DateTime<Utc>) {
    let area = f.area();

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    f.render_widget(Paragraph::new(status_line(view, now)), vertical[0]);

    match &view.state {
        DashboardState::Ready { frame, .. } => draw_panes(f, frame, vertical[1]),
        DashboardState::Loading => {
            let text = format!(
                "Fetching {} {} ..= {} ...",
                view.symbol, view.start, view.end
            );
            f.render_widget(
                Paragraph::new(text).block(Block::bordered().title(" Loading ")),
                vertical[1],
            );
        }
        DashboardState::Failed { message, at, .. } => {
            let lines = vec![
                Line::from(Span::styled(
                    format!("Refresh at {} failed:", at.with_timezone(&Local).format("%H:%M:%S")),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Line::from(message.as_str()),
                Line::from(""),
                Line::from(Span::styled(
                    "Charts are cleared until the next successful refresh.",
                    Style::default().fg(Color::DarkGray),
                )),
            ];
            f.render_widget(
                Paragraph::new(lines)
                    .wrap(Wrap { trim: false })
                    .block(Block::bordered().title(" Error ")),
                vertical[1],
            );
        }
    }

    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(" q ", Style::default().add_modifier(Modifier::REVERSED)),
            Span::raw(" quit  "),
            Span::styled(" r ", Style::default().add_modifier(Modifier::REVERSED)),
            Span::raw(" refresh now"),
        ])),
        vertical[2],
    );
}

fn draw_panes(f: &mut Frame, frame: &IndicatorFrame, area: Rect) {
    let panes = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Percentage(35),
            Constraint::Percentage(30),
        ])
        .split(area);

    f.render_widget(CandlestickChart::new(frame), panes[0]);
    f.render_widget(CandlestickChart::with_overlays(frame), panes[1]);
    f.render_widget(RsiChart::new(frame), panes[2]);
}

fn status_line(view: &ChartView, now: DateTime<Utc>) -> Line<'static> {
    let mut spans = vec![
        Span::styled(
            format!(" {} ", view.symbol),
            Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED),
        ),
        Span::raw(format!(" {} ..= {} ", view.start, view.end)),
    ];

    if let Some(frame) = view.state.frame() {
        if let Some(last) = frame.series.candles().last() {
            spans.push(Span::raw(format!("| close {:.2} vol {:.0} ", last.close, last.volume)));
        }
        if let Some((value, zone)) = frame.last_rsi() {
            spans.push(Span::raw("| RSI "));
            spans.push(Span::styled(
                format!("{value:.1} {zone} "),
                Style::default().fg(zone_color(zone)),
            ));
        }
        if let Some(bb) = frame.last_bollinger() {
            spans.push(Span::raw(format!("| BBW {:.2}% ", bb.width)));
        }
    }

    match (view.state.updated_at(), view.state.tick_started()) {
        (Some(at), Some(tick_started)) => {
            let next = next_refresh_in(tick_started, view.refresh_interval, now);
            spans.push(Span::styled(
                format!(
                    "| updated {} | next in {}s",
                    at.with_timezone(&Local).format("%H:%M:%S"),
                    next.as_secs()
                ),
                Style::default().fg(Color::DarkGray),
            ));
        }
        _ => spans.push(Span::styled("| waiting for first refresh", Style::default().fg(Color::DarkGray))),
    }

    Line::from(spans)
}

fn zone_color(zone: RsiZone) -> Color {
    match zone {
        RsiZone::Overbought => Color::Red,
        RsiZone::Oversold => Color::Green,
        RsiZone::Neutral => Color::Gray,
    }
}

/// Pad a `(lo, hi)` range by 5% so extremes are not drawn on the border.
/// A degenerate range is widened by one unit each way.
pub(crate) fn padded_bounds(lo: f64, hi: f64) -> (f64, f64) {
    let pad = (hi - lo) * 0.05;
    if pad > 0.0 {
        (lo - pad, hi + pad)
    } else {
        (lo - 1.0, hi + 1.0)
    }
}
