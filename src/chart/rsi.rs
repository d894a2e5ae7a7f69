use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::Span,
    widgets::{Axis, Block, Chart, Dataset, GraphType, Widget},
};

use crate::analysis::IndicatorFrame;
use crate::indicators::rsi::{OVERBOUGHT, OVERSOLD};

pub const RSI_COLOR: Color = Color::Magenta;
pub const OVERBOUGHT_COLOR: Color = Color::Red;
pub const OVERSOLD_COLOR: Color = Color::Green;

/// Line chart of the RSI column with fixed 70 / 30 reference lines.
pub struct RsiChart<'a> {
    frame: &'a IndicatorFrame,
}

impl<'a> RsiChart<'a> {
    pub fn new(frame: &'a IndicatorFrame) -> Self {
        Self { frame }
    }
}

impl Widget for RsiChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let n = self.frame.len();
        let x_max = n.saturating_sub(1).max(1) as f64;

        let points = rsi_points(&self.frame.rsi);
        let overbought = reference_points(OVERBOUGHT, n);
        let oversold = reference_points(OVERSOLD, n);

        let datasets = vec![
            Dataset::default()
                .name("RSI")
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(RSI_COLOR))
                .data(&points),
            Dataset::default()
                .name(format!("overbought {OVERBOUGHT}"))
                .marker(Marker::Dot)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(OVERBOUGHT_COLOR))
                .data(&overbought),
            Dataset::default()
                .name(format!("oversold {OVERSOLD}"))
                .marker(Marker::Dot)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(OVERSOLD_COLOR))
                .data(&oversold),
        ];

        let series = &self.frame.series;
        let date_label = |i: usize| {
            series
                .candles()
                .get(i)
                .map(|c| c.date.to_string())
                .unwrap_or_default()
        };
        let x_axis = Axis::default()
            .style(Style::default().fg(Color::DarkGray))
            .bounds([0.0, x_max])
            .labels(vec![
                Span::raw(date_label(0)),
                Span::raw(date_label(n / 2)),
                Span::raw(date_label(n.saturating_sub(1))),
            ]);

        // Axis labels are spread evenly over the axis, so only evenly spaced
        // values go there; the 70 / 30 levels are named in the legend.
        let y_axis = Axis::default()
            .style(Style::default().fg(Color::DarkGray))
            .bounds([0.0, 100.0])
            .labels(vec![Span::raw("0"), Span::raw("50"), Span::raw("100")]);

        let title = Span::styled(
            format!(" {} RSI ({}) ", self.frame.symbol(), self.frame.params.rsi_window),
            Style::default().add_modifier(Modifier::BOLD),
        );

        Chart::new(datasets)
            .block(Block::bordered().title(title))
            .x_axis(x_axis)
            .y_axis(y_axis)
            .hidden_legend_constraints((Constraint::Ratio(1, 2), Constraint::Ratio(1, 1)))
            .render(area, buf);
    }
}

/// `(row, rsi)` for every defined row.
fn rsi_points(rsi: &[Option<f64>]) -> Vec<(f64, f64)> {
    rsi.iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i as f64, v)))
        .collect()
}

/// Horizontal line at `level`, every other row so it reads as dashed.
fn reference_points(level: f64, n: usize) -> Vec<(f64, f64)> {
    (0..n.max(2)).step_by(2).map(|i| (i as f64, level)).collect()
}
