use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Context, Line as CanvasLine, Rectangle},
        Block, Widget,
    },
};

use crate::analysis::IndicatorFrame;

use super::padded_bounds;

pub const RISING: Color = Color::Green;
pub const FALLING: Color = Color::Red;
pub const MA_COLOR: Color = Color::Yellow;
pub const UPPER_BAND_COLOR: Color = Color::LightGreen;
pub const LOWER_BAND_COLOR: Color = Color::LightRed;

/// Half the drawn body width, in candle slots.
const BODY_HALF_WIDTH: f64 = 0.3;

/// Candlestick chart of a frame's OHLC rows, optionally overlaid with the
/// moving average and both Bollinger bands.
pub struct CandlestickChart<'a> {
    frame: &'a IndicatorFrame,
    overlays: bool,
}

impl<'a> CandlestickChart<'a> {
    /// Plain candles.
    pub fn new(frame: &'a IndicatorFrame) -> Self {
        Self {
            frame,
            overlays: false,
        }
    }

    /// Candles plus moving average and bands.
    pub fn with_overlays(frame: &'a IndicatorFrame) -> Self {
        Self {
            frame,
            overlays: true,
        }
    }

    fn title(&self) -> Line<'static> {
        let symbol = self.frame.symbol();
        if !self.overlays {
            return Line::from(Span::styled(
                format!(" {symbol} Stock Price "),
                Style::default().add_modifier(Modifier::BOLD),
            ));
        }
        let p = &self.frame.params;
        Line::from(vec![
            Span::styled(
                format!(" {symbol} Moving Average and Bollinger Bands "),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("MA({}) ", p.ma_window), Style::default().fg(MA_COLOR)),
            Span::styled(
                format!("Upper({}, {}) ", p.bollinger_window, p.bollinger_num_std),
                Style::default().fg(UPPER_BAND_COLOR),
            ),
            Span::styled(
                format!("Lower({}, {}) ", p.bollinger_window, p.bollinger_num_std),
                Style::default().fg(LOWER_BAND_COLOR),
            ),
        ])
    }

    /// Price axis range: candles only, or candles plus every overlay value.
    fn y_bounds(&self) -> Option<(f64, f64)> {
        let (lo, hi) = if self.overlays {
            self.frame.price_bounds()?
        } else {
            self.frame.series.price_range()?
        };
        Some(padded_bounds(lo, hi))
    }

    fn paint(&self, ctx: &mut Context<'_>, y_lo: f64, y_hi: f64) {
        for (i, candle) in self.frame.series.candles().iter().enumerate() {
            let x = i as f64;
            let color = if candle.is_rising() { RISING } else { FALLING };

            ctx.draw(&CanvasLine {
                x1: x,
                y1: candle.low,
                x2: x,
                y2: candle.high,
                color,
            });
            ctx.draw(&Rectangle {
                x: x - BODY_HALF_WIDTH,
                y: candle.open.min(candle.close),
                width: BODY_HALF_WIDTH * 2.0,
                height: (candle.close - candle.open).abs(),
                color,
            });
        }

        if self.overlays {
            ctx.layer();
            draw_polyline(ctx, &self.frame.moving_average, MA_COLOR);
            draw_polyline(ctx, &self.frame.bands.upper, UPPER_BAND_COLOR);
            draw_polyline(ctx, &self.frame.bands.lower, LOWER_BAND_COLOR);
        }

        let label = Style::default().fg(Color::DarkGray);
        ctx.print(0.0, y_hi, Span::styled(format!("{y_hi:.2}"), label));
        ctx.print(0.0, y_lo, Span::styled(format!("{y_lo:.2}"), label));
    }
}

impl Widget for CandlestickChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut block = Block::bordered().title(self.title());
        if let (Some(first), Some(last)) = (self.frame.series.first_date(), self.frame.series.last_date()) {
            block = block.title_bottom(format!(" {first} .. {last} "));
        }

        let Some((y_lo, y_hi)) = self.y_bounds() else {
            block.render(area, buf);
            return;
        };
        let n = self.frame.len() as f64;

        Canvas::default()
            .block(block)
            .marker(Marker::Braille)
            .x_bounds([-0.5, n - 0.5])
            .y_bounds([y_lo, y_hi])
            .paint(|ctx| self.paint(ctx, y_lo, y_hi))
            .render(area, buf);
    }
}

/// Join consecutive defined points; undefined rows leave a gap.
fn draw_polyline(ctx: &mut Context<'_>, values: &[Option<f64>], color: Color) {
    for (i, pair) in values.windows(2).enumerate() {
        if let [Some(a), Some(b)] = pair {
            ctx.draw(&CanvasLine {
                x1: i as f64,
                y1: *a,
                x2: (i + 1) as f64,
                y2: *b,
                color,
            });
        }
    }
}
