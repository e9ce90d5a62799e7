use crossterm::{
    cursor,
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use tokio::sync::mpsc;
use tracing::debug;

use crate::app::{App, AppEvent, Frontend};
use crate::chart::{ChartBuffer, ChartRenderer, ChartSpec};
use crate::status::Severity;

/// 折线图渲染器，保存最近一次更新的数据点
#[derive(Debug, Default)]
pub struct TerminalChart {
    points: Vec<(f64, f64)>,
    first_label: String,
    last_label: String,
    y_max: f64,
}

impl TerminalChart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Y轴从0开始，顶部在峰值之上留出余量
    pub fn y_bounds(&self) -> [f64; 2] {
        [0.0, (self.y_max * 1.2).max(100.0)]
    }

    pub fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.points.len().max(2) - 1) as f64]
    }
}

impl ChartRenderer for TerminalChart {
    fn init(&mut self, _spec: &ChartSpec) {
        self.points.clear();
        self.y_max = 0.0;
    }

    fn update(&mut self, buffer: &ChartBuffer) {
        self.points = buffer
            .values()
            .enumerate()
            .map(|(i, v)| (i as f64, v as f64))
            .collect();
        self.y_max = buffer.max_value().unwrap_or(0) as f64;
        self.first_label = buffer.labels().next().unwrap_or_default().to_string();
        self.last_label = buffer.labels().last().unwrap_or_default().to_string();
    }
}

fn severity_color(severity: Option<Severity>) -> Color {
    match severity {
        Some(Severity::Good) => Color::Green,
        Some(Severity::Fair) => Color::Yellow,
        Some(Severity::Poor) | Some(Severity::Offline) => Color::Red,
        None => Color::Gray,
    }
}

/// 全屏仪表盘
pub struct Dashboard<B: Backend> {
    terminal: Terminal<B>,
}

impl Dashboard<CrosstermBackend<Stdout>> {
    /// 进入原始模式并切换到备用屏幕
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }

    /// 恢复终端
    pub fn restore(&mut self) -> io::Result<()> {
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;
        terminal::disable_raw_mode()
    }
}

#[cfg(test)]
impl<B: Backend> Dashboard<B> {
    pub fn with_backend(backend: B) -> io::Result<Self> {
        Ok(Self {
            terminal: Terminal::new(backend)?,
        })
    }

    pub fn backend(&self) -> &B {
        self.terminal.backend()
    }
}

impl<B: Backend> Frontend<TerminalChart> for Dashboard<B> {
    fn render(&mut self, app: &App<TerminalChart>, _event: &AppEvent) -> anyhow::Result<()> {
        self.terminal.draw(|frame| draw(frame, app))?;
        Ok(())
    }
}

fn draw(frame: &mut Frame, app: &App<TerminalChart>) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(6),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let title = Span::styled(
        format!(" Netpulse  {} ", app.host()),
        Style::default().fg(Color::Black).bg(Color::White).add_modifier(Modifier::BOLD),
    );
    frame.render_widget(Paragraph::new(Line::from(title)), rows[0]);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    draw_ping_panel(frame, app, panels[0]);
    draw_speed_panel(frame, app, panels[1]);
    draw_chart(frame, app, rows[2]);

    let stats = app.stats();
    let footer = format!(
        "probes: {} | ok: {} | failed: {:.1}% | samples: {} | keys: [s] speed test [q] quit",
        stats.sent,
        stats.received,
        stats.loss_percent(),
        app.chart().buffer().len()
    );
    frame.render_widget(Paragraph::new(footer), rows[3]);
}

fn draw_ping_panel(frame: &mut Frame, app: &App<TerminalChart>, area: Rect) {
    let display = app.display();
    let color = severity_color(display.severity);
    let lines = vec![
        Line::from(vec![
            Span::raw("Latency:   "),
            Span::styled(display.ping_text.clone(), Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(vec![
            Span::raw("Status:    "),
            Span::styled(
                format!("● {}", display.ping_indicator),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(
            display.severity.map(|s| s.as_str()).unwrap_or("-"),
            Style::default().fg(color),
        )),
    ];
    let block = Block::default().borders(Borders::ALL).title(" Ping ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_speed_panel(frame: &mut Frame, app: &App<TerminalChart>, area: Rect) {
    let display = app.display();
    let trigger = if display.trigger_enabled {
        Span::styled("[s] Start speed test", Style::default().fg(Color::Cyan))
    } else {
        Span::styled("[s] Start speed test", Style::default().fg(Color::DarkGray))
    };
    let mut lines = vec![
        Line::from(vec![Span::raw("Download:  "), Span::raw(display.download_text.clone())]),
        Line::from(vec![Span::raw("Upload:    "), Span::raw(display.upload_text.clone())]),
        Line::from(trigger),
    ];
    if display.progress_visible {
        lines.push(Line::from(Span::styled(
            "Testing...",
            Style::default().fg(Color::Yellow),
        )));
    }
    let block = Block::default().borders(Borders::ALL).title(" Speed Test ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_chart(frame: &mut Frame, app: &App<TerminalChart>, area: Rect) {
    let sink = app.chart();
    let chart = sink.renderer();
    let spec = sink.spec();

    let dataset = Dataset::default()
        .name(spec.series_label.clone())
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::LightRed))
        .data(chart.points());

    let [y_low, y_high] = chart.y_bounds();
    let y_labels = vec![
        Span::raw(format!("{:.0}", y_low)),
        Span::raw(format!("{:.0}", (y_low + y_high) / 2.0)),
        Span::raw(format!("{:.0}", y_high)),
    ];
    let x_labels = vec![
        Span::raw(chart.first_label.clone()),
        Span::raw(chart.last_label.clone()),
    ];

    let widget = Chart::new(vec![dataset])
        .block(Block::default().borders(Borders::ALL).title(" Connection "))
        .x_axis(
            Axis::default()
                .title(spec.x_title.clone())
                .bounds(chart.x_bounds())
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title(spec.y_title.clone())
                .bounds(chart.y_bounds())
                .labels(y_labels),
        );
    frame.render_widget(widget, area);
}

fn key_to_event(key: KeyEvent) -> Option<AppEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(AppEvent::Quit),
        KeyCode::Char('q') | KeyCode::Esc => Some(AppEvent::Quit),
        KeyCode::Char('s') | KeyCode::Enter => Some(AppEvent::StartSpeedTest),
        _ => None,
    }
}

/// 把按键和窗口大小变化转发给事件循环
pub fn spawn_key_reader(tx: mpsc::UnboundedSender<AppEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut events = EventStream::new();
        while let Some(Ok(event)) = events.next().await {
            let app_event = match event {
                Event::Key(key) => key_to_event(key),
                Event::Resize(_, _) => Some(AppEvent::Redraw),
                _ => None,
            };
            if let Some(app_event) = app_event {
                if tx.send(app_event).is_err() {
                    break;
                }
            }
        }
        debug!("key reader stopped");
    })
}
