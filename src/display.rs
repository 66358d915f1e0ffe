use std::collections::VecDeque;

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::bus::Topic;
use crate::settings::DisplaySettings;

/// Operator-facing status output.
pub trait StatusDisplay {
    fn print_line(&mut self, text: &str);
    fn clear(&mut self);
}

/// Contents of the display after a change, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub rows: Vec<String>,
}

/// Character LCD emulation.
///
/// New lines are appended at the bottom; once every row is used the display
/// scrolls up. Text wider than the display is cut off. Each change is
/// published as a [`Frame`].
#[derive(Debug)]
pub struct LineDisplay {
    rows: usize,
    columns: usize,
    enabled: bool,
    lines: VecDeque<String>,
    frames: Topic<Frame>,
}

impl LineDisplay {
    pub fn new(settings: &DisplaySettings, frames: Topic<Frame>) -> Self {
        LineDisplay {
            rows: settings.rows,
            columns: settings.columns,
            enabled: settings.enabled,
            lines: VecDeque::with_capacity(settings.rows),
            frames,
        }
    }

    pub fn frame(&self) -> Frame {
        Frame {
            rows: self.lines.iter().cloned().collect(),
        }
    }

    fn publish(&self) {
        self.frames.publish(self.frame());
    }
}

impl StatusDisplay for LineDisplay {
    fn print_line(&mut self, text: &str) {
        if !self.enabled || self.rows == 0 {
            return;
        }
        if self.lines.len() == self.rows {
            self.lines.pop_front();
        }
        self.lines.push_back(text.chars().take(self.columns).collect());
        self.publish();
    }

    fn clear(&mut self) {
        self.lines.clear();
        self.publish();
    }
}

/// Mirrors display frames to the log.
pub async fn display_task(mut frames: broadcast::Receiver<std::sync::Arc<Frame>>) -> anyhow::Result<()> {
    info!("Display task started.");
    loop {
        match frames.recv().await {
            Ok(frame) => info!(target: "display", "[{}]", frame.rows.join(" | ")),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Display fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => {
                info!("Display task finished.");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display(rows: usize, columns: usize) -> (LineDisplay, broadcast::Receiver<std::sync::Arc<Frame>>) {
        let topic = Topic::new(16);
        let rx = topic.subscribe();
        let settings = DisplaySettings {
            enabled: true,
            rows,
            columns,
        };
        (LineDisplay::new(&settings, topic), rx)
    }

    #[test]
    fn test_truncates_to_columns() {
        let (mut display, _rx) = display(2, 5);
        display.print_line("Accelerating forward.");
        assert_eq!(display.frame().rows, vec!["Accel"]);
    }

    #[test]
    fn test_scrolls_up_when_full() {
        let (mut display, _rx) = display(2, 20);
        display.print_line("one");
        display.print_line("two");
        display.print_line("three");
        assert_eq!(display.frame().rows, vec!["two", "three"]);
    }

    #[test]
    fn test_clear_publishes_empty_frame() {
        let (mut display, mut rx) = display(4, 20);
        display.print_line("hello");
        display.clear();
        assert_eq!(rx.try_recv().unwrap().rows, vec!["hello"]);
        assert!(rx.try_recv().unwrap().rows.is_empty());
    }

    #[test]
    fn test_disabled_display_ignores_lines() {
        let topic = Topic::new(4);
        let mut rx = topic.subscribe();
        let settings = DisplaySettings {
            enabled: false,
            ..DisplaySettings::default()
        };
        let mut display = LineDisplay::new(&settings, topic);
        display.print_line("dropped");
        assert!(display.frame().rows.is_empty());
        assert!(rx.try_recv().is_err());
    }
}
