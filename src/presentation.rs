//! Presentation of membership snapshots
//!
//! The core only hands snapshots to a [`Presenter`]; how they are shown is up
//! to the implementation. Refreshes are fire-and-forget and must not block.
use std::fmt::Write;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::membership::MembershipSnapshot;

pub trait Presenter: Send + Sync {
    /// Whether snapshots should be produced at all
    fn enabled(&self) -> bool {
        true
    }

    fn refresh(&self, snapshot: MembershipSnapshot);
}

/// Discards every refresh
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopPresenter;

impl Presenter for NoopPresenter {
    fn enabled(&self) -> bool {
        false
    }

    fn refresh(&self, _snapshot: MembershipSnapshot) {}
}

/// Publishes the latest snapshot on a watch channel. Slow readers only ever
/// see the newest table, intermediate ones are overwritten.
#[derive(Debug)]
pub struct WatchPresenter {
    tx: watch::Sender<MembershipSnapshot>,
}

impl WatchPresenter {
    pub fn channel() -> (Self, watch::Receiver<MembershipSnapshot>) {
        let (tx, rx) = watch::channel(MembershipSnapshot::default());
        (Self { tx }, rx)
    }
}

impl Presenter for WatchPresenter {
    fn refresh(&self, snapshot: MembershipSnapshot) {
        self.tx.send_replace(snapshot);
    }
}

/// Print every published snapshot as a table on stdout until the sender goes away
pub fn spawn_console_renderer(mut rx: watch::Receiver<MembershipSnapshot>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let table = render_table(&rx.borrow_and_update());
            println!("{}", table);
        }
        debug!("Console renderer finished");
    })
}

const HEADERS: [&str; 4] = ["IP", "PID", "CONFIDENCE", "TIME"];

/// Render a snapshot as a plain text table with a process count footer
pub fn render_table(snapshot: &MembershipSnapshot) -> String {
    let rows: Vec<[String; 4]> = snapshot
        .rows
        .iter()
        .map(|row| {
            [
                row.address.clone(),
                row.process_id.to_string(),
                format!("{:.6}", row.confidence),
                row.last_heartbeat_at.to_string(),
            ]
        })
        .collect();
    let footer = [
        String::new(),
        String::new(),
        "Total Processes".to_string(),
        snapshot.active_process_count.to_string(),
    ];

    // Padding with `{:<width$}` counts chars, so widths must too
    let mut widths = HEADERS.map(|header| header.chars().count());
    for line in rows.iter().chain(std::iter::once(&footer)) {
        for (width, cell) in widths.iter_mut().zip(line.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let separator = widths
        .iter()
        .map(|w| "-".repeat(w + 2))
        .collect::<Vec<_>>()
        .join("*");
    let separator = format!("*{}*", separator);

    let mut out = String::new();
    let headers = HEADERS.map(str::to_string);
    // Writing to a String cannot fail
    let _ = writeln!(out, "{}", separator);
    push_line(&mut out, &headers, &widths);
    let _ = writeln!(out, "{}", separator);
    for row in &rows {
        push_line(&mut out, row, &widths);
    }
    let _ = writeln!(out, "{}", separator);
    push_line(&mut out, &footer, &widths);
    let _ = write!(out, "{}", separator);
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths.iter())
        .map(|(cell, width)| format!(" {:<width$} ", cell, width = width))
        .collect::<Vec<_>>()
        .join("|");
    let _ = writeln!(out, "|{}|", line);
}
