// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Server-rendered HTML view of a stream.
//!
//! Read-only: it consumes the same newest-first entries as `GET /logs` and
//! renders whichever shape each entry came back in.

use std::fmt::Write;

use logbook::{Entry, Event, EventSummary, StreamName, StreamStats};

pub struct DashboardView<'a> {
    pub selected: StreamName,
    pub entries: &'a [Entry],
    pub stats: &'a [StreamStats],
    pub limit: usize,
}

const STYLE: &str = "\
body{font-family:-apple-system,Segoe UI,Roboto,sans-serif;margin:0;background:#f4f5f7;color:#222}\
header{background:#1f2933;color:#fff;padding:16px 24px}\
header h1{margin:0;font-size:20px}\
nav{display:flex;gap:8px;padding:12px 24px;background:#fff;border-bottom:1px solid #ddd}\
nav a{padding:6px 12px;border-radius:4px;text-decoration:none;color:#1f2933;background:#e4e7eb}\
nav a.active{background:#1f2933;color:#fff}\
nav small{opacity:.7;margin-left:4px}\
main{padding:16px 24px}\
.entry{background:#fff;border-radius:6px;padding:12px 16px;margin-bottom:10px;border-left:4px solid #9aa5b1}\
.entry.info{border-color:#3e7bfa}.entry.error{border-color:#e12d39}.entry.api-failed{border-color:#f0b429}\
.badge{font-size:11px;font-weight:bold;text-transform:uppercase;padding:2px 6px;border-radius:3px;background:#e4e7eb}\
.ts{color:#7b8794;font-size:12px;margin-left:8px}\
.title{font-weight:600;margin:6px 0 2px}\
.desc{color:#52606d}\
pre{background:#f5f7fa;padding:8px;border-radius:4px;overflow-x:auto;font-size:12px;margin:8px 0 0}\
.empty{color:#7b8794;font-style:italic}";

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render(view: &DashboardView<'_>) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>Logbook - {}</title><style>{}</style></head><body>",
        view.selected, STYLE
    );
    html.push_str("<header><h1>Logbook</h1></header><nav>");

    for name in StreamName::ALL {
        let bytes = view
            .stats
            .iter()
            .find(|s| s.stream == name.as_str())
            .map(|s| s.bytes)
            .unwrap_or(0);
        let class = if name == view.selected { " class=\"active\"" } else { "" };
        let _ = write!(
            html,
            "<a href=\"/dashboard?type={0}\"{1}>{0}<small>{2}</small></a>",
            name,
            class,
            format_bytes(bytes)
        );
    }

    let _ = write!(
        html,
        "</nav><main><p>Showing up to {} most recent entries, newest first.</p>",
        view.limit
    );

    if view.entries.is_empty() {
        html.push_str("<p class=\"empty\">No entries.</p>");
    }
    for entry in view.entries {
        match entry {
            Entry::Event(event) => render_event(&mut html, event),
            Entry::Summary(summary) => render_summary(&mut html, summary),
            Entry::Raw(raw) => {
                let _ = write!(html, "<div class=\"entry\"><pre>{}</pre></div>", escape_html(raw));
            }
        }
    }

    html.push_str("</main></body></html>");
    html
}

fn render_event(html: &mut String, event: &Event) {
    let _ = write!(
        html,
        "<div class=\"entry {kind}\"><span class=\"badge\">{kind}</span><span class=\"ts\">{ts}</span><div class=\"title\">{title}</div>",
        kind = event.kind,
        ts = event.timestamp.to_rfc3339(),
        title = escape_html(&event.title)
    );
    if !event.description.is_empty() {
        let _ = write!(html, "<div class=\"desc\">{}</div>", escape_html(&event.description));
    }
    if !event.metadata.is_empty() {
        let pretty = serde_json::to_string_pretty(&event.metadata).unwrap_or_default();
        let _ = write!(html, "<pre>{}</pre>", escape_html(&pretty));
    }
    html.push_str("</div>");
}

fn render_summary(html: &mut String, summary: &EventSummary) {
    let kind = summary.kind.as_deref().map(escape_html).unwrap_or_default();
    let _ = write!(html, "<div class=\"entry {0}\">", kind);
    if !kind.is_empty() {
        let _ = write!(html, "<span class=\"badge\">{}</span>", kind);
    }
    if let Some(ts) = &summary.timestamp {
        let _ = write!(html, "<span class=\"ts\">{}</span>", escape_html(ts));
    }
    let _ = write!(html, "<div class=\"title\">{}</div>", escape_html(&summary.title));
    if let Some(desc) = &summary.description {
        let _ = write!(html, "<div class=\"desc\">{}</div>", escape_html(desc));
    }
    html.push_str("</div>");
}

fn format_bytes(bytes: u64) -> String {
    match bytes {
        0 => "empty".to_string(),
        b if b < 1024 => format!("{} B", b),
        b if b < 1024 * 1024 => format!("{:.1} KB", b as f64 / 1024.0),
        b => format!("{:.1} MB", b as f64 / (1024.0 * 1024.0)),
    }
}
