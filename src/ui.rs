use crate::models::{CalendarResponse, StatsResponse};
use std::fmt::Write;

const CELL: usize = 12;
const STEP: usize = 16;
const LABEL_GUTTER: usize = 24;
const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub fn render_index(stats: &StatsResponse, calendar: &CalendarResponse) -> String {
    let record_badge = if stats.is_new_record {
        r#"<span class="badge">New record!</span>"#
    } else {
        ""
    };
    let sync_notice = match &stats.last_sync_error {
        Some(err) => format!(r#"<p class="notice">Showing cached data: {}</p>"#, escape(err)),
        None => String::new(),
    };

    INDEX_HTML
        .replace("{{DATE}}", &stats.date)
        .replace("{{TODAY}}", &stats.today_count.to_string())
        .replace("{{RECORD}}", record_badge)
        .replace("{{TOTAL}}", &stats.total.to_string())
        .replace("{{STREAK}}", &stats.streak.to_string())
        .replace("{{GOAL}}", &stats.goal.goal.to_string())
        .replace("{{PERCENT}}", &format!("{:.1}", stats.goal.percentage))
        .replace("{{COUNTDOWNS}}", &render_countdowns(stats))
        .replace("{{NOTICE}}", &sync_notice)
        .replace("{{HEATMAP}}", &render_heatmap(calendar))
}

fn render_countdowns(stats: &StatsResponse) -> String {
    let mut html = String::new();
    for countdown in &stats.countdowns {
        let _ = write!(
            html,
            r#"<div class="stat"><span class="label">{}</span><span class="value">{} days</span></div>"#,
            escape(&countdown.label),
            countdown.days_remaining
        );
    }
    html
}

fn render_heatmap(calendar: &CalendarResponse) -> String {
    let width = LABEL_GUTTER + calendar.weeks.len() * STEP;
    let height = 30 + 7 * STEP;
    let mut svg = format!(r#"<svg width="{width}" height="{height}" role="img">"#);

    svg.push_str(r#"<g transform="translate(0, 15)">"#);
    for label in &calendar.month_labels {
        let _ = write!(
            svg,
            r#"<text class="axis" x="{}" y="0">{}</text>"#,
            LABEL_GUTTER + label.column * STEP,
            label.label
        );
    }
    svg.push_str("</g>");

    let _ = write!(svg, r#"<g transform="translate({LABEL_GUTTER}, 30)">"#);
    if let Some(first_week) = calendar.weeks.first() {
        for cell in first_week.iter().filter(|cell| cell.row % 2 == 1) {
            let _ = write!(
                svg,
                r#"<text class="axis" x="-{LABEL_GUTTER}" y="{}">{}</text>"#,
                cell.row * STEP + 10,
                WEEKDAY_NAMES[cell.weekday as usize % 7]
            );
        }
    }
    for cell in calendar.weeks.iter().flatten() {
        let mut class = format!("day {}", cell.intensity);
        if cell.is_today {
            class.push_str(" today");
        }
        if cell.is_highlighted {
            class.push_str(" highlight");
        }
        if cell.is_future {
            class.push_str(" future");
        }
        let _ = write!(
            svg,
            r#"<rect class="{class}" x="{}" y="{}" width="{CELL}" height="{CELL}" rx="2" ry="2"><title>{}</title></rect>"#,
            cell.column * STEP,
            cell.row * STEP,
            cell.tooltip
        );
    }
    svg.push_str("</g></svg>");
    svg
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Progress Tracker</title>
  <style>
    :root {
      --bg: #f8f3e6;
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.9);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: linear-gradient(135deg, var(--bg), #ffe9d4 60%, #f9f2e9 100%);
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(960px, 100%);
      background: var(--card);
      border-radius: 28px;
      padding: 36px;
      display: grid;
      gap: 28px;
    }

    .done {
      justify-self: center;
      font-size: 1.8rem;
      padding: 18px 56px;
      border: none;
      border-radius: 999px;
      color: white;
      background: linear-gradient(135deg, #fb923c, var(--accent));
      cursor: pointer;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
      gap: 16px;
    }

    .stat {
      background: white;
      border-radius: 18px;
      padding: 18px;
      display: grid;
      gap: 8px;
    }

    .stat .label {
      font-size: 0.85rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: #8b857d;
    }

    .stat .value {
      font-size: 1.7rem;
      font-weight: 600;
      color: var(--accent-2);
    }

    .badge {
      margin-left: 8px;
      padding: 2px 8px;
      border-radius: 999px;
      background: #fee2e2;
      color: #dc2626;
      font-size: 0.75rem;
    }

    .bar {
      height: 10px;
      border-radius: 999px;
      background: #e5e7eb;
      overflow: hidden;
    }

    .bar span {
      display: block;
      height: 100%;
      background: linear-gradient(90deg, #4ade80, #3b82f6);
    }

    .notice {
      color: #b45309;
    }

    .heatmap {
      overflow-x: auto;
    }

    .axis {
      font-size: 10px;
      fill: #6b7280;
    }

    .day.empty { fill: #ebedf0; }
    .day.level-1 { fill: #fde68a; }
    .day.level-2 { fill: #fbbf24; }
    .day.level-3 { fill: #f59e0b; }
    .day.level-4 { fill: #ea580c; }
    .day.level-5 { fill: #c2410c; }
    .day.over { fill: #7c2d12; }
    .day.highlight { stroke: #38bdf8; stroke-width: 1; }
    .day.today { stroke: var(--ink); stroke-width: 2; }
    .day.future { opacity: 0.5; }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>Progress Tracker</h1>
      <p>{{DATE}}</p>
    </header>
    {{NOTICE}}
    <form method="post" action="/increment">
      <button class="done" type="submit">Done one!</button>
    </form>
    <section class="panel">
      <div class="stat"><span class="label">Today{{RECORD}}</span><span class="value" id="today">{{TODAY}}</span></div>
      <div class="stat"><span class="label">Total</span><span class="value" id="total">{{TOTAL}}</span></div>
      <div class="stat"><span class="label">Streak</span><span class="value">{{STREAK}} days</span></div>
    </section>
    <section>
      <p>Goal: {{TOTAL}} / {{GOAL}}</p>
      <div class="bar"><span style="width: {{PERCENT}}%"></span></div>
    </section>
    <section class="panel">{{COUNTDOWNS}}</section>
    <section class="heatmap">{{HEATMAP}}</section>
  </main>
  <script>
    window.addEventListener('keydown', async (event) => {
      const tag = event.target.tagName;
      if (event.code !== 'Space' || tag === 'INPUT' || tag === 'TEXTAREA') {
        return;
      }
      event.preventDefault();
      const response = await fetch('/api/increment', { method: 'POST' });
      if (response.ok) {
        const data = await response.json();
        document.getElementById('today').textContent = data.count;
        window.location.reload();
      }
    });
  </script>
</body>
</html>
"#;
