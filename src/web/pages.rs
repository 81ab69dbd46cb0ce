// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! HTML rendering for the dashboard pages

use crate::model::{Movement, Reagent, MovementKind, DATE_FORMAT, TIME_FORMAT};
use crate::report::StockReport;

/// Result banner shown above a form
pub enum Banner {
    Success(String),
    Error(String),
}

impl Banner {
    fn render(&self) -> String {
        let (class, text) = match self {
            Banner::Success(text) => ("banner success", text),
            Banner::Error(text) => ("banner error", text),
        };
        format!(r#"<div class="{}">{}</div>"#, class, escape_html(text))
    }
}

/// Escape text for use in HTML bodies and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

fn base_template(title: &str, content: &str) -> String {
    format!(r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{} - Reagent Inventory</title>
    <style>
        :root {{
            --bg-primary: #1a1a2e;
            --bg-secondary: #16213e;
            --bg-card: #0f3460;
            --text-primary: #e8e8e8;
            --text-secondary: #a0a0a0;
            --accent: #00d9a5;
            --danger: #e94560;
            --warning: #f5a623;
            --border: #2a2a4a;
        }}
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.6;
        }}
        .container {{ max-width: 1400px; margin: 0 auto; padding: 20px; }}
        h1 {{ margin-bottom: 20px; }}
        nav {{
            background: var(--bg-secondary);
            padding: 15px 20px;
            display: flex;
            align-items: center;
            gap: 30px;
            border-bottom: 1px solid var(--border);
        }}
        nav .logo {{ font-size: 1.5em; font-weight: bold; color: var(--accent); text-decoration: none; }}
        nav a {{ color: var(--text-secondary); text-decoration: none; }}
        nav a:hover {{ color: var(--text-primary); }}
        .card {{ background: var(--bg-card); border-radius: 12px; padding: 20px; margin-bottom: 20px; }}
        .card h2 {{ margin-bottom: 15px; color: var(--accent); }}
        .stats-grid {{
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(160px, 1fr));
            gap: 20px;
            margin-bottom: 30px;
        }}
        .stat-card {{ background: var(--bg-card); border-radius: 12px; padding: 20px; text-align: center; }}
        .stat-card .number {{ font-size: 2.5em; font-weight: bold; color: var(--accent); }}
        .stat-card .label {{ color: var(--text-secondary); font-size: 0.9em; }}
        table {{ width: 100%; border-collapse: collapse; }}
        th, td {{ padding: 10px; text-align: left; border-bottom: 1px solid var(--border); }}
        th {{ color: var(--text-secondary); font-weight: 500; }}
        tr:hover {{ background: rgba(255,255,255,0.05); }}
        .status {{ padding: 2px 8px; border-radius: 12px; font-size: 0.85em; background: var(--bg-secondary); }}
        .status.depleted, .status.damaged, .status.expired {{ background: var(--danger); }}
        .status.in-use {{ background: var(--warning); color: #1a1a2e; }}
        .kind-ENTRADA {{ color: var(--accent); }}
        .kind-SALIDA {{ color: var(--danger); }}
        .banner {{ padding: 12px 16px; border-radius: 8px; margin-bottom: 20px; }}
        .banner.success {{ background: rgba(0, 217, 165, 0.2); border: 1px solid var(--accent); }}
        .banner.error {{ background: rgba(233, 69, 96, 0.2); border: 1px solid var(--danger); }}
        form.grid {{ display: grid; grid-template-columns: 160px 1fr; gap: 12px; max-width: 640px; }}
        input, button {{
            padding: 8px;
            border-radius: 6px;
            border: 1px solid var(--border);
            background: var(--bg-secondary);
            color: var(--text-primary);
        }}
        button {{ background: var(--accent); color: #1a1a2e; font-weight: bold; cursor: pointer; }}
        pre {{ white-space: pre-wrap; font-family: 'Courier New', monospace; }}
        ul.alerts li {{ color: var(--warning); margin-left: 20px; }}
    </style>
</head>
<body>
    <nav>
        <a href="/" class="logo">Reagents</a>
        <a href="/">Dashboard</a>
        <a href="/inventory">Inventory</a>
        <a href="/deposit">Deposit</a>
        <a href="/withdraw">Withdraw</a>
        <a href="/movements">Movements</a>
        <a href="/alerts">Alerts</a>
        <a href="/reports">Reports</a>
    </nav>
    <main class="container">
        {}
    </main>
</body>
</html>"#, escape_html(title), content)
}

fn format_date(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default()
}

pub fn render_index(
    report: &StockReport,
    recent: &[&Movement],
    problems: &[&Reagent],
    location: &str,
) -> String {
    let s = &report.summary;
    let cards = [
        (s.total, "Reagents"),
        (s.available, "Available"),
        (s.in_use, "In use"),
        (s.expired_by_date, "Expired"),
        (s.near_expiry, "Expiring soon"),
        (report.low_stock.len(), "Low stock"),
    ];
    let cards_html: String = cards
        .iter()
        .map(|(n, label)| format!(
            r#"<div class="stat-card"><div class="number">{}</div><div class="label">{}</div></div>"#,
            n, label
        ))
        .collect();

    let alerts = report.startup_alerts();
    let alerts_html = if alerts.is_empty() {
        "<p>No alerts.</p>".to_string()
    } else {
        let items: String = alerts
            .iter()
            .map(|a| format!("<li>{}</li>", escape_html(a)))
            .collect();
        format!(r#"<ul class="alerts">{}</ul><p><a href="/alerts">Details</a></p>"#, items)
    };

    let content = format!(r#"
        <h1>Dashboard</h1>
        <div class="stats-grid">{}</div>
        <div style="display: grid; grid-template-columns: 2fr 1fr; gap: 20px;">
            <div class="card">
                <h2>Recent Movements</h2>
                {}
            </div>
            <div class="card">
                <h2>Alerts</h2>
                {}
                <p style="margin-top: 15px; color: var(--text-secondary);">Storage: {}</p>
            </div>
        </div>
        <div class="card">
            <h2>Needs Attention</h2>
            {}
        </div>
    "#, cards_html, render_movements_table(recent), alerts_html, escape_html(location),
        render_reagents_table(problems));

    base_template("Dashboard", &content)
}

fn render_reagents_table(reagents: &[&Reagent]) -> String {
    if reagents.is_empty() {
        return "<p>No reagents found.</p>".to_string();
    }
    let rows: String = reagents
        .iter()
        .map(|r| format!(r#"
                <tr>
                    <td>{}</td>
                    <td>{:.2}</td>
                    <td>{}</td>
                    <td><span class="status {}">{}</span></td>
                    <td>{}</td>
                    <td>{}</td>
                    <td>{}</td>
                </tr>"#,
            escape_html(&r.name),
            r.quantity,
            escape_html(&r.unit),
            r.status.as_str(),
            r.status.label(),
            format_date(r.expiration_date),
            format_date(r.received_date),
            escape_html(&r.notes),
        ))
        .collect();

    format!(r#"
        <table>
            <tr>
                <th>Reagent</th><th>Quantity</th><th>Unit</th><th>Status</th>
                <th>Expires</th><th>Received</th><th>Notes</th>
            </tr>
            {}
        </table>
    "#, rows)
}

pub fn render_inventory_page(reagents: &[&Reagent], term: &str) -> String {
    let content = format!(r#"
        <h1>Inventory</h1>
        <div class="card">
            <form method="get" action="/inventory" style="margin-bottom: 15px;">
                <input type="text" name="q" value="{}" placeholder="Search by name">
                <button type="submit">Search</button>
            </form>
            {}
        </div>
    "#, escape_html(term), render_reagents_table(reagents));

    base_template("Inventory", &content)
}

fn reagent_datalist(reagents: &[Reagent]) -> String {
    let options: String = reagents
        .iter()
        .map(|r| format!(r#"<option value="{}">"#, escape_html(&r.name)))
        .collect();
    format!(r#"<datalist id="reagent-names">{}</datalist>"#, options)
}

pub fn render_deposit_page(reagents: &[Reagent], default_unit: &str, banner: Option<&Banner>) -> String {
    let content = format!(r#"
        <h1>Register Entry</h1>
        {}
        <div class="card">
            <form method="post" action="/deposit" class="grid">
                <label for="name">Reagent *</label>
                <input id="name" name="name" list="reagent-names" required>
                <label for="quantity">Quantity *</label>
                <input id="quantity" name="quantity" inputmode="decimal" required>
                <label for="unit">Unit</label>
                <input id="unit" name="unit" placeholder="{}">
                <label for="user">User *</label>
                <input id="user" name="user" required>
                <label for="project">Project / course *</label>
                <input id="project" name="project" required>
                <label for="expires">Expiration date</label>
                <input id="expires" name="expires" type="date">
                <label for="notes">Notes</label>
                <input id="notes" name="notes">
                <span></span>
                <button type="submit">Register entry</button>
            </form>
            {}
        </div>
    "#,
        banner.map(Banner::render).unwrap_or_default(),
        escape_html(default_unit),
        reagent_datalist(reagents),
    );

    base_template("Deposit", &content)
}

pub fn render_withdraw_page(reagents: &[Reagent], banner: Option<&Banner>) -> String {
    let content = format!(r#"
        <h1>Register Withdrawal</h1>
        {}
        <div class="card">
            <form method="post" action="/withdraw" class="grid">
                <label for="name">Reagent *</label>
                <input id="name" name="name" list="reagent-names" required>
                <label for="quantity">Quantity *</label>
                <input id="quantity" name="quantity" inputmode="decimal" required>
                <label for="user">User *</label>
                <input id="user" name="user" required>
                <label for="project">Project / course *</label>
                <input id="project" name="project" required>
                <label for="notes">Notes</label>
                <input id="notes" name="notes">
                <span></span>
                <button type="submit">Register withdrawal</button>
            </form>
            {}
        </div>
    "#,
        banner.map(Banner::render).unwrap_or_default(),
        reagent_datalist(reagents),
    );

    base_template("Withdraw", &content)
}

fn render_movements_table(movements: &[&Movement]) -> String {
    if movements.is_empty() {
        return "<p>No movements recorded yet.</p>".to_string();
    }
    let rows: String = movements
        .iter()
        .map(|m| format!(r#"
                <tr>
                    <td>{} {}</td>
                    <td class="kind-{}">{}</td>
                    <td>{}</td>
                    <td>{} {}</td>
                    <td>{}</td>
                    <td>{}</td>
                </tr>"#,
            m.date.format(DATE_FORMAT),
            m.time.format(TIME_FORMAT),
            m.kind.as_str(),
            match m.kind {
                MovementKind::Deposit => "Entry",
                MovementKind::Withdrawal => "Withdrawal",
            },
            escape_html(&m.name),
            m.quantity,
            escape_html(&m.unit),
            escape_html(&m.user),
            escape_html(&m.project),
        ))
        .collect();

    format!(r#"
        <table>
            <tr><th>When</th><th>Type</th><th>Reagent</th><th>Quantity</th><th>User</th><th>Project</th></tr>
            {}
        </table>
    "#, rows)
}

pub fn render_movements_page(movements: &[&Movement]) -> String {
    let content = format!(r#"
        <h1>Movements</h1>
        <div class="card">{}</div>
    "#, render_movements_table(movements));

    base_template("Movements", &content)
}

pub fn render_text_page(title: &str, text: &str, banner: Option<&Banner>) -> String {
    let content = format!(r#"
        <h1>{}</h1>
        {}
        <div class="card"><pre>{}</pre></div>
    "#,
        escape_html(title),
        banner.map(Banner::render).unwrap_or_default(),
        escape_html(text),
    );

    base_template(title, &content)
}

pub fn render_reports_page(text: &str, banner: Option<&Banner>) -> String {
    let content = format!(r#"
        <h1>Stock Report</h1>
        {}
        <form method="post" action="/reports/export" style="margin-bottom: 20px;">
            <button type="submit">Export to TXT</button>
        </form>
        <div class="card"><pre>{}</pre></div>
    "#,
        banner.map(Banner::render).unwrap_or_default(),
        escape_html(text),
    );

    base_template("Reports", &content)
}
