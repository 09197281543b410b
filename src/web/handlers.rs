//! HTTP handlers for API endpoints.

use crate::display::{self, DashboardUpdate};
use crate::error::TelemetryError;
use crate::store::HistoryPoint;
use crate::web::{websocket, AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, Json},
};
use serde_json::{json, Value};
use tracing::{error, warn};

type ApiError = (StatusCode, Json<Value>);

/// Current dashboard state.
pub async fn get_latest(State(state): State<AppState>) -> Json<DashboardUpdate> {
    Json(state.dashboard.read().await.snapshot())
}

/// Column names and whether each can be plotted yet.
pub async fn get_channels(State(state): State<AppState>) -> Json<Value> {
    let dashboard = state.dashboard.read().await;
    let channels: Vec<Value> = dashboard
        .columns()
        .iter()
        .enumerate()
        .map(|(index, name)| {
            json!({
                "index": index,
                "name": name,
                "history_enabled": dashboard.history_enabled(index),
            })
        })
        .collect();
    Json(json!({ "channels": channels }))
}

/// Full history of one channel, re-read from the session log.
pub async fn get_history(
    State(state): State<AppState>,
    Path(channel): Path<usize>,
) -> Result<Json<Value>, ApiError> {
    let dashboard = state.dashboard.read().await.clone();
    let reader = state.history.clone();

    let result = tokio::task::spawn_blocking(move || {
        display::request_history(&dashboard, &reader, channel)
    })
    .await
    .map_err(|e| {
        error!("History task failed: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "history task failed")
    })?;

    match result {
        Ok(points) => Ok(Json(history_body(&state, channel, points))),
        Err(TelemetryError::UnknownChannel(_)) => {
            Err(api_error(StatusCode::NOT_FOUND, "unknown channel"))
        }
        Err(TelemetryError::StoreUnavailable(detail)) => {
            warn!("History for channel {} unavailable: {}", channel, detail);
            Err(api_error(StatusCode::SERVICE_UNAVAILABLE, "no data available"))
        }
        Err(e) => {
            error!("History for channel {} failed: {}", channel, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "history read failed"))
        }
    }
}

fn history_body(state: &AppState, channel: usize, points: Vec<HistoryPoint>) -> Value {
    json!({
        "channel": channel,
        "name": state.history.schema().column_name(channel),
        "points": points,
    })
}

fn api_error(status: StatusCode, message: &str) -> ApiError {
    (status, Json(json!({ "error": message })))
}

/// Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let clients = websocket::connected_client_count(&state).await;
    let dashboard = state.dashboard.read().await;
    Json(json!({
        "status": "ok",
        "service": "solar-logger",
        "version": env!("CARGO_PKG_VERSION"),
        "acquisition": dashboard.status(),
        "readings_received": dashboard.readings_received(),
        "clients": clients,
        "session_log": state.history.path().display().to_string(),
        "timestamp": chrono::Local::now().to_rfc3339()
    }))
}

/// Serve the built-in dashboard page.
pub async fn default_index() -> Html<&'static str> {
    Html(DEFAULT_INDEX_HTML)
}

/// Built-in dashboard: a value table with one plot button per channel.
const DEFAULT_INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Solar Car Telemetry</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }

        body {
            font-family: Arial, Helvetica, sans-serif;
            background: #f2f2f2;
            color: #222;
            padding: 20px;
        }

        header {
            display: flex;
            justify-content: space-between;
            align-items: baseline;
            margin-bottom: 20px;
        }

        header h1 { font-size: 1.6rem; }

        #clock { font-size: 1.4rem; font-weight: bold; }

        table {
            width: 100%;
            border-collapse: separate;
            border-spacing: 5px;
        }

        th {
            background: #bbbbbb;
            padding: 8px 4px;
            font-size: 0.9rem;
        }

        td {
            background: #cccccc;
            padding: 10px 4px;
            text-align: center;
            font-size: 1.1rem;
        }

        td.buttons { background: transparent; }

        button {
            width: 100%;
            padding: 10px 0;
            font-size: 1rem;
            cursor: pointer;
        }

        button:disabled { cursor: not-allowed; }

        #plot-panel {
            display: none;
            margin-top: 20px;
            background: white;
            padding: 15px;
            border-radius: 6px;
        }

        #plot-panel h2 { font-size: 1.2rem; margin-bottom: 10px; }

        #plot-message { color: #a33; margin-bottom: 10px; }

        #status {
            margin-top: 20px;
            padding: 10px;
            border-radius: 6px;
            background: #dfe;
        }

        #status.error { background: #fdd; }
    </style>
</head>
<body>
    <header>
        <h1>Solar Car Telemetry</h1>
        <span id="clock"></span>
    </header>

    <table>
        <thead><tr id="labels"></tr></thead>
        <tbody>
            <tr id="values"></tr>
            <tr id="plots"></tr>
        </tbody>
    </table>

    <div id="plot-panel">
        <h2 id="plot-title"></h2>
        <div id="plot-message"></div>
        <canvas id="plot" width="1000" height="400"></canvas>
        <p><button id="plot-close" style="width: auto; padding: 8px 20px;">Close</button></p>
    </div>

    <div id="status">Connecting...</div>

    <script>
        let columns = [];

        function buildTable(names) {
            columns = names;
            const labels = document.getElementById('labels');
            const values = document.getElementById('values');
            const plots = document.getElementById('plots');
            labels.innerHTML = '';
            values.innerHTML = '';
            plots.innerHTML = '';

            names.forEach((name, i) => {
                const th = document.createElement('th');
                th.textContent = name;
                labels.appendChild(th);

                const td = document.createElement('td');
                td.id = `value-${i}`;
                values.appendChild(td);

                const cell = document.createElement('td');
                cell.className = 'buttons';
                if (i !== 0) {
                    const button = document.createElement('button');
                    button.id = `plot-${i}`;
                    button.textContent = 'Plot';
                    button.disabled = true;
                    button.onclick = () => plotChannel(i);
                    cell.appendChild(button);
                }
                plots.appendChild(cell);
            });
        }

        function showRow(row, enabled) {
            if (row) {
                row.forEach((value, i) => {
                    const td = document.getElementById(`value-${i}`);
                    if (td) td.textContent = value;
                });
            }
            (enabled || []).forEach((on, i) => {
                const button = document.getElementById(`plot-${i}`);
                if (button) button.disabled = !on;
            });
        }

        function setStatus(text, isError) {
            const status = document.getElementById('status');
            status.textContent = text;
            status.className = isError ? 'error' : '';
        }

        function handleUpdate(update) {
            switch (update.type) {
                case 'snapshot':
                    buildTable(update.columns);
                    showRow(update.row, update.history_enabled);
                    if (update.status.state === 'stopped') {
                        setStatus(`Acquisition stopped (${describe(update.status.reason)})`, true);
                    } else {
                        setStatus(`Receiving, ${update.readings_received} readings so far`, false);
                    }
                    break;
                case 'reading':
                    showRow(update.row, update.history_enabled);
                    setStatus(`Last reading at ${update.row[0]}`, false);
                    break;
                case 'stopped':
                    setStatus(`Acquisition stopped (${describe(update.reason)})`, true);
                    break;
            }
        }

        function describe(reason) {
            if (!reason) return 'unknown';
            return reason.detail ? `${reason.kind}: ${reason.detail}` : reason.kind;
        }

        async function plotChannel(index) {
            const panel = document.getElementById('plot-panel');
            const message = document.getElementById('plot-message');
            document.getElementById('plot-title').textContent = `${columns[index]} vs Time`;
            message.textContent = '';
            panel.style.display = 'block';

            const response = await fetch(`/api/history/${index}`);
            const body = await response.json();
            if (!response.ok) {
                message.textContent = body.error || 'no data available';
                drawPlot([], [], columns[index]);
                return;
            }
            const points = body.points.filter(p => !isNaN(parseFloat(p.value)));
            drawPlot(points.map(p => p.timestamp), points.map(p => parseFloat(p.value)), columns[index]);
        }

        function drawPlot(labels, values, yLabel) {
            const canvas = document.getElementById('plot');
            const ctx = canvas.getContext('2d');
            const pad = 60;
            const w = canvas.width - 2 * pad;
            const h = canvas.height - 2 * pad;
            ctx.clearRect(0, 0, canvas.width, canvas.height);

            ctx.strokeStyle = '#333';
            ctx.beginPath();
            ctx.moveTo(pad, pad);
            ctx.lineTo(pad, pad + h);
            ctx.lineTo(pad + w, pad + h);
            ctx.stroke();

            ctx.fillStyle = '#333';
            ctx.font = '12px Arial';
            ctx.fillText(yLabel, 5, pad - 20);
            ctx.fillText('Timestamp', pad + w / 2 - 30, canvas.height - 10);

            if (values.length === 0) return;

            let min = Math.min(...values);
            let max = Math.max(...values);
            if (min === max) { min -= 1; max += 1; }
            const x = i => pad + (values.length === 1 ? w / 2 : (i * w) / (values.length - 1));
            const y = v => pad + h - ((v - min) / (max - min)) * h;

            ctx.fillText(max.toFixed(2), 5, pad + 4);
            ctx.fillText(min.toFixed(2), 5, pad + h);
            ctx.fillText(labels[0], pad, pad + h + 18);
            ctx.fillText(labels[labels.length - 1], pad + w - 50, pad + h + 18);

            ctx.strokeStyle = '#1f77b4';
            ctx.lineWidth = 2;
            ctx.beginPath();
            values.forEach((v, i) => {
                if (i === 0) ctx.moveTo(x(i), y(v));
                else ctx.lineTo(x(i), y(v));
            });
            ctx.stroke();
        }

        function connect() {
            const protocol = window.location.protocol === 'https:' ? 'wss:' : 'ws:';
            const ws = new WebSocket(`${protocol}//${window.location.host}/ws`);

            ws.onmessage = event => {
                try {
                    handleUpdate(JSON.parse(event.data));
                } catch (e) {
                    console.error('Failed to parse update:', e);
                }
            };

            ws.onclose = () => {
                setStatus('Disconnected from logger, retrying...', true);
                setTimeout(connect, 2000);
            };
        }

        function tickClock() {
            document.getElementById('clock').textContent = new Date().toLocaleTimeString();
        }

        document.getElementById('plot-close').onclick = () => {
            document.getElementById('plot-panel').style.display = 'none';
        };

        tickClock();
        setInterval(tickClock, 1000);
        connect();
    </script>
</body>
</html>"#;
