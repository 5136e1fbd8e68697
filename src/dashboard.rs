//! Job-queue dashboard: periodic refresh of the queue and worker tables.

use feedview_dom::{Document, DomError, NodeId};
use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::constants::DASHBOARD_POLL_INTERVAL_MS;
use crate::media::CancelableTimer;

/// Queue table, by id
pub const QUEUES_TABLE: &str = "queues";
/// Worker table, by id
pub const WORKERS_TABLE: &str = "workers";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueInfo {
    pub name: String,
    pub count: u64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerInfo {
    pub name: String,
    #[serde(default)]
    pub queues: Vec<String>,
    pub state: String,
    pub url: String,
}

/// Payload served by the dashboard endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    #[serde(default)]
    pub queues: Vec<QueueInfo>,
    #[serde(default)]
    pub workers: Vec<WorkerInfo>,
}

impl DashboardData {
    pub fn from_json(json: &str) -> Result<Self, DashboardError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("Invalid dashboard payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("No tbody in #{0}")]
    MissingTable(&'static str),

    #[error("Document error: {0}")]
    Dom(#[from] DomError),
}

fn table_body(doc: &Document, table: &'static str) -> Result<NodeId, DashboardError> {
    let table_node = doc
        .element_by_id(table)
        .ok_or(DashboardError::MissingTable(table))?;
    doc.find_first(table_node, |d, n| d.is_tag(n, "tbody"))
        .ok_or(DashboardError::MissingTable(table))
}

/// Class of the row at `index`; the first row is `row2`.
pub fn row_class(index: usize) -> &'static str {
    if index % 2 == 0 { "row2" } else { "row1" }
}

fn append_row(
    doc: &mut Document,
    body: NodeId,
    class: Option<&str>,
    cells: &[(&str, Option<&str>)],
) -> Result<NodeId, DomError> {
    let row = doc.create_element("tr");
    if let Some(class) = class {
        doc.add_class(row, class)?;
    }
    for &(text, href) in cells {
        let cell = doc.create_element("td");
        match href {
            Some(href) => {
                let link = doc.create_element("a");
                doc.set_attr(link, "href", href)?;
                doc.set_text(link, text)?;
                doc.append_child(cell, link)?;
            }
            None => doc.set_text(cell, text)?,
        }
        doc.append_child(row, cell)?;
    }
    doc.append_child(body, row)?;
    Ok(row)
}

fn placeholder_row(doc: &mut Document, body: NodeId, class: &str, text: &str, span: usize) -> Result<(), DomError> {
    let row = append_row(doc, body, Some(class), &[(text, None)])?;
    if let Some(&cell) = doc.children(row).first() {
        doc.set_attr(cell, "colspan", &span.to_string())?;
    }
    Ok(())
}

/// Replace both tables' rows with the payload.
pub fn render(doc: &mut Document, data: &DashboardData) -> Result<(), DashboardError> {
    let queues = table_body(doc, QUEUES_TABLE)?;
    doc.clear_children(queues)?;
    if data.queues.is_empty() {
        placeholder_row(doc, queues, "empty", "No queues", 2)?;
    }
    for (i, queue) in data.queues.iter().enumerate() {
        let count = queue.count.to_string();
        append_row(
            doc,
            queues,
            Some(row_class(i)),
            &[
                (queue.name.as_str(), Some(queue.url.as_str())),
                (count.as_str(), None),
            ],
        )?;
    }

    let workers = table_body(doc, WORKERS_TABLE)?;
    doc.clear_children(workers)?;
    if data.workers.is_empty() {
        placeholder_row(doc, workers, "empty", "No workers", 3)?;
    }
    for (i, worker) in data.workers.iter().enumerate() {
        let queue_names = worker.queues.join(", ");
        append_row(
            doc,
            workers,
            Some(row_class(i)),
            &[
                (worker.name.as_str(), Some(worker.url.as_str())),
                (queue_names.as_str(), None),
                (worker.state.as_str(), None),
            ],
        )?;
    }
    log::debug!(
        "Dashboard refreshed: {} queues, {} workers",
        data.queues.len(),
        data.workers.len()
    );
    Ok(())
}

/// Replace both tables' rows with an error row.
pub fn render_error(doc: &mut Document) -> Result<(), DashboardError> {
    for (table, span) in [(QUEUES_TABLE, 2), (WORKERS_TABLE, 3)] {
        let body = table_body(doc, table)?;
        doc.clear_children(body)?;
        placeholder_row(doc, body, "error", "Could not refresh", span)?;
    }
    Ok(())
}

/// Apply a refresh result: render the payload, or the error rows when the
/// request or the payload failed.
pub fn refresh(doc: &mut Document, response: Option<&str>) -> Result<(), DashboardError> {
    let parsed = response.map(DashboardData::from_json);
    match parsed {
        Some(Ok(data)) => render(doc, &data),
        Some(Err(e)) => {
            log::warn!("Dashboard refresh failed: {}", e);
            render_error(doc)
        }
        None => {
            log::warn!("Dashboard refresh failed: no response");
            render_error(doc)
        }
    }
}

/// Fixed-interval refresh schedule.
#[derive(Debug, Clone)]
pub struct Poller {
    interval: Duration,
    timer: CancelableTimer,
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(Duration::from_millis(DASHBOARD_POLL_INTERVAL_MS))
    }
}

impl Poller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timer: CancelableTimer::new(),
        }
    }

    /// Start polling; the first refresh is due one interval after `now`.
    pub fn start(&mut self, now: Duration) {
        self.timer.restart(now, self.interval);
    }

    pub fn stop(&mut self) {
        self.timer.cancel();
    }

    /// Whether a refresh is due. Re-arms for the next interval when it is.
    pub fn due(&mut self, now: Duration) -> bool {
        let Some(deadline) = self.timer.deadline() else {
            return false;
        };
        if self.timer.fire_if_due(now) {
            self.timer.restart(deadline, self.interval);
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<table id="queues"><tbody><tr><td>stale</td></tr></tbody></table><table id="workers"><tbody></tbody></table>"#;

    fn rows(doc: &Document, table: &str) -> Vec<NodeId> {
        let table = doc.element_by_id(table).unwrap();
        doc.find_all(table, |d, n| d.is_tag(n, "tr"))
    }

    #[test]
    fn test_render_alternates_rows() {
        let mut doc = Document::parse_fragment(PAGE).unwrap();
        let data = DashboardData::from_json(
            r#"{"queues": [
                {"name": "default", "count": 3, "url": "/rq/default/"},
                {"name": "high", "count": 0, "url": "/rq/high/"},
                {"name": "low", "count": 12, "url": "/rq/low/"}
            ],
            "workers": [
                {"name": "w1", "queues": ["default", "high"], "state": "busy", "url": "/rq/w1/"}
            ]}"#,
        )
        .unwrap();

        render(&mut doc, &data).unwrap();

        let queue_rows = rows(&doc, QUEUES_TABLE);
        assert_eq!(queue_rows.len(), 3);
        let classes: Vec<_> = queue_rows
            .iter()
            .map(|&r| doc.attr(r, "class").unwrap())
            .collect();
        assert_eq!(classes, vec!["row2", "row1", "row2"]);
        assert_eq!(doc.text_content(queue_rows[2]), "low12");

        let worker_rows = rows(&doc, WORKERS_TABLE);
        assert_eq!(worker_rows.len(), 1);
        let cells = doc.children(worker_rows[0]).to_vec();
        assert_eq!(doc.text_content(cells[1]), "default, high");
    }

    #[test]
    fn test_empty_lists_render_placeholders() {
        let mut doc = Document::parse_fragment(PAGE).unwrap();
        render(&mut doc, &DashboardData::default()).unwrap();

        let queue_rows = rows(&doc, QUEUES_TABLE);
        assert_eq!(queue_rows.len(), 1);
        assert_eq!(doc.text_content(queue_rows[0]), "No queues");
        assert_eq!(doc.text_content(rows(&doc, WORKERS_TABLE)[0]), "No workers");
    }

    #[test]
    fn test_failed_refresh_renders_error_rows() {
        let mut doc = Document::parse_fragment(PAGE).unwrap();
        refresh(&mut doc, Some("not json")).unwrap();

        for table in [QUEUES_TABLE, WORKERS_TABLE] {
            let rows = rows(&doc, table);
            assert_eq!(rows.len(), 1);
            assert!(doc.has_class(rows[0], "error"));
        }
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let mut doc = Document::parse_fragment(r#"<table id="queues"><tbody></tbody></table>"#).unwrap();
        let err = render(&mut doc, &DashboardData::default()).unwrap_err();
        assert!(matches!(err, DashboardError::MissingTable(WORKERS_TABLE)));
    }

    #[test]
    fn test_poller_interval() {
        let mut poller = Poller::default();
        assert!(!poller.due(Duration::from_millis(10_000)));

        poller.start(Duration::ZERO);
        assert!(!poller.due(Duration::from_millis(2499)));
        assert!(poller.due(Duration::from_millis(2500)));
        assert!(!poller.due(Duration::from_millis(4000)));
        assert!(poller.due(Duration::from_millis(5000)));

        poller.stop();
        assert!(!poller.due(Duration::from_millis(20_000)));
    }
}
