mod support;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use opsdash::app::Msg;
use opsdash::list::{ControllerOptions, MemoryHistory, RowStatus};
use opsdash::testing::TestProgram;
use opsdash::{ApiClient, Dashboard, DashboardFlags, Screen};
use std::path::PathBuf;
use std::time::Duration;
use support::FakeServer;

const USERS: &str = r#"{"success":true,"data":[
    {"id":"u1","name":"Ann","email":"ann@example.com","status":"Active"},
    {"id":"u2","name":"Bob","email":"bob@example.com","status":"Active"}
],"totalRecords":2,"totalPages":1}"#;

const ORDERS: &str = r#"{"success":true,"data":[
    {"id":"o1","orderNumber":"A-1","patientName":"Ann","status":"Active"}
],"totalRecords":1,"totalPages":1}"#;

const SUMMARY: &str = r#"{"success":true,"data":[
    {"date":"2024-01-01","summary":{"pending":2,"completed":1}}
]}"#;

fn key(c: char) -> Msg {
    Msg::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

fn code(code: KeyCode) -> Msg {
    Msg::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

async fn server() -> FakeServer {
    let server = FakeServer::start().await;
    server.route("GET", "/api/users", 200, USERS);
    server.route("GET", "/api/orders", 200, ORDERS);
    server.route("GET", "/api/orders/summary", 200, SUMMARY);
    server.route("PATCH", "/api/users/u1/status", 200, r#"{"success":true}"#);
    server
}

fn flags(server: &FakeServer, history: MemoryHistory, export_dir: PathBuf) -> DashboardFlags {
    DashboardFlags {
        api: ApiClient::new(&server.base, Duration::from_secs(5)).unwrap(),
        history,
        options: ControllerOptions::default(),
        export_dir,
        read_only: false,
    }
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("opsdash-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[tokio::test]
async fn first_screen_and_filters_come_from_the_address() {
    let server = server().await;
    let history = MemoryHistory::new("/users", "status=Active");
    let mut prog = TestProgram::<Dashboard>::new(flags(&server, history, scratch_dir("addr")));

    assert_eq!(prog.model().screen(), Screen::Users);
    assert_eq!(prog.pending_tasks(), 1);
    prog.resolve_all().await;

    let users = prog.model().users().unwrap();
    assert_eq!(users.rows().len(), 2);
    assert_eq!(
        server.requests()[0].query(),
        "page=1&pageSize=10&status=Active"
    );
}

#[tokio::test]
async fn leaving_a_screen_drops_its_late_response() {
    let server = server().await;
    let history = MemoryHistory::new("/orders", "");
    let mut prog =
        TestProgram::<Dashboard>::new(flags(&server, history.clone(), scratch_dir("switch")));
    assert_eq!(prog.pending_tasks(), 1);

    prog.send(key('3'));
    prog.drain_messages();
    assert_eq!(prog.model().screen(), Screen::Users);
    assert_eq!(history.len(), 2);
    assert_eq!(prog.pending_tasks(), 2);

    // The orders fetch lands after the switch.
    prog.resolve(0).await;
    assert!(prog.model().orders().is_none());
    assert!(prog.model().users().unwrap().rows().is_empty());

    prog.resolve(0).await;
    assert_eq!(prog.model().users().unwrap().rows().len(), 2);

    prog.send(key('b'));
    prog.drain_messages();
    assert_eq!(prog.model().screen(), Screen::Orders);
    assert_eq!(history.len(), 1);
    prog.resolve_all().await;
    assert_eq!(prog.model().orders().unwrap().rows().len(), 1);
}

#[tokio::test]
async fn filter_prompt_edits_are_debounced_into_the_address() {
    let server = server().await;
    let history = MemoryHistory::new("/users", "");
    let mut prog = TestProgram::<Dashboard>::new(flags(&server, history, scratch_dir("prompt")));
    prog.resolve_all().await;

    prog.send(key('/'));
    assert_eq!(prog.model().prompt_field(), Some("name"));
    prog.send(key('a'));
    prog.send(key('n'));
    assert_eq!(prog.pending_tasks(), 0);

    prog.advance(Duration::from_millis(300));
    assert_eq!(prog.model().address(), "name=an&page=1&pageSize=10");
    assert_eq!(prog.pending_tasks(), 1);
    prog.resolve_all().await;

    let last = server.requests().pop().unwrap();
    assert_eq!(last.query(), "page=1&pageSize=10&name=an");

    prog.send(code(KeyCode::Tab));
    assert_eq!(prog.model().prompt_field(), Some("email"));
    prog.send(code(KeyCode::Esc));
    assert_eq!(prog.model().prompt_field(), None);
}

#[tokio::test]
async fn status_toggle_goes_through_the_backend() {
    let server = server().await;
    let history = MemoryHistory::new("/users", "");
    let mut prog = TestProgram::<Dashboard>::new(flags(&server, history, scratch_dir("toggle")));
    prog.resolve_all().await;

    prog.send(key('t'));
    let status = |prog: &TestProgram<Dashboard>| {
        prog.model().users().unwrap().rows().get(&"u1".into()).unwrap().record().status
    };
    assert_eq!(status(&prog), RowStatus::Inactive);

    prog.resolve_all().await;
    assert_eq!(status(&prog), RowStatus::Inactive);
    let patch = server
        .requests()
        .into_iter()
        .find(|r| r.method == "PATCH")
        .unwrap();
    assert_eq!(patch.path(), "/api/users/u1/status");
}

#[tokio::test]
async fn export_writes_selected_rows() {
    let server = server().await;
    let dir = scratch_dir("export");
    let history = MemoryHistory::new("/users", "");
    let mut prog = TestProgram::<Dashboard>::new(flags(&server, history, dir.clone()));
    prog.resolve_all().await;

    prog.send(key('e'));
    assert_eq!(prog.model().status_line(), Some("Nothing selected to export"));

    prog.send(key(' '));
    prog.send(key('e'));
    assert_eq!(prog.pending_tasks(), 1);
    prog.resolve_all().await;

    let path = dir.join("users-export.json");
    let status = prog.model().status_line().unwrap().to_string();
    assert!(status.starts_with("Exported 1 rows"), "{status}");

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["headers"], serde_json::json!(["Name", "Email", "Status"]));
    assert_eq!(written["rows"][0][0], "Ann");
}

#[tokio::test]
async fn calendar_screen_totals_the_range() {
    let server = server().await;
    let history = MemoryHistory::new("/orders", "");
    let mut prog = TestProgram::<Dashboard>::new(flags(&server, history, scratch_dir("cal")));
    prog.resolve_all().await;

    prog.send(key('2'));
    prog.drain_messages();
    assert_eq!(prog.model().screen(), Screen::Calendar);
    prog.resolve_all().await;

    let calendar = prog.model().calendar().unwrap();
    assert_eq!(calendar.totals().get("pending"), Some(&2));
    let last = server.requests().pop().unwrap();
    assert!(last.query().starts_with("from="), "{}", last.query());
}

#[tokio::test]
async fn q_quits() {
    let server = server().await;
    let history = MemoryHistory::new("/orders", "");
    let mut prog = TestProgram::<Dashboard>::new(flags(&server, history, scratch_dir("quit")));
    prog.send(key('q'));
    assert!(prog.quit_requested());
}
