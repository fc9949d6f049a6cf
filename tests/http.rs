use once_cell::sync::Lazy;
use reqwest::Client;
use serde::Deserialize;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

const TODAY: &str = "2026-01-05";

#[derive(Debug, Deserialize)]
struct TodayResponse {
    date: String,
    count: u64,
    is_new_record: bool,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    state: String,
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    date: String,
    total: u64,
    today_count: u64,
    streak: u32,
    pending_writes: usize,
    unconfirmed_writes: usize,
}

impl StatsResponse {
    fn settled(&self) -> bool {
        self.pending_writes == 0 && self.unconfirmed_writes == 0
    }
}

#[derive(Debug, Deserialize)]
struct CalendarCell {
    date: String,
    row: usize,
    is_today: bool,
    is_future: bool,
}

#[derive(Debug, Deserialize)]
struct CalendarResponse {
    weeks: Vec<Vec<CalendarCell>>,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_path() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("progress_tracker_http_{}_{}.json", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/session")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let data_path = unique_data_path();
    let child = Command::new(env!("CARGO_BIN_EXE_progress_tracker"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", data_path)
        .env("APP_TODAY", TODAY)
        .env("APP_USER_ID", "http-user")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn get_json<T: serde::de::DeserializeOwned>(client: &Client, url: String) -> T {
    client.get(url).send().await.unwrap().json().await.unwrap()
}

async fn wait_for_stats<F>(client: &Client, base_url: &str, done: F) -> StatsResponse
where
    F: Fn(&StatsResponse) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        let stats: StatsResponse = get_json(client, format!("{base_url}/api/stats")).await;
        if done(&stats) {
            return stats;
        }
        if Instant::now() > deadline {
            panic!("stats never settled: {stats:?}");
        }
        sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn http_increment_updates_today() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let before: TodayResponse = get_json(&client, format!("{}/api/today", server.base_url)).await;

    let response = client
        .post(format!("{}/api/increment", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let incremented: TodayResponse = response.json().await.unwrap();
    assert_eq!(incremented.count, before.count + 1);
    assert!(incremented.is_new_record);

    let today: TodayResponse = get_json(&client, format!("{}/api/today", server.base_url)).await;
    assert_eq!(today.date, TODAY);
    assert!(today.count >= before.count + 1);

    let expected = before.count + 1;
    wait_for_stats(&client, &server.base_url, |stats| {
        stats.settled() && stats.today_count == expected
    })
    .await;
}

#[tokio::test]
async fn http_concurrent_increments_are_not_lost() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let before: TodayResponse = get_json(&client, format!("{}/api/today", server.base_url)).await;

    let mut requests = Vec::new();
    for _ in 0..5 {
        let client = client.clone();
        let url = format!("{}/api/increment", server.base_url);
        requests.push(tokio::spawn(async move {
            let response: TodayResponse = client.post(url).send().await.unwrap().json().await.unwrap();
            response.count
        }));
    }

    let mut counts = Vec::new();
    for request in requests {
        counts.push(request.await.unwrap());
    }
    counts.sort_unstable();
    assert_eq!(counts, (before.count + 1..=before.count + 5).collect::<Vec<u64>>());

    let expected = before.count + 5;
    let stats = wait_for_stats(&client, &server.base_url, |stats| {
        stats.settled() && stats.today_count == expected
    })
    .await;
    assert!(stats.total >= expected);
}

#[tokio::test]
async fn http_stats_and_calendar_use_pinned_day() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    client
        .post(format!("{}/api/increment", server.base_url))
        .send()
        .await
        .unwrap();

    let stats = wait_for_stats(&client, &server.base_url, |stats| stats.settled()).await;
    assert_eq!(stats.date, TODAY);
    assert!(stats.streak >= 1);
    assert!(stats.total >= stats.today_count);

    let calendar: CalendarResponse =
        get_json(&client, format!("{}/api/calendar", server.base_url)).await;
    assert!(calendar.weeks.iter().all(|week| week.len() == 7));
    assert!(
        calendar
            .weeks
            .iter()
            .all(|week| week.iter().enumerate().all(|(row, cell)| cell.row == row))
    );

    let today_cells: Vec<&CalendarCell> = calendar
        .weeks
        .iter()
        .flatten()
        .filter(|cell| cell.is_today)
        .collect();
    assert_eq!(today_cells.len(), 1);
    assert_eq!(today_cells[0].date, TODAY);
    assert!(
        calendar
            .weeks
            .iter()
            .flatten()
            .all(|cell| cell.is_future == (cell.date.as_str() > TODAY))
    );

    let page = client
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("<svg"));
    assert!(page.contains(TODAY));
}

#[tokio::test]
async fn http_sign_out_blocks_increments() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    client
        .post(format!("{}/api/increment", server.base_url))
        .send()
        .await
        .unwrap();
    let before = wait_for_stats(&client, &server.base_url, |stats| stats.settled()).await;

    let session: SessionResponse = client
        .post(format!("{}/api/session/sign-out", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(session.state, "signed_out");
    assert!(session.user_id.is_none());

    let response = client
        .post(format!("{}/api/increment", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

    let today: TodayResponse = get_json(&client, format!("{}/api/today", server.base_url)).await;
    assert_eq!(today.count, 0);

    let session: SessionResponse = client
        .post(format!("{}/api/session/sign-in", server.base_url))
        .json(&serde_json::json!({ "user_id": "http-user" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(session.state, "signed_in");
    assert_eq!(session.user_id.as_deref(), Some("http-user"));

    let expected = before.today_count;
    wait_for_stats(&client, &server.base_url, |stats| stats.today_count == expected).await;
}

#[tokio::test]
async fn http_sign_in_requires_user_id() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/session/sign-in", server.base_url))
        .json(&serde_json::json!({ "user_id": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let session: SessionResponse = get_json(&client, format!("{}/api/session", server.base_url)).await;
    assert_eq!(session.state, "signed_in");
}
