//! Local HTTP server for tests that exercise the real reqwest client, and a
//! tracing layer that counts warnings.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

pub const TEST_USER_AGENT: &str = "NRK-Rettelser-Test/0.1 (+https://example.invalid)";

type Handler = dyn Fn(&str) -> (u16, String) + Send + 'static;

/// Serves `handler(path)` on 127.0.0.1 until dropped.
pub struct TestServer {
    pub base_url: String,
    user_agents: Arc<Mutex<Vec<String>>>,
    requested: Arc<Mutex<Vec<String>>>,
    shutdown: mpsc::Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl TestServer {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&str) -> (u16, String) + Send + 'static,
    {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
        let base_url = format!("http://{}", server.server_addr());
        let handler: Box<Handler> = Box::new(handler);

        let user_agents = Arc::new(Mutex::new(Vec::new()));
        let requested = Arc::new(Mutex::new(Vec::new()));
        let (shutdown, shutdown_rx) = mpsc::channel::<()>();

        let agents = Arc::clone(&user_agents);
        let paths = Arc::clone(&requested);
        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(20)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                if let Some(ua) = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("User-Agent"))
                {
                    agents.lock().unwrap().push(ua.value.as_str().to_string());
                }

                let path = request.url().to_string();
                paths.lock().unwrap().push(path.clone());

                let (status, body) = handler(&path);
                let _ = request.respond(
                    tiny_http::Response::from_string(body).with_status_code(status),
                );
            }
        });

        Self {
            base_url,
            user_agents,
            requested,
            shutdown,
            handle: Some(handle),
        }
    }

    /// `User-Agent` values seen so far, in arrival order.
    pub fn user_agents(&self) -> Vec<String> {
        self.user_agents.lock().unwrap().clone()
    }

    /// Request paths seen so far, in arrival order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Counts events at WARN or ERROR while its dispatcher is the thread default.
#[derive(Clone, Default)]
pub struct WarnCounter(Arc<AtomicUsize>);

impl WarnCounter {
    /// Install as the default subscriber for the current thread.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::registry().with(self.clone());
        tracing::subscriber::set_default(subscriber)
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() <= Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}
