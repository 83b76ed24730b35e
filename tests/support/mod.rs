// Shared primitives for one-time server bootstrapping across integration tests.
use arena_server::use_cases::{ArenaSettings, WorldSettings};
use std::{
    // `Arc` shares data between threads; `OnceLock` writes a value only once.
    sync::{Arc, OnceLock},
    time::Duration,
};

// Bots in the shared test arena.
pub const TEST_BOT_COUNT: usize = 3;

// Global websocket URL used by all tests after the server publishes its bound address.
static SERVER_URL: OnceLock<String> = OnceLock::new();
// One-time guard that ensures the server bootstrap path runs only once.
static SERVER_READY: OnceLock<()> = OnceLock::new();

fn test_settings() -> ArenaSettings {
    ArenaSettings {
        input_channel_capacity: 256,
        world_broadcast_capacity: 64,
        notice_broadcast_capacity: 64,
        tick_interval: Duration::from_millis(20),
        max_tick_delta: Duration::from_millis(100),
        seed: Some(2024),
        world: WorldSettings {
            bot_count: TEST_BOT_COUNT,
            ..WorldSettings::default()
        },
    }
}

// Ensure the test server is running and return the shared `ws://` URL.
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        let published_addr = Arc::new(OnceLock::<String>::new());
        let published_addr_thread = Arc::clone(&published_addr);
        // Spawn an OS thread so the server outlives individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // Bind to an ephemeral port to avoid collisions with local services.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_addr_thread.set(addr.to_string());
                arena_server::serve(listener, test_settings())
                    .await
                    .expect("server failed");
            });
        });
        wait_for_readiness(published_addr);
    });

    SERVER_URL.get().expect("server url should be initialized").as_str()
}

// Wait for the address to be published and then for the socket to accept TCP connections.
fn wait_for_readiness(published_addr: Arc<OnceLock<String>>) {
    let addr = loop {
        if let Some(addr) = published_addr.get() {
            break addr.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_URL.set(format!("ws://{addr}/ws"));

    for _ in 0..100 {
        if std::net::TcpStream::connect(&addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}
