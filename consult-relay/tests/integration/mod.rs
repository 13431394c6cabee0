
use consult_relay::RelayService;
use tokio::net::TcpListener;
use tracing::Level;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Starts a relay on an ephemeral port and returns its base URL.
pub async fn spawn_relay() -> (String, RelayService) {
    let service = RelayService::new();
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind relay");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(service.clone().serve(listener));

    (format!("ws://{addr}"), service)
}
