
use consult_rtc::{PeerConnectionWrapper, PeerEvent, PeerSession, SyntheticMediaSource, TransportConfig};
use std::sync::Arc;
use tokio::sync::mpsc;

pub async fn initialized_wrapper(
    media: SyntheticMediaSource,
) -> (PeerConnectionWrapper, mpsc::Receiver<PeerEvent>) {
    let wrapper = PeerConnectionWrapper::new(TransportConfig::local(), Arc::new(media));
    let (tx, rx) = mpsc::channel(256);
    wrapper.initialize(tx).await.expect("initialize");
    (wrapper, rx)
}
